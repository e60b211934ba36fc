//! Expression parsing: the precedence ladder and the typed node builders.
//!
//! ## Pointer arithmetic
//!
//! `+` and `-` are polymorphic. [`new_add`](Parser::new_add) and
//! [`new_sub`](Parser::new_sub) inspect the operand types:
//!
//! - int ± int - ordinary arithmetic, operands brought to a common type
//! - ptr + int, int + ptr, ptr - int - the integer is multiplied by the
//!   pointee size (an explicit `Mul` node with a `long` literal) before
//!   the add
//! - ptr - ptr - element count: the byte difference divided by the
//!   pointee size, as a `long`
//! - ptr + ptr - "invalid operands"
//!
//! `a[i]` is rewritten to `*(a + i)`, so subscripts get all of the above
//! for free; `a->m` is `(*a).m`.
//!
//! ## Relational normalization
//!
//! Only `<` and `<=` exist in the AST; `a > b` parses as `b < a`.

use ferrocc_base::{Span, SpannedError};

use super::decl::DeclParsing;
use super::stmt::StmtParsing;
use super::{ParseResult, Parser};
use crate::ast::{BinaryOp, Node, NodeKind, ObjId};
use crate::scope::VarScope;
use crate::token::{Keyword, Punct, TokenKind};
use crate::types::{add_type, common_type, Type};

/// ABI register budget: integer/pointer arguments beyond the sixth have
/// no register to land in.
const MAX_CALL_ARGS: usize = 6;

pub trait ExprParsing<'a> {
    fn expr(&mut self) -> ParseResult<&'a Node<'a>>;
    fn assign(&mut self) -> ParseResult<&'a Node<'a>>;
    fn equality(&mut self) -> ParseResult<&'a Node<'a>>;
    fn relational(&mut self) -> ParseResult<&'a Node<'a>>;
    fn add_expr(&mut self) -> ParseResult<&'a Node<'a>>;
    fn mul_expr(&mut self) -> ParseResult<&'a Node<'a>>;
    fn cast_expr(&mut self) -> ParseResult<&'a Node<'a>>;
    fn unary(&mut self) -> ParseResult<&'a Node<'a>>;
    fn postfix(&mut self) -> ParseResult<&'a Node<'a>>;
    fn primary(&mut self) -> ParseResult<&'a Node<'a>>;
    fn funcall(&mut self) -> ParseResult<&'a Node<'a>>;
}

impl<'a, 'i> ExprParsing<'a> for Parser<'a, 'i> {
    /// expr := assign ("," expr)?
    fn expr(&mut self) -> ParseResult<&'a Node<'a>> {
        let node = self.assign()?;
        if self.at_punct(Punct::Comma) {
            let (span, line) = self.loc();
            self.pos += 1;
            let rhs = self.expr()?;
            return Ok(self.alloc(NodeKind::Comma { lhs: node, rhs }, span, line));
        }
        Ok(node)
    }

    /// assign := equality ("=" assign)?
    fn assign(&mut self) -> ParseResult<&'a Node<'a>> {
        let node = self.equality()?;
        if self.at_punct(Punct::Assign) {
            let (span, line) = self.loc();
            self.pos += 1;
            let rhs = self.assign()?;
            return Ok(self.alloc(NodeKind::Assign { lhs: node, rhs }, span, line));
        }
        Ok(node)
    }

    /// equality := relational (("==" | "!=") relational)*
    fn equality(&mut self) -> ParseResult<&'a Node<'a>> {
        let mut node = self.relational()?;
        loop {
            let (span, line) = self.loc();
            if self.consume_punct(Punct::EqEq) {
                let rhs = self.relational()?;
                node = self.new_binary(BinaryOp::Eq, node, rhs, span, line)?;
                continue;
            }
            if self.consume_punct(Punct::NotEq) {
                let rhs = self.relational()?;
                node = self.new_binary(BinaryOp::Ne, node, rhs, span, line)?;
                continue;
            }
            return Ok(node);
        }
    }

    /// relational := add (("<" | "<=" | ">" | ">=") add)*
    fn relational(&mut self) -> ParseResult<&'a Node<'a>> {
        let mut node = self.add_expr()?;
        loop {
            let (span, line) = self.loc();
            if self.consume_punct(Punct::Lt) {
                let rhs = self.add_expr()?;
                node = self.new_binary(BinaryOp::Lt, node, rhs, span, line)?;
                continue;
            }
            if self.consume_punct(Punct::LtEq) {
                let rhs = self.add_expr()?;
                node = self.new_binary(BinaryOp::Le, node, rhs, span, line)?;
                continue;
            }
            if self.consume_punct(Punct::Gt) {
                let rhs = self.add_expr()?;
                node = self.new_binary(BinaryOp::Lt, rhs, node, span, line)?;
                continue;
            }
            if self.consume_punct(Punct::GtEq) {
                let rhs = self.add_expr()?;
                node = self.new_binary(BinaryOp::Le, rhs, node, span, line)?;
                continue;
            }
            return Ok(node);
        }
    }

    /// add := mul (("+" | "-") mul)*
    fn add_expr(&mut self) -> ParseResult<&'a Node<'a>> {
        let mut node = self.mul_expr()?;
        loop {
            let (span, line) = self.loc();
            if self.consume_punct(Punct::Plus) {
                let rhs = self.mul_expr()?;
                node = self.new_add(node, rhs, span, line)?;
                continue;
            }
            if self.consume_punct(Punct::Minus) {
                let rhs = self.mul_expr()?;
                node = self.new_sub(node, rhs, span, line)?;
                continue;
            }
            return Ok(node);
        }
    }

    /// mul := cast (("*" | "/") cast)*
    fn mul_expr(&mut self) -> ParseResult<&'a Node<'a>> {
        let mut node = self.cast_expr()?;
        loop {
            let (span, line) = self.loc();
            if self.consume_punct(Punct::Star) {
                let rhs = self.cast_expr()?;
                node = self.new_binary(BinaryOp::Mul, node, rhs, span, line)?;
                continue;
            }
            if self.consume_punct(Punct::Slash) {
                let rhs = self.cast_expr()?;
                node = self.new_binary(BinaryOp::Div, node, rhs, span, line)?;
                continue;
            }
            return Ok(node);
        }
    }

    /// cast := "(" typename ")" cast | unary
    fn cast_expr(&mut self) -> ParseResult<&'a Node<'a>> {
        if self.at_punct(Punct::LParen) && self.is_typename_at(1) {
            let (span, line) = self.loc();
            self.pos += 1;
            let ty = self.typename()?;
            self.expect_punct(Punct::RParen)?;
            let expr = self.cast_expr()?;
            return self.new_cast(expr, ty, span, line);
        }
        self.unary()
    }

    /// unary := ("+" | "-" | "*" | "&") cast | postfix
    fn unary(&mut self) -> ParseResult<&'a Node<'a>> {
        let (span, line) = self.loc();
        if self.consume_punct(Punct::Plus) {
            return self.cast_expr();
        }
        if self.consume_punct(Punct::Minus) {
            let expr = self.cast_expr()?;
            return Ok(self.alloc(NodeKind::Neg(expr), span, line));
        }
        if self.consume_punct(Punct::Star) {
            let expr = self.cast_expr()?;
            return Ok(self.alloc(NodeKind::Deref(expr), span, line));
        }
        if self.consume_punct(Punct::Amp) {
            let expr = self.cast_expr()?;
            return Ok(self.alloc(NodeKind::Addr(expr), span, line));
        }
        self.postfix()
    }

    /// postfix := primary ("[" expr "]" | "." identifier | "->" identifier)*
    fn postfix(&mut self) -> ParseResult<&'a Node<'a>> {
        let mut node = self.primary()?;
        loop {
            if self.at_punct(Punct::LBracket) {
                // a[i] => *(a + i)
                let (span, line) = self.loc();
                self.pos += 1;
                let idx = self.expr()?;
                self.expect_punct(Punct::RBracket)?;
                let sum = self.new_add(node, idx, span, line)?;
                node = self.alloc(NodeKind::Deref(sum), span, line);
                continue;
            }
            if self.at_punct(Punct::Dot) {
                let (_, line) = self.loc();
                self.pos += 1;
                let (name, name_span) = self.expect_ident()?;
                node = self.struct_ref(node, name, name_span, line)?;
                continue;
            }
            if self.at_punct(Punct::Arrow) {
                // a->m is (*a).m
                let (span, line) = self.loc();
                self.pos += 1;
                node = self.alloc(NodeKind::Deref(node), span, line);
                let (name, name_span) = self.expect_ident()?;
                node = self.struct_ref(node, name, name_span, line)?;
                continue;
            }
            return Ok(node);
        }
    }

    /// primary := "(" "{" stmt+ "}" ")" | "(" expr ")"
    ///          | "sizeof" "(" typename ")" | "sizeof" unary
    ///          | identifier args? | string | number
    fn primary(&mut self) -> ParseResult<&'a Node<'a>> {
        let (span, line) = self.loc();

        // GNU statement expression
        if self.at_punct(Punct::LParen)
            && matches!(self.peek_at(1).kind, TokenKind::Punct(Punct::LBrace))
        {
            self.pos += 2;
            let block = self.compound_stmt()?;
            self.expect_punct(Punct::RParen)?;
            let body = match block.kind {
                NodeKind::Block(body) => body,
                _ => unreachable!("compound_stmt yields a block"),
            };
            return Ok(self.alloc(NodeKind::StmtExpr(body), span, line));
        }

        if self.consume_punct(Punct::LParen) {
            let node = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            return Ok(node);
        }

        if self.at_keyword(Keyword::Sizeof) {
            if matches!(self.peek_at(1).kind, TokenKind::Punct(Punct::LParen))
                && self.is_typename_at(2)
            {
                self.pos += 2;
                let ty = self.typename()?;
                self.expect_punct(Punct::RParen)?;
                if ty.is_func() {
                    return Err(SpannedError::new("invalid operand to sizeof", span));
                }
                return Ok(self.new_num(ty.size as i64, span, line));
            }
            self.pos += 1;
            let node = self.unary()?;
            add_type(node, &self.ctx)?;
            if node.ty().is_func() {
                return Err(SpannedError::new("invalid operand to sizeof", span));
            }
            return Ok(self.new_num(node.ty().size as i64, span, line));
        }

        let kind = self.peek().kind.clone();
        match kind {
            TokenKind::Ident(name) => {
                if matches!(self.peek_at(1).kind, TokenKind::Punct(Punct::LParen)) {
                    return self.funcall();
                }
                self.pos += 1;
                match self.scopes.find_var(name) {
                    Some(VarScope::Var(id)) => Ok(self.var_node(id, span, line)),
                    _ => Err(SpannedError::new("undefined variable", span)),
                }
            }
            TokenKind::Str(bytes) => {
                self.pos += 1;
                let mut data = bytes;
                data.push(0);
                let ty = self.ctx.array_of(self.ctx.ty_char(), data.len() as i32);
                let id = self.new_string_literal(data, ty);
                Ok(self.var_node(id, span, line))
            }
            TokenKind::Num(val) => {
                self.pos += 1;
                Ok(self.new_num(val, span, line))
            }
            _ => Err(self.error_here("expected an expression")),
        }
    }

    /// funcall := identifier "(" (assign ("," assign)*)? ")"
    ///
    /// The callee must be bound in scope to a function object; the call's
    /// type is the declared return type.
    fn funcall(&mut self) -> ParseResult<&'a Node<'a>> {
        let (span, line) = self.loc();
        let name = match self.peek().kind {
            TokenKind::Ident(sym) => sym,
            _ => unreachable!("funcall starts at an identifier"),
        };

        let callee = match self.scopes.find_var(name) {
            Some(VarScope::Var(id)) => id,
            _ => {
                return Err(SpannedError::new(
                    "implicit declaration of a function",
                    span,
                ));
            }
        };
        let return_ty = match self.objs[callee.index()].ty.kind {
            crate::types::TypeKind::Func { return_ty, .. } => return_ty,
            _ => return Err(SpannedError::new("not a function", span)),
        };

        self.pos += 2; // identifier "("
        let mut args = Vec::new();
        while !self.at_punct(Punct::RParen) {
            if self.at_eof() {
                return Err(self.error_here("expected ')'"));
            }
            if !args.is_empty() {
                self.expect_punct(Punct::Comma)?;
            }
            let arg = self.assign()?;
            add_type(arg, &self.ctx)?;
            args.push(arg);
        }
        self.pos += 1;

        if args.len() > MAX_CALL_ARGS {
            return Err(SpannedError::new("too many arguments", span));
        }

        let node = Node::new(
            NodeKind::Funcall {
                name,
                args: self.ctx.alloc_node_list(args),
            },
            span,
            line,
        );
        node.ty.set(Some(return_ty));
        Ok(self.ctx.alloc_node(node))
    }
}

impl<'a, 'i> Parser<'a, 'i> {
    pub(crate) fn new_num(&self, val: i64, span: Span, line: u32) -> &'a Node<'a> {
        self.alloc(NodeKind::Num(val), span, line)
    }

    /// An integer literal pre-typed as `long`; pointer scaling uses these.
    pub(crate) fn new_long(&self, val: i64, span: Span, line: u32) -> &'a Node<'a> {
        let node = Node::new(NodeKind::Num(val), span, line);
        node.ty.set(Some(self.ctx.ty_long()));
        self.ctx.alloc_node(node)
    }

    pub(crate) fn var_node(&self, id: ObjId, span: Span, line: u32) -> &'a Node<'a> {
        let node = Node::new(NodeKind::Var(id), span, line);
        node.ty.set(Some(self.objs[id.index()].ty));
        self.ctx.alloc_node(node)
    }

    pub(crate) fn new_cast(
        &self,
        expr: &'a Node<'a>,
        ty: &'a Type<'a>,
        span: Span,
        line: u32,
    ) -> ParseResult<&'a Node<'a>> {
        add_type(expr, &self.ctx)?;
        let node = Node::new(NodeKind::Cast(expr), span, line);
        node.ty.set(Some(ty));
        Ok(self.ctx.alloc_node(node))
    }

    /// Binary node with the usual arithmetic conversion applied to
    /// integer operands, then typed.
    pub(crate) fn new_binary(
        &self,
        op: BinaryOp,
        lhs: &'a Node<'a>,
        rhs: &'a Node<'a>,
        span: Span,
        line: u32,
    ) -> ParseResult<&'a Node<'a>> {
        add_type(lhs, &self.ctx)?;
        add_type(rhs, &self.ctx)?;

        let (lhs, rhs) = if lhs.ty().is_integer() && rhs.ty().is_integer() {
            let common = common_type(&self.ctx, lhs.ty(), rhs.ty());
            (
                self.cast_if_needed(lhs, common, span, line)?,
                self.cast_if_needed(rhs, common, span, line)?,
            )
        } else {
            (lhs, rhs)
        };

        let node = self.alloc(NodeKind::Binary { op, lhs, rhs }, span, line);
        add_type(node, &self.ctx)?;
        Ok(node)
    }

    fn cast_if_needed(
        &self,
        expr: &'a Node<'a>,
        target: &'a Type<'a>,
        span: Span,
        line: u32,
    ) -> ParseResult<&'a Node<'a>> {
        if std::mem::discriminant(&expr.ty().kind) == std::mem::discriminant(&target.kind) {
            return Ok(expr);
        }
        self.new_cast(expr, target, span, line)
    }

    /// `+` with pointer-arithmetic scaling.
    pub(crate) fn new_add(
        &self,
        lhs: &'a Node<'a>,
        rhs: &'a Node<'a>,
        span: Span,
        line: u32,
    ) -> ParseResult<&'a Node<'a>> {
        add_type(lhs, &self.ctx)?;
        add_type(rhs, &self.ctx)?;

        if lhs.ty().is_integer() && rhs.ty().is_integer() {
            return self.new_binary(BinaryOp::Add, lhs, rhs, span, line);
        }
        if lhs.ty().base().is_some() && rhs.ty().base().is_some() {
            return Err(SpannedError::new("invalid operands", span));
        }

        // Canonicalize num + ptr to ptr + num.
        let (lhs, rhs) = if lhs.ty().base().is_none() && rhs.ty().base().is_some() {
            (rhs, lhs)
        } else {
            (lhs, rhs)
        };
        let base = match lhs.ty().base() {
            Some(base) if rhs.ty().is_integer() => base,
            _ => return Err(SpannedError::new("invalid operands", span)),
        };

        // ptr + (num * sizeof(*ptr))
        let scale = self.new_long(base.size as i64, span, line);
        let scaled = self.new_binary(BinaryOp::Mul, rhs, scale, span, line)?;
        let node = self.alloc(
            NodeKind::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs: scaled,
            },
            span,
            line,
        );
        add_type(node, &self.ctx)?;
        Ok(node)
    }

    /// `-` with pointer-arithmetic scaling and pointer difference.
    pub(crate) fn new_sub(
        &self,
        lhs: &'a Node<'a>,
        rhs: &'a Node<'a>,
        span: Span,
        line: u32,
    ) -> ParseResult<&'a Node<'a>> {
        add_type(lhs, &self.ctx)?;
        add_type(rhs, &self.ctx)?;

        if lhs.ty().is_integer() && rhs.ty().is_integer() {
            return self.new_binary(BinaryOp::Sub, lhs, rhs, span, line);
        }

        // ptr - num
        if lhs.ty().base().is_some() && rhs.ty().is_integer() {
            let base = lhs.ty().base().expect("pointer operand");
            let scale = self.new_long(base.size as i64, span, line);
            let scaled = self.new_binary(BinaryOp::Mul, rhs, scale, span, line)?;
            let node = Node::new(
                NodeKind::Binary {
                    op: BinaryOp::Sub,
                    lhs,
                    rhs: scaled,
                },
                span,
                line,
            );
            node.ty.set(Some(lhs.ty()));
            return Ok(self.ctx.alloc_node(node));
        }

        // ptr - ptr: element count, as a long.
        if lhs.ty().base().is_some() && rhs.ty().base().is_some() {
            let base = lhs.ty().base().expect("pointer operand");
            let diff = Node::new(
                NodeKind::Binary {
                    op: BinaryOp::Sub,
                    lhs,
                    rhs,
                },
                span,
                line,
            );
            diff.ty.set(Some(self.ctx.ty_long()));
            let diff = self.ctx.alloc_node(diff);
            let scale = self.new_long(base.size as i64, span, line);
            let node = self.alloc(
                NodeKind::Binary {
                    op: BinaryOp::Div,
                    lhs: diff,
                    rhs: scale,
                },
                span,
                line,
            );
            add_type(node, &self.ctx)?;
            return Ok(node);
        }

        Err(SpannedError::new("invalid operands", span))
    }

    /// Resolves `.member` against the struct or union type of `base`.
    pub(crate) fn struct_ref(
        &self,
        base: &'a Node<'a>,
        name: ferrocc_base::Symbol,
        name_span: Span,
        line: u32,
    ) -> ParseResult<&'a Node<'a>> {
        add_type(base, &self.ctx)?;
        let members = base
            .ty()
            .members()
            .ok_or_else(|| SpannedError::new("not a struct or a union", base.span))?;
        let member = members
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| SpannedError::new("no such member", name_span))?;

        let node = Node::new(NodeKind::Member { base, member }, name_span, line);
        node.ty.set(Some(member.ty));
        Ok(self.ctx.alloc_node(node))
    }
}
