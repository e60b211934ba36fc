//! Statement parsing.
//!
//! `while` has no node of its own: it parses into a `For` with only a
//! condition and a body, so the code generator has one loop shape to emit.
//! Every statement that leaves a compound statement has been through
//! [`add_type`], which is what finishes typing for expressions the
//! builders constructed lazily (plain assignments, comma chains).

use ferrocc_base::SpannedError;

use super::decl::DeclParsing;
use super::expr::ExprParsing;
use super::{ParseResult, Parser};
use crate::ast::{Node, NodeKind};
use crate::token::{Keyword, Punct};
use crate::types::{add_type, TypeKind};

pub trait StmtParsing<'a> {
    fn stmt(&mut self) -> ParseResult<&'a Node<'a>>;
    fn compound_stmt(&mut self) -> ParseResult<&'a Node<'a>>;
    fn expr_stmt(&mut self) -> ParseResult<&'a Node<'a>>;
}

impl<'a, 'i> StmtParsing<'a> for Parser<'a, 'i> {
    /// stmt := "return" expr ";"
    ///       | "if" "(" expr ")" stmt ("else" stmt)?
    ///       | "for" "(" expr-stmt expr? ";" expr? ")" stmt
    ///       | "while" "(" expr ")" stmt
    ///       | "{" compound-stmt
    ///       | expr-stmt
    fn stmt(&mut self) -> ParseResult<&'a Node<'a>> {
        let (span, line) = self.loc();

        if self.consume_keyword(Keyword::Return) {
            let expr = self.expr()?;
            let fn_id = match self.current_fn {
                Some(id) => id,
                None => return Err(SpannedError::new("return outside of a function", span)),
            };
            let return_ty = match self.objs[fn_id.index()].ty.kind {
                TypeKind::Func { return_ty, .. } => return_ty,
                _ => unreachable!("function object without function type"),
            };
            // Implicit conversion to the declared return type.
            let expr = self.new_cast(expr, return_ty, expr.span, line)?;
            self.expect_punct(Punct::Semicolon)?;
            return Ok(self.alloc(NodeKind::Return(expr), span, line));
        }

        if self.consume_keyword(Keyword::If) {
            self.expect_punct(Punct::LParen)?;
            let cond = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            let then = self.stmt()?;
            let els = if self.consume_keyword(Keyword::Else) {
                Some(self.stmt()?)
            } else {
                None
            };
            return Ok(self.alloc(NodeKind::If { cond, then, els }, span, line));
        }

        if self.consume_keyword(Keyword::For) {
            self.expect_punct(Punct::LParen)?;
            let init = self.expr_stmt()?;
            let cond = if self.at_punct(Punct::Semicolon) {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect_punct(Punct::Semicolon)?;
            let inc = if self.at_punct(Punct::RParen) {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect_punct(Punct::RParen)?;
            let body = self.stmt()?;
            return Ok(self.alloc(
                NodeKind::For {
                    init: Some(init),
                    cond,
                    inc,
                    body,
                },
                span,
                line,
            ));
        }

        if self.consume_keyword(Keyword::While) {
            self.expect_punct(Punct::LParen)?;
            let cond = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            let body = self.stmt()?;
            return Ok(self.alloc(
                NodeKind::For {
                    init: None,
                    cond: Some(cond),
                    inc: None,
                    body,
                },
                span,
                line,
            ));
        }

        if self.consume_punct(Punct::LBrace) {
            return self.compound_stmt();
        }

        self.expr_stmt()
    }

    /// compound-stmt := (declaration | stmt)* "}" with the opening brace
    /// already consumed.
    fn compound_stmt(&mut self) -> ParseResult<&'a Node<'a>> {
        let (span, line) = self.loc();
        let mut body = Vec::new();

        self.scopes.enter();
        while !self.at_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.error_here("expected '}'"));
            }
            let node = if self.is_typename() {
                self.declaration()?
            } else {
                self.stmt()?
            };
            add_type(node, &self.ctx)?;
            body.push(node);
        }
        self.scopes.leave();
        self.pos += 1;

        Ok(self.alloc(
            NodeKind::Block(self.ctx.alloc_node_list(body)),
            span,
            line,
        ))
    }

    /// expr-stmt := expr? ";"
    ///
    /// A lone `;` yields an empty block.
    fn expr_stmt(&mut self) -> ParseResult<&'a Node<'a>> {
        let (span, line) = self.loc();
        if self.consume_punct(Punct::Semicolon) {
            return Ok(self.empty_block(span, line));
        }
        let expr = self.expr()?;
        self.expect_punct(Punct::Semicolon)?;
        Ok(self.alloc(NodeKind::ExprStmt(expr), span, line))
    }
}
