//! Declaration parsing: specifiers, declarators, aggregates, typedefs.
//!
//! ## Specifier bitmask
//!
//! Declaration specifiers may appear in any order (`long int`,
//! `int long`), so `declspec` accumulates a counter in which each type
//! keyword has a distinct bit weight. Only the sums that correspond to a
//! real type are accepted; anything else ("`int char`", "`long char`") is
//! rejected the moment the sum stops matching. A struct/union specifier or
//! a typedef name counts as "other" and is admitted only as the first
//! specifier.
//!
//! ## Declarators
//!
//! `int (*p)[3]` and `int *p[3]` bind differently. Parenthesized
//! sub-declarators are handled by two passes: walk the sub-declarator
//! against a throwaway base just to find where it ends, parse the
//! enclosing suffix against the real base, then re-parse the
//! sub-declarator with the now-complete enclosed type. The cursor
//! arithmetic is the only state involved, so both passes see identical
//! tokens.

use ferrocc_base::{Span, SpannedError, Symbol};

use super::{ParseResult, Parser};
use crate::ast::NodeKind;
use crate::scope::VarScope;
use crate::token::{Keyword, Punct, TokenKind};
use crate::types::{align_to, Member, Param, Type, TypeKind};

use super::expr::ExprParsing;

/// Storage-class information gathered by `declspec`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VarAttr {
    pub is_typedef: bool,
}

/// A parsed declarator: the constructed type plus the declared name.
pub struct Declarator<'a> {
    pub ty: &'a Type<'a>,
    pub name: Symbol,
    pub span: Span,
}

pub trait DeclParsing<'a> {
    fn declspec(&mut self, attr: Option<&mut VarAttr>) -> ParseResult<&'a Type<'a>>;
    fn declarator(&mut self, base: &'a Type<'a>) -> ParseResult<Declarator<'a>>;
    fn abstract_declarator(&mut self, base: &'a Type<'a>) -> ParseResult<&'a Type<'a>>;
    fn typename(&mut self) -> ParseResult<&'a Type<'a>>;
    fn type_suffix(&mut self, ty: &'a Type<'a>) -> ParseResult<&'a Type<'a>>;
    fn func_params(&mut self, return_ty: &'a Type<'a>) -> ParseResult<&'a Type<'a>>;
    fn struct_decl(&mut self) -> ParseResult<&'a Type<'a>>;
    fn union_decl(&mut self) -> ParseResult<&'a Type<'a>>;
    fn struct_members(&mut self) -> ParseResult<Vec<Member<'a>>>;
    fn declaration(&mut self) -> ParseResult<&'a crate::ast::Node<'a>>;
    fn typedef_decl(&mut self, basety: &'a Type<'a>) -> ParseResult<()>;
}

// Bit weights for the specifier counter. Repeated or contradictory
// specifiers sum to values outside the accepted set.
const VOID: u32 = 1 << 0;
const CHAR: u32 = 1 << 2;
const SHORT: u32 = 1 << 4;
const INT: u32 = 1 << 6;
const LONG: u32 = 1 << 8;
const OTHER: u32 = 1 << 10;

impl<'a, 'i> DeclParsing<'a> for Parser<'a, 'i> {
    /// declspec := ("void" | "char" | "short" | "int" | "long"
    ///             | "struct" struct-decl | "union" union-decl
    ///             | "typedef" | typedef-name)+
    fn declspec(&mut self, mut attr: Option<&mut VarAttr>) -> ParseResult<&'a Type<'a>> {
        let mut counter = 0u32;
        let mut ty = self.ctx.ty_int();

        while self.is_typename() {
            let (span, _) = self.loc();

            if self.at_keyword(Keyword::Typedef) {
                match attr.as_deref_mut() {
                    Some(a) => a.is_typedef = true,
                    None => {
                        return Err(SpannedError::new(
                            "storage class specifier is not allowed in this context",
                            span,
                        ));
                    }
                }
                self.pos += 1;
                continue;
            }

            // struct/union specifiers and typedef names are mutually
            // exclusive with everything that follows.
            if self.at_keyword(Keyword::Struct) || self.at_keyword(Keyword::Union) {
                if counter > 0 {
                    break;
                }
                if self.consume_keyword(Keyword::Struct) {
                    ty = self.struct_decl()?;
                } else {
                    self.pos += 1;
                    ty = self.union_decl()?;
                }
                counter += OTHER;
                continue;
            }
            if let TokenKind::Ident(name) = self.peek().kind {
                if counter > 0 {
                    break;
                }
                match self.scopes.find_typedef(name) {
                    Some(def) => {
                        ty = def;
                        self.pos += 1;
                        counter += OTHER;
                        continue;
                    }
                    None => break,
                }
            }

            counter += match self.peek().kind {
                TokenKind::Keyword(Keyword::Void) => VOID,
                TokenKind::Keyword(Keyword::Char) => CHAR,
                TokenKind::Keyword(Keyword::Short) => SHORT,
                TokenKind::Keyword(Keyword::Int) => INT,
                TokenKind::Keyword(Keyword::Long) => LONG,
                _ => break,
            };
            self.pos += 1;

            ty = match counter {
                c if c == VOID => self.ctx.ty_void(),
                c if c == CHAR => self.ctx.ty_char(),
                c if c == SHORT || c == SHORT + INT => self.ctx.ty_short(),
                c if c == INT => self.ctx.ty_int(),
                c if c == LONG || c == LONG + INT || c == LONG + LONG || c == LONG + LONG + INT => {
                    self.ctx.ty_long()
                }
                _ => return Err(SpannedError::new("invalid type", span)),
            };
        }

        Ok(ty)
    }

    /// declarator := "*"* ("(" declarator ")" | identifier) type-suffix
    fn declarator(&mut self, base: &'a Type<'a>) -> ParseResult<Declarator<'a>> {
        let mut ty = base;
        while self.consume_punct(Punct::Star) {
            ty = self.ctx.pointer_to(ty);
        }

        if self.consume_punct(Punct::LParen) {
            let inside = self.pos;
            self.declarator(self.ctx.ty_int())?;
            self.expect_punct(Punct::RParen)?;
            let ty = self.type_suffix(ty)?;
            let after = self.pos;
            self.pos = inside;
            let d = self.declarator(ty)?;
            self.pos = after;
            return Ok(d);
        }

        let (name, span) = match self.peek().kind {
            TokenKind::Ident(sym) => {
                let span = self.peek().span;
                self.pos += 1;
                (sym, span)
            }
            _ => return Err(self.error_here("expected a variable name")),
        };
        let ty = self.type_suffix(ty)?;
        Ok(Declarator { ty, name, span })
    }

    /// abstract-declarator := "*"* ("(" abstract-declarator ")")? type-suffix
    fn abstract_declarator(&mut self, base: &'a Type<'a>) -> ParseResult<&'a Type<'a>> {
        let mut ty = base;
        while self.consume_punct(Punct::Star) {
            ty = self.ctx.pointer_to(ty);
        }

        if self.consume_punct(Punct::LParen) {
            let inside = self.pos;
            self.abstract_declarator(self.ctx.ty_int())?;
            self.expect_punct(Punct::RParen)?;
            let ty = self.type_suffix(ty)?;
            let after = self.pos;
            self.pos = inside;
            let ty = self.abstract_declarator(ty)?;
            self.pos = after;
            return Ok(ty);
        }

        self.type_suffix(ty)
    }

    /// typename := declspec abstract-declarator
    fn typename(&mut self) -> ParseResult<&'a Type<'a>> {
        let basety = self.declspec(None)?;
        self.abstract_declarator(basety)
    }

    /// type-suffix := "(" func-params | "[" number "]" type-suffix | ε
    fn type_suffix(&mut self, ty: &'a Type<'a>) -> ParseResult<&'a Type<'a>> {
        if self.consume_punct(Punct::LParen) {
            return self.func_params(ty);
        }
        if self.consume_punct(Punct::LBracket) {
            let len = self.expect_number()?;
            self.expect_punct(Punct::RBracket)?;
            let ty = self.type_suffix(ty)?;
            return Ok(self.ctx.array_of(ty, len as i32));
        }
        Ok(ty)
    }

    /// func-params := (declspec declarator ("," declspec declarator)*)? ")"
    fn func_params(&mut self, return_ty: &'a Type<'a>) -> ParseResult<&'a Type<'a>> {
        let mut params = Vec::new();
        while !self.at_punct(Punct::RParen) {
            if self.at_eof() {
                return Err(self.error_here("expected ')'"));
            }
            if !params.is_empty() {
                self.expect_punct(Punct::Comma)?;
            }
            let basety = self.declspec(None)?;
            let d = self.declarator(basety)?;
            match d.ty.kind {
                TypeKind::Struct { .. } | TypeKind::Union { .. } | TypeKind::Array { .. } => {
                    return Err(SpannedError::new("unsupported parameter type", d.span));
                }
                _ => {}
            }
            params.push(Param {
                name: d.name,
                ty: d.ty,
                span: d.span,
            });
        }
        self.pos += 1;
        Ok(self.ctx.func_type(return_ty, params))
    }

    /// struct-decl := identifier? ("{" struct-members "}")?
    ///
    /// With a tag but no body, resolves the tag in scope.
    fn struct_decl(&mut self) -> ParseResult<&'a Type<'a>> {
        let tag = self.take_tag();
        if let Some((name, span)) = tag {
            if !self.at_punct(Punct::LBrace) {
                return self
                    .scopes
                    .find_tag(name)
                    .ok_or_else(|| SpannedError::new("unknown struct type", span));
            }
        }
        self.expect_punct(Punct::LBrace)?;
        let raw = self.struct_members()?;

        let mut offset = 0;
        let mut align = 1;
        let mut members = Vec::with_capacity(raw.len());
        for mut m in raw {
            offset = align_to(offset, m.ty.align);
            m.offset = offset;
            offset += m.ty.size;
            if align < m.ty.align {
                align = m.ty.align;
            }
            members.push(m);
        }
        let size = align_to(offset, align);

        let ty = self.ctx.struct_type(members, size, align);
        if let Some((name, _)) = tag {
            self.scopes.bind_tag(name, ty);
        }
        Ok(ty)
    }

    /// union-decl := identifier? ("{" struct-members "}")?
    ///
    /// Every member sits at offset 0; size and alignment come from the
    /// largest member.
    fn union_decl(&mut self) -> ParseResult<&'a Type<'a>> {
        let tag = self.take_tag();
        if let Some((name, span)) = tag {
            if !self.at_punct(Punct::LBrace) {
                return self
                    .scopes
                    .find_tag(name)
                    .ok_or_else(|| SpannedError::new("unknown union type", span));
            }
        }
        self.expect_punct(Punct::LBrace)?;
        let members = self.struct_members()?;

        let mut size = 0;
        let mut align = 1;
        for m in &members {
            if size < m.ty.size {
                size = m.ty.size;
            }
            if align < m.ty.align {
                align = m.ty.align;
            }
        }
        let size = align_to(size, align);

        let ty = self.ctx.union_type(members, size, align);
        if let Some((name, _)) = tag {
            self.scopes.bind_tag(name, ty);
        }
        Ok(ty)
    }

    /// struct-members := (declspec declarator ("," declarator)* ";")* "}"
    fn struct_members(&mut self) -> ParseResult<Vec<Member<'a>>> {
        let mut members = Vec::new();
        while !self.at_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.error_here("expected '}'"));
            }
            let basety = self.declspec(None)?;
            let mut first = true;
            while !self.consume_punct(Punct::Semicolon) {
                if self.at_eof() {
                    return Err(self.error_here("expected ';'"));
                }
                if !first {
                    self.expect_punct(Punct::Comma)?;
                }
                first = false;
                let d = self.declarator(basety)?;
                members.push(Member {
                    name: d.name,
                    ty: d.ty,
                    offset: 0,
                    span: d.span,
                });
            }
        }
        self.pos += 1;
        Ok(members)
    }

    /// declaration := declspec (declarator ("=" assign)?
    ///                          ("," declarator ("=" assign)?)*)? ";"
    ///
    /// Yields a block of the initializer expression statements.
    fn declaration(&mut self) -> ParseResult<&'a crate::ast::Node<'a>> {
        let (span, line) = self.loc();
        let mut attr = VarAttr::default();
        let basety = self.declspec(Some(&mut attr))?;

        if attr.is_typedef {
            self.typedef_decl(basety)?;
            return Ok(self.empty_block(span, line));
        }

        let mut stmts = Vec::new();
        let mut first = true;
        while !self.at_punct(Punct::Semicolon) {
            if self.at_eof() {
                return Err(self.error_here("expected ';'"));
            }
            if !first {
                self.expect_punct(Punct::Comma)?;
            }
            first = false;

            let d = self.declarator(basety)?;
            if d.ty.is_void() {
                return Err(SpannedError::new("variable declared void", d.span));
            }
            let id = self.new_lvar(d.name, d.ty);

            if !self.consume_punct(Punct::Assign) {
                continue;
            }
            let lhs = self.var_node(id, d.span, line);
            let rhs = self.assign()?;
            let node = self.alloc(NodeKind::Assign { lhs, rhs }, d.span, line);
            stmts.push(self.alloc(NodeKind::ExprStmt(node), d.span, line));
        }
        self.pos += 1;

        Ok(self.alloc(
            NodeKind::Block(self.ctx.alloc_node_list(stmts)),
            span,
            line,
        ))
    }

    /// typedef := declarator ("," declarator)* ";" with the base type and
    /// the `typedef` keyword already consumed by `declspec`.
    fn typedef_decl(&mut self, basety: &'a Type<'a>) -> ParseResult<()> {
        let mut first = true;
        while !self.consume_punct(Punct::Semicolon) {
            if self.at_eof() {
                return Err(self.error_here("expected ';'"));
            }
            if !first {
                self.expect_punct(Punct::Comma)?;
            }
            first = false;
            let d = self.declarator(basety)?;
            self.scopes.bind_var(d.name, VarScope::Typedef(d.ty));
        }
        Ok(())
    }
}

impl<'a, 'i> Parser<'a, 'i> {
    /// Consumes an optional struct/union tag.
    fn take_tag(&mut self) -> Option<(Symbol, Span)> {
        match self.peek().kind {
            TokenKind::Ident(sym) => {
                let span = self.peek().span;
                self.pos += 1;
                Some((sym, span))
            }
            _ => None,
        }
    }
}
