//! Recursive-descent parser with integrated semantic analysis.
//!
//! The parser consumes the token vector and yields a [`Program`]: the
//! top-level functions and global variables in source order. Typing is not
//! a separate phase - the expression builders call
//! [`add_type`](crate::types::add_type) as nodes are constructed, which is
//! where pointer-arithmetic scaling, array decay, and the usual arithmetic
//! conversion take effect.
//!
//! The grammar is split across three files, one trait each, all
//! implemented on [`Parser`]:
//!
//! | File | Trait | Covers |
//! |------|-------|--------|
//! | `decl.rs` | [`DeclParsing`] | declaration specifiers, declarators, struct/union bodies, typedefs |
//! | `stmt.rs` | [`StmtParsing`] | statements and compound statements |
//! | `expr.rs` | [`ExprParsing`] | the expression precedence ladder |
//!
//! The parser owns the scope stack (two name spaces per frame: ordinary
//! identifiers and struct/union tags) and the object table. Locals
//! accumulate into `locals` while a function body is being parsed and are
//! moved onto the finished function on exit; stack offsets are assigned
//! later by the code generator.

mod decl;
mod expr;
mod stmt;


pub use decl::{DeclParsing, Declarator, VarAttr};
pub use expr::ExprParsing;
pub use stmt::StmtParsing;

use ferrocc_base::{Interner, Result, Span, SpannedError, Symbol};

use crate::arena_ctx::AstContext;
use crate::ast::{Node, NodeKind, Obj, ObjId, Program};
use crate::scope::{ScopeStack, VarScope};
use crate::token::{Keyword, Punct, Token, TokenKind};
use crate::types::Type;

pub(crate) type ParseResult<T> = Result<T>;

/// The parser: a cursor over the token vector plus everything the grammar
/// productions share.
pub struct Parser<'a, 'i> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) ctx: AstContext<'a>,
    pub(crate) interner: &'i mut Interner,
    pub(crate) scopes: ScopeStack<'a>,
    pub(crate) objs: Vec<Obj<'a>>,
    pub(crate) top_level: Vec<ObjId>,
    /// Locals of the function currently being parsed, declaration order.
    pub(crate) locals: Vec<ObjId>,
    pub(crate) current_fn: Option<ObjId>,
    /// Counter for `.L..<n>` anonymous global names.
    pub(crate) anon_count: u32,
}

impl<'a, 'i> Parser<'a, 'i> {
    pub fn new(tokens: Vec<Token>, ctx: AstContext<'a>, interner: &'i mut Interner) -> Self {
        Parser {
            tokens,
            pos: 0,
            ctx,
            interner,
            scopes: ScopeStack::new(),
            objs: Vec::new(),
            top_level: Vec::new(),
            locals: Vec::new(),
            current_fn: None,
            anon_count: 0,
        }
    }

    /// program := (typedef | function | global-var)*
    pub fn parse(mut self) -> ParseResult<Program<'a>> {
        while !self.at_eof() {
            let mut attr = VarAttr::default();
            let basety = self.declspec(Some(&mut attr))?;

            if attr.is_typedef {
                self.typedef_decl(basety)?;
                continue;
            }
            if self.is_function()? {
                self.function(basety)?;
            } else {
                self.global_variable(basety)?;
            }
        }
        debug_assert_eq!(self.scopes.depth(), 1);
        Ok(Program {
            objs: self.objs,
            top_level: self.top_level,
        })
    }

    /// Lookahead: does a declarator starting here build a function type?
    ///
    /// Runs the declarator against a throwaway base, then rewinds.
    fn is_function(&mut self) -> ParseResult<bool> {
        // A bare `struct S { ... };` or `int;` has no declarator at all.
        if self.at_punct(Punct::Semicolon) {
            return Ok(false);
        }
        let saved = self.pos;
        let d = self.declarator(self.ctx.ty_int());
        self.pos = saved;
        Ok(d?.ty.is_func())
    }

    fn function(&mut self, basety: &'a Type<'a>) -> ParseResult<()> {
        let d = self.declarator(basety)?;
        let params = match d.ty.kind {
            crate::types::TypeKind::Func { params, .. } => params,
            _ => return Err(SpannedError::new("expected a function", d.span)),
        };

        let id = self.new_gvar(d.name, d.ty);
        self.objs[id.index()].is_function = true;
        self.objs[id.index()].is_definition = false;

        self.locals.clear();
        self.scopes.enter();
        let mut param_ids = Vec::with_capacity(params.len());
        for p in params {
            param_ids.push(self.new_lvar(p.name, p.ty));
        }
        self.objs[id.index()].params = param_ids;

        // Declaration only: `int f();`
        if self.consume_punct(Punct::Semicolon) {
            self.scopes.leave();
            return Ok(());
        }

        self.objs[id.index()].is_definition = true;
        self.current_fn = Some(id);
        self.expect_punct(Punct::LBrace)?;
        let body = self.compound_stmt()?;
        self.objs[id.index()].body = Some(body);
        self.objs[id.index()].locals = std::mem::take(&mut self.locals);
        self.scopes.leave();
        self.current_fn = None;
        Ok(())
    }

    fn global_variable(&mut self, basety: &'a Type<'a>) -> ParseResult<()> {
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
            if d.ty.is_void() {
                return Err(SpannedError::new("variable declared void", d.span));
            }
            self.new_gvar(d.name, d.ty);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Object table
    // ------------------------------------------------------------------

    pub(crate) fn new_lvar(&mut self, name: Symbol, ty: &'a Type<'a>) -> ObjId {
        let id = ObjId::new(self.objs.len());
        let mut obj = Obj::new(name, ty);
        obj.is_local = true;
        self.objs.push(obj);
        self.locals.push(id);
        self.scopes.bind_var(name, VarScope::Var(id));
        id
    }

    pub(crate) fn new_gvar(&mut self, name: Symbol, ty: &'a Type<'a>) -> ObjId {
        let id = ObjId::new(self.objs.len());
        let mut obj = Obj::new(name, ty);
        obj.is_definition = true;
        self.objs.push(obj);
        self.top_level.push(id);
        self.scopes.bind_var(name, VarScope::Var(id));
        id
    }

    /// Materializes a string literal as an anonymous global named
    /// `.L..<n>`; `data` already carries its trailing NUL.
    pub(crate) fn new_string_literal(&mut self, data: Vec<u8>, ty: &'a Type<'a>) -> ObjId {
        let name = format!(".L..{}", self.anon_count);
        self.anon_count += 1;
        let sym = self.interner.intern(&name);
        let id = self.new_gvar(sym, ty);
        self.objs[id.index()].init_data = Some(data);
        id
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Token `n` places ahead, clamped to the EOF token.
    pub(crate) fn peek_at(&self, n: usize) -> &Token {
        let i = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[i]
    }

    /// Span and line of the current token.
    pub(crate) fn loc(&self) -> (Span, u32) {
        let tok = self.peek();
        (tok.span, tok.line)
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn at_punct(&self, p: Punct) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(q) if q == p)
    }

    pub(crate) fn at_keyword(&self, k: Keyword) -> bool {
        matches!(self.peek().kind, TokenKind::Keyword(q) if q == k)
    }

    pub(crate) fn consume_punct(&mut self, p: Punct) -> bool {
        if self.at_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn consume_keyword(&mut self, k: Keyword) -> bool {
        if self.at_keyword(k) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, p: Punct) -> ParseResult<()> {
        if self.consume_punct(p) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected '{}'", p.as_str())))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> ParseResult<(Symbol, Span)> {
        match self.peek().kind {
            TokenKind::Ident(sym) => {
                let span = self.peek().span;
                self.pos += 1;
                Ok((sym, span))
            }
            _ => Err(self.error_here("expected an identifier")),
        }
    }

    pub(crate) fn expect_number(&mut self) -> ParseResult<i64> {
        match self.peek().kind {
            TokenKind::Num(val) => {
                self.pos += 1;
                Ok(val)
            }
            _ => Err(self.error_here("expected a number")),
        }
    }

    pub(crate) fn error_here(&self, message: &str) -> SpannedError {
        SpannedError::new(message, self.peek().span)
    }

    /// True when the current token can start a declaration: a type
    /// keyword, `struct`/`union`, `typedef`, or an identifier bound to a
    /// typedef in scope.
    pub(crate) fn is_typename(&self) -> bool {
        self.is_typename_at(0)
    }

    pub(crate) fn is_typename_at(&self, n: usize) -> bool {
        match self.peek_at(n).kind {
            TokenKind::Keyword(
                Keyword::Void
                | Keyword::Char
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Struct
                | Keyword::Union
                | Keyword::Typedef,
            ) => true,
            TokenKind::Ident(sym) => self.scopes.find_typedef(sym).is_some(),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Node construction
    // ------------------------------------------------------------------

    pub(crate) fn alloc(&self, kind: NodeKind<'a>, span: Span, line: u32) -> &'a Node<'a> {
        self.ctx.alloc_node(Node::new(kind, span, line))
    }

    pub(crate) fn empty_block(&self, span: Span, line: u32) -> &'a Node<'a> {
        self.alloc(NodeKind::Block(self.ctx.alloc_node_list(Vec::new())), span, line)
    }
}
