//! Lexical scope stack with two name spaces.
//!
//! C keeps ordinary identifiers and struct/union tags in separate name
//! spaces: `struct list list;` is legal, and the two `list`s never
//! collide. Each [`ScopeStack`] frame therefore holds two independent
//! maps:
//!
//! - `vars` - ordinary identifiers, bound to either an object or a
//!   typedef ([`VarScope`]). Typedef names live here, distinguished by
//!   their binding variant, because declaration-specifier parsing must
//!   decide whether an identifier names a type purely from lookup.
//! - `tags` - struct and union tags, bound to their types.
//!
//! Frames are pushed at compound-statement boundaries and at function
//! entry (for parameters); lookup searches inside-out.

use std::collections::HashMap;

use ferrocc_base::Symbol;

use crate::ast::ObjId;
use crate::types::Type;

/// What an ordinary identifier is bound to.
#[derive(Clone, Copy)]
pub enum VarScope<'a> {
    /// A local variable, global variable, or function.
    Var(ObjId),
    /// A typedef name.
    Typedef(&'a Type<'a>),
}

#[derive(Default)]
struct ScopeFrame<'a> {
    vars: HashMap<Symbol, VarScope<'a>>,
    tags: HashMap<Symbol, &'a Type<'a>>,
}

/// Stack of lexical scopes; the bottom frame is file scope.
pub struct ScopeStack<'a> {
    frames: Vec<ScopeFrame<'a>>,
}

impl<'a> ScopeStack<'a> {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![ScopeFrame::default()],
        }
    }

    pub fn enter(&mut self) {
        self.frames.push(ScopeFrame::default());
    }

    pub fn leave(&mut self) {
        self.frames.pop();
    }

    /// Number of live frames; `enter` and `leave` must balance.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Binds an ordinary identifier in the innermost scope.
    pub fn bind_var(&mut self, name: Symbol, binding: VarScope<'a>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.vars.insert(name, binding);
        }
    }

    /// Binds a struct/union tag in the innermost scope.
    pub fn bind_tag(&mut self, name: Symbol, ty: &'a Type<'a>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.tags.insert(name, ty);
        }
    }

    /// Inside-out lookup in the ordinary name space.
    pub fn find_var(&self, name: Symbol) -> Option<VarScope<'a>> {
        for frame in self.frames.iter().rev() {
            if let Some(binding) = frame.vars.get(&name) {
                return Some(*binding);
            }
        }
        None
    }

    /// Inside-out lookup in the tag name space.
    pub fn find_tag(&self, name: Symbol) -> Option<&'a Type<'a>> {
        for frame in self.frames.iter().rev() {
            if let Some(ty) = frame.tags.get(&name) {
                return Some(ty);
            }
        }
        None
    }

    /// Resolves `name` as a typedef, if that is what it is bound to.
    pub fn find_typedef(&self, name: Symbol) -> Option<&'a Type<'a>> {
        match self.find_var(name) {
            Some(VarScope::Typedef(ty)) => Some(ty),
            _ => None,
        }
    }
}

impl<'a> Default for ScopeStack<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;
    use ferrocc_base::Interner;

    #[test]
    fn lookup_is_inside_out() {
        let int = Type::new(TypeKind::Int, 4, 4);
        let long = Type::new(TypeKind::Long, 8, 8);
        let mut interner = Interner::new();
        let name = interner.intern("t");

        let mut scopes = ScopeStack::new();
        scopes.bind_var(name, VarScope::Typedef(&int));
        scopes.enter();
        scopes.bind_var(name, VarScope::Typedef(&long));

        assert_eq!(scopes.find_typedef(name).unwrap().size, 8);
        scopes.leave();
        assert_eq!(scopes.find_typedef(name).unwrap().size, 4);
    }

    #[test]
    fn tags_and_vars_do_not_collide() {
        let int = Type::new(TypeKind::Int, 4, 4);
        let mut interner = Interner::new();
        let name = interner.intern("list");

        let mut scopes = ScopeStack::new();
        scopes.bind_tag(name, &int);
        assert!(scopes.find_tag(name).is_some());
        assert!(scopes.find_var(name).is_none());
    }

    #[test]
    fn leaving_a_scope_drops_its_bindings() {
        let int = Type::new(TypeKind::Int, 4, 4);
        let mut interner = Interner::new();
        let name = interner.intern("local");

        let mut scopes = ScopeStack::new();
        scopes.enter();
        scopes.bind_tag(name, &int);
        assert!(scopes.find_tag(name).is_some());
        scopes.leave();
        assert!(scopes.find_tag(name).is_none());
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn object_bindings_resolve_to_ids() {
        let mut interner = Interner::new();
        let name = interner.intern("x");

        let mut scopes = ScopeStack::new();
        scopes.bind_var(name, VarScope::Var(ObjId::new(3)));
        match scopes.find_var(name) {
            Some(VarScope::Var(id)) => assert_eq!(id.index(), 3),
            _ => panic!("expected an object binding"),
        }
        assert!(scopes.find_typedef(name).is_none());
    }
}
