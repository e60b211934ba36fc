//! Arena context for AST and type allocation.
//!
//! This module provides [`AstContext`], a collection of typed arenas used
//! during parsing to allocate AST nodes, types, and the slices that hang
//! off them. Everything is bump-allocated, with the `'a` lifetime tracking
//! the arena's scope: nothing built during a compilation is freed before
//! the code generator finishes.
//!
//! The context also owns the singleton primitive types (`void`, `char`,
//! `short`, `int`, `long`) and the derived-type constructors
//! ([`pointer_to`](AstContext::pointer_to), [`array_of`](AstContext::array_of),
//! [`func_type`](AstContext::func_type)).

use ferrocc_base::Arena;

use crate::ast::Node;
use crate::types::{Member, Param, Type, TypeKind};

/// Collection of typed arenas plus the primitive type singletons.
///
/// `Copy`: the context is a bundle of references, cheap to hand to every
/// parser helper.
#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    /// Arena for AST nodes.
    nodes: &'a Arena<Node<'a>>,
    /// Arena for node-reference slices (statement lists, argument lists).
    node_lists: &'a Arena<&'a Node<'a>>,
    /// Arena for types.
    types: &'a Arena<Type<'a>>,
    /// Arena for struct/union member slices.
    members: &'a Arena<Member<'a>>,
    /// Arena for function parameter slices.
    params: &'a Arena<Param<'a>>,
    ty_void: &'a Type<'a>,
    ty_char: &'a Type<'a>,
    ty_short: &'a Type<'a>,
    ty_int: &'a Type<'a>,
    ty_long: &'a Type<'a>,
}

impl<'a> AstContext<'a> {
    pub fn new(
        nodes: &'a Arena<Node<'a>>,
        node_lists: &'a Arena<&'a Node<'a>>,
        types: &'a Arena<Type<'a>>,
        members: &'a Arena<Member<'a>>,
        params: &'a Arena<Param<'a>>,
    ) -> Self {
        AstContext {
            nodes,
            node_lists,
            types,
            members,
            params,
            ty_void: types.alloc(Type::new(TypeKind::Void, 1, 1)),
            ty_char: types.alloc(Type::new(TypeKind::Char, 1, 1)),
            ty_short: types.alloc(Type::new(TypeKind::Short, 2, 2)),
            ty_int: types.alloc(Type::new(TypeKind::Int, 4, 4)),
            ty_long: types.alloc(Type::new(TypeKind::Long, 8, 8)),
        }
    }

    pub fn ty_void(&self) -> &'a Type<'a> {
        self.ty_void
    }

    pub fn ty_char(&self) -> &'a Type<'a> {
        self.ty_char
    }

    pub fn ty_short(&self) -> &'a Type<'a> {
        self.ty_short
    }

    pub fn ty_int(&self) -> &'a Type<'a> {
        self.ty_int
    }

    pub fn ty_long(&self) -> &'a Type<'a> {
        self.ty_long
    }

    /// Pointer to `base`: eight bytes, eight-byte aligned.
    pub fn pointer_to(&self, base: &'a Type<'a>) -> &'a Type<'a> {
        self.types.alloc(Type::new(TypeKind::Ptr { base }, 8, 8))
    }

    /// Array of `len` elements of `base`.
    pub fn array_of(&self, base: &'a Type<'a>, len: i32) -> &'a Type<'a> {
        self.types.alloc(Type::new(
            TypeKind::Array { base, len },
            base.size * len,
            base.align,
        ))
    }

    /// Function type. `sizeof` rejects it, so size and alignment are
    /// nominal.
    pub fn func_type(&self, return_ty: &'a Type<'a>, params: Vec<Param<'a>>) -> &'a Type<'a> {
        let params = self.params.alloc_slice(params);
        self.types
            .alloc(Type::new(TypeKind::Func { return_ty, params }, 1, 1))
    }

    /// Struct type from members whose offsets the parser has laid out.
    pub fn struct_type(&self, members: Vec<Member<'a>>, size: i32, align: i32) -> &'a Type<'a> {
        let members = self.members.alloc_slice(members);
        self.types
            .alloc(Type::new(TypeKind::Struct { members }, size, align))
    }

    /// Union type; every member offset is zero.
    pub fn union_type(&self, members: Vec<Member<'a>>, size: i32, align: i32) -> &'a Type<'a> {
        let members = self.members.alloc_slice(members);
        self.types
            .alloc(Type::new(TypeKind::Union { members }, size, align))
    }

    /// Allocates an AST node.
    pub fn alloc_node(&self, node: Node<'a>) -> &'a Node<'a> {
        self.nodes.alloc(node)
    }

    /// Allocates a statement or argument list.
    pub fn alloc_node_list(&self, nodes: Vec<&'a Node<'a>>) -> &'a [&'a Node<'a>] {
        self.node_lists.alloc_slice(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_have_c_sizes() {
        let nodes = Arena::new();
        let node_lists = Arena::new();
        let types = Arena::new();
        let members = Arena::new();
        let params = Arena::new();
        let ctx = AstContext::new(&nodes, &node_lists, &types, &members, &params);

        assert_eq!(ctx.ty_void().size, 1);
        assert_eq!(ctx.ty_char().size, 1);
        assert_eq!(ctx.ty_short().size, 2);
        assert_eq!(ctx.ty_int().size, 4);
        assert_eq!(ctx.ty_long().size, 8);
        assert_eq!(ctx.ty_long().align, 8);
    }

    #[test]
    fn pointer_is_eight_bytes() {
        let nodes = Arena::new();
        let node_lists = Arena::new();
        let types = Arena::new();
        let members = Arena::new();
        let params = Arena::new();
        let ctx = AstContext::new(&nodes, &node_lists, &types, &members, &params);

        let p = ctx.pointer_to(ctx.ty_char());
        assert_eq!(p.size, 8);
        assert_eq!(p.align, 8);
        assert_eq!(p.base().unwrap().size, 1);
    }

    #[test]
    fn array_scales_element_size_and_keeps_alignment() {
        let nodes = Arena::new();
        let node_lists = Arena::new();
        let types = Arena::new();
        let members = Arena::new();
        let params = Arena::new();
        let ctx = AstContext::new(&nodes, &node_lists, &types, &members, &params);

        let a = ctx.array_of(ctx.ty_int(), 3);
        assert_eq!(a.size, 12);
        assert_eq!(a.align, 4);

        let aa = ctx.array_of(a, 2);
        assert_eq!(aa.size, 24);
        assert_eq!(aa.align, 4);
    }
}
