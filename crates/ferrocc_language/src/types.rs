//! The type system: representations, layout, and the typing pass.
//!
//! ## Representation
//!
//! | Kind | size | align |
//! |------|------|-------|
//! | `void` | 1 | 1 |
//! | `char` | 1 | 1 |
//! | `short` | 2 | 2 |
//! | `int` | 4 | 4 |
//! | `long` | 8 | 8 |
//! | pointer | 8 | 8 |
//! | array of T, n | `n * sizeof(T)` | `alignof(T)` |
//! | struct | padded sum of members | max member align |
//! | union | max member size, padded | max member align |
//!
//! Types are immutable once built and live in the AST arena; the primitive
//! types are singletons owned by [`AstContext`]. Struct and union layout
//! (member offsets, padding) is computed by the parser before the type is
//! allocated.
//!
//! ## The typing pass
//!
//! [`add_type`] is an idempotent post-order traversal that annotates every
//! expression node with its result type. Array-typed operands decay to
//! pointers at the `&` operator and wherever the parser's pointer
//! arithmetic consults `base()`; `sizeof` and address-of see the array
//! type itself. Integer operands of a binary operator have already been
//! brought to a common type by the parser (cast wrapping), so the
//! left-operand rule below yields the properly ranked result.

use ferrocc_base::{Result, Span, SpannedError, Symbol};

use crate::arena_ctx::AstContext;
use crate::ast::{BinaryOp, Node, NodeKind};

/// A named field of a struct or union.
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    pub name: Symbol,
    pub ty: &'a Type<'a>,
    /// Byte offset from the start of the containing object. Union members
    /// all sit at offset 0.
    pub offset: i32,
    pub span: Span,
}

/// A named function parameter.
#[derive(Debug, Clone, Copy)]
pub struct Param<'a> {
    pub name: Symbol,
    pub ty: &'a Type<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum TypeKind<'a> {
    Void,
    Char,
    Short,
    Int,
    Long,
    Ptr {
        base: &'a Type<'a>,
    },
    Array {
        base: &'a Type<'a>,
        len: i32,
    },
    Struct {
        members: &'a [Member<'a>],
    },
    Union {
        members: &'a [Member<'a>],
    },
    Func {
        return_ty: &'a Type<'a>,
        params: &'a [Param<'a>],
    },
}

/// A C type: kind plus its computed size and alignment in bytes.
#[derive(Debug, Clone, Copy)]
pub struct Type<'a> {
    pub kind: TypeKind<'a>,
    pub size: i32,
    pub align: i32,
}

impl<'a> Type<'a> {
    pub fn new(kind: TypeKind<'a>, size: i32, align: i32) -> Self {
        Type { kind, size, align }
    }

    /// True for the integer scalars (`char`, `short`, `int`, `long`).
    pub fn is_integer(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Char | TypeKind::Short | TypeKind::Int | TypeKind::Long
        )
    }

    /// The pointee or element type for pointers and arrays.
    ///
    /// Pointer arithmetic and dereferencing treat the two uniformly; this
    /// is where array-to-pointer decay takes effect.
    pub fn base(&self) -> Option<&'a Type<'a>> {
        match self.kind {
            TypeKind::Ptr { base } | TypeKind::Array { base, .. } => Some(base),
            _ => None,
        }
    }

    /// Member list for structs and unions.
    pub fn members(&self) -> Option<&'a [Member<'a>]> {
        match self.kind {
            TypeKind::Struct { members } | TypeKind::Union { members } => Some(members),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, TypeKind::Func { .. })
    }
}

/// Rounds `n` up to the nearest multiple of `align`.
///
/// `align_to(5, 8)` is 8; `align_to(11, 8)` is 16.
pub fn align_to(n: i32, align: i32) -> i32 {
    (n + align - 1) / align * align
}

/// The common type for two integer operands: `long` if either operand is
/// eight bytes wide, otherwise `int`.
pub fn common_type<'a>(ctx: &AstContext<'a>, lhs: &'a Type<'a>, rhs: &'a Type<'a>) -> &'a Type<'a> {
    if lhs.size == 8 || rhs.size == 8 {
        ctx.ty_long()
    } else {
        ctx.ty_int()
    }
}

/// Annotates `node` and everything below it with result types.
///
/// Idempotent: a node whose type is already set (variables, members,
/// casts, calls, and the `long` literals minted for pointer scaling are
/// preset by the parser) keeps it, but its children are still visited.
pub fn add_type<'a>(node: &'a Node<'a>, ctx: &AstContext<'a>) -> Result<()> {
    match node.kind {
        NodeKind::Neg(e)
        | NodeKind::Addr(e)
        | NodeKind::Deref(e)
        | NodeKind::Cast(e)
        | NodeKind::ExprStmt(e)
        | NodeKind::Return(e) => add_type(e, ctx)?,
        NodeKind::Member { base, .. } => add_type(base, ctx)?,
        NodeKind::Assign { lhs, rhs }
        | NodeKind::Binary { lhs, rhs, .. }
        | NodeKind::Comma { lhs, rhs } => {
            add_type(lhs, ctx)?;
            add_type(rhs, ctx)?;
        }
        NodeKind::Funcall { args, .. } => {
            for arg in args {
                add_type(arg, ctx)?;
            }
        }
        NodeKind::Block(body) | NodeKind::StmtExpr(body) => {
            for stmt in body {
                add_type(stmt, ctx)?;
            }
        }
        NodeKind::If { cond, then, els } => {
            add_type(cond, ctx)?;
            add_type(then, ctx)?;
            if let Some(els) = els {
                add_type(els, ctx)?;
            }
        }
        NodeKind::For { init, cond, inc, body } => {
            if let Some(init) = init {
                add_type(init, ctx)?;
            }
            if let Some(cond) = cond {
                add_type(cond, ctx)?;
            }
            if let Some(inc) = inc {
                add_type(inc, ctx)?;
            }
            add_type(body, ctx)?;
        }
        NodeKind::Num(_) | NodeKind::Var(_) => {}
    }

    if node.ty.get().is_some() {
        return Ok(());
    }

    let ty = match node.kind {
        NodeKind::Num(_) => ctx.ty_int(),
        NodeKind::Binary { op, lhs, .. } => match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => lhs.ty(),
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le => ctx.ty_int(),
        },
        NodeKind::Neg(e) => e.ty(),
        NodeKind::Assign { lhs, .. } => {
            if matches!(lhs.ty().kind, TypeKind::Array { .. }) {
                return Err(SpannedError::new("not an lvalue", lhs.span));
            }
            lhs.ty()
        }
        NodeKind::Comma { rhs, .. } => rhs.ty(),
        NodeKind::Addr(e) => match e.ty().kind {
            // Taking the address of an array yields a pointer to its
            // element type, not to the array.
            TypeKind::Array { base, .. } => ctx.pointer_to(base),
            _ => ctx.pointer_to(e.ty()),
        },
        NodeKind::Deref(e) => match e.ty().base() {
            Some(base) if base.is_void() => {
                return Err(SpannedError::new("dereferencing a void pointer", node.span));
            }
            Some(base) => base,
            None => {
                return Err(SpannedError::new("invalid pointer dereference", node.span));
            }
        },
        // The parser presets the callee's declared return type; `long` is
        // only the fallback contract of the calling convention.
        NodeKind::Funcall { .. } => ctx.ty_long(),
        NodeKind::StmtExpr(body) => match body.last() {
            Some(last) => match last.kind {
                NodeKind::ExprStmt(e) => e.ty(),
                _ => {
                    return Err(SpannedError::new(
                        "statement expression returning void is not supported",
                        node.span,
                    ));
                }
            },
            None => {
                return Err(SpannedError::new(
                    "statement expression returning void is not supported",
                    node.span,
                ));
            }
        },
        // Statements carry no type; Var/Member/Cast are preset by the
        // parser and never reach this arm.
        NodeKind::Var(_)
        | NodeKind::Member { .. }
        | NodeKind::Cast(_)
        | NodeKind::ExprStmt(_)
        | NodeKind::Return(_)
        | NodeKind::Block(_)
        | NodeKind::If { .. }
        | NodeKind::For { .. } => return Ok(()),
    };
    node.ty.set(Some(ty));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_to_rounds_up() {
        assert_eq!(align_to(0, 8), 0);
        assert_eq!(align_to(5, 8), 8);
        assert_eq!(align_to(8, 8), 8);
        assert_eq!(align_to(11, 8), 16);
        assert_eq!(align_to(3, 1), 3);
    }

    #[test]
    fn integer_predicate_excludes_void_and_pointers() {
        let void = Type::new(TypeKind::Void, 1, 1);
        let int = Type::new(TypeKind::Int, 4, 4);
        let ptr = Type::new(TypeKind::Ptr { base: &int }, 8, 8);
        assert!(!void.is_integer());
        assert!(int.is_integer());
        assert!(!ptr.is_integer());
    }

    #[test]
    fn base_sees_through_pointers_and_arrays() {
        let int = Type::new(TypeKind::Int, 4, 4);
        let ptr = Type::new(TypeKind::Ptr { base: &int }, 8, 8);
        let arr = Type::new(TypeKind::Array { base: &int, len: 3 }, 12, 4);
        assert_eq!(ptr.base().unwrap().size, 4);
        assert_eq!(arr.base().unwrap().size, 4);
        assert!(int.base().is_none());
    }
}
