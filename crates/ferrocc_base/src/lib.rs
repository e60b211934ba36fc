//! # ferrocc-base
//!
//! Structural atoms shared by every stage of the ferrocc pipeline.
//!
//! This crate has no knowledge of C. It provides the four primitives the
//! lexer, parser, and code generator are built on:
//!
//! - [`Arena`] - bump allocation for AST nodes and types, giving every
//!   compilation structure a single shared lifetime
//! - [`Interner`] / [`Symbol`] - O(1) identifier comparison
//! - [`Span`] - byte-offset source locations
//! - [`SpannedError`] / [`Result`] - the error currency of the compiler

pub mod arena;
pub mod error;
pub mod intern;
pub mod span;

pub use arena::Arena;
pub use error::{Result, SpannedError};
pub use intern::{Interner, Symbol};
pub use span::Span;
