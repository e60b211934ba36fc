//! # ferrocc-compile
//!
//! The back end: takes the typed [`Program`](ferrocc_language::Program)
//! the front end produced and emits x86-64 assembly in AT&T syntax for the
//! System V AMD64 ABI.
//!
//! - [`codegen`] - the tree-walking code generator. No intermediate
//!   representation and no register allocator: every expression flows
//!   through RAX, intermediates go through the hardware stack.
//! - [`compile`] - the whole pipeline (lexer, parser, code generator) over
//!   locally owned arenas: source text in, assembly text out.
//! - [`diagnostic`] - renders a [`SpannedError`](ferrocc_base::SpannedError)
//!   into the `file:line:` + caret format the CLI prints to stderr.

pub mod codegen;
pub mod compile;
pub mod diagnostic;

pub use codegen::codegen;
pub use compile::compile;
pub use diagnostic::render;
