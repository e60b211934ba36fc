//! Error types with source location tracking.
//!
//! All errors in ferrocc carry a [`Span`] indicating where in the source
//! text the error occurred. Lexical, syntactic, and semantic failures all
//! flow through the same type; the first one aborts the compilation.
//!
//! The caret-and-source-line rendering lives in `ferrocc-compile`'s
//! diagnostic module, which needs the source text and filename; this type
//! only records what went wrong and where.
//!
//! # Example
//!
//! ```
//! use ferrocc_base::{SpannedError, Span, Result};
//!
//! fn reject(tok: &str) -> Result<()> {
//!     Err(SpannedError::new(
//!         format!("expected ';' but found '{}'", tok),
//!         Span::new(0, tok.len()),
//!     ))
//! }
//!
//! let err = reject("}").unwrap_err();
//! assert!(err.to_string().contains("expected ';'"));
//! ```

use crate::span::Span;
use std::fmt;

/// An error annotated with its source location.
///
/// Implements [`std::error::Error`] and [`fmt::Display`]. The display format is:
/// `{message} at {start}..{end}`.
#[derive(Debug, Clone)]
pub struct SpannedError {
    /// Human-readable error description.
    pub message: String,
    /// Location in source where the error occurred.
    pub span: Span,
}

impl SpannedError {
    /// Creates an error with the given message and source location.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SpannedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for SpannedError {}

/// Alias for `std::result::Result<T, SpannedError>`.
///
/// Use this as the return type for fallible operations in ferrocc.
pub type Result<T> = std::result::Result<T, SpannedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanned_error_display() {
        let err = SpannedError::new("invalid token", Span::new(5, 10));
        let display = format!("{}", err);
        assert!(display.contains("invalid token"));
        assert!(display.contains("5..10"));
    }
}
