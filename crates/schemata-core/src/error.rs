//! # Error Types
//!
//! Errors raised by the core algebras and value types. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! None of these are evaluation results: a failing assertion is a
//! [`Violation`](crate::Violation), never an error.

use thiserror::Error;

/// Error constructing a constraint combinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// A combinator was built over an empty operand list.
    #[error("{combinator} requires at least one operand")]
    NoOperands {
        /// Name of the combinator (`anyOf`, `allOf`, `oneOf`).
        combinator: &'static str,
    },
}

/// Error parsing a JSON Pointer string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// A non-empty pointer must start with `/`.
    #[error("JSON pointer '{0}' must be empty or start with '/'")]
    MissingLeadingSlash(String),

    /// `~` must be followed by `0` or `1`.
    #[error("JSON pointer '{pointer}' has an invalid escape at token offset {position}")]
    InvalidEscape {
        /// The full pointer text.
        pointer: String,
        /// Offset of the `~` within its reference token.
        position: usize,
    },
}

/// A keyword was asked for a view it does not provide.
///
/// Callers should check the keyword's categories before asking for a view;
/// this error is what they get when they do not.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("operation '{operation}' is not supported by keyword '{keyword}'")]
pub struct UnsupportedOperation {
    /// Name of the keyword.
    pub keyword: String,
    /// The unsupported operation (e.g. `as_annotation`).
    pub operation: &'static str,
}
