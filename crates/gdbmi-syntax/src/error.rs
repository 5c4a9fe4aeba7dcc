//! Error types for the record grammar.
//!
//! The lexer is total, so every failure surfaced by this crate originates in
//! the grammar stage: a token stream that no production can reduce.

use thiserror::Error;

/// A protocol line that could not be reduced to a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The line produced no tokens at all.
    #[error("empty record line")]
    Empty,

    /// A token appeared where the grammar expected something else.
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// Description of what the grammar was looking for.
        expected: &'static str,
        /// Rendering of the offending token.
        found: String,
    },

    /// The token stream ended in the middle of a production.
    #[error("expected {expected}, found end of line")]
    UnexpectedEnd {
        /// Description of what the grammar was looking for.
        expected: &'static str,
    },

    /// A sequence tag contained something other than ASCII digits.
    #[error("invalid sequence tag '{token}'")]
    InvalidSequence {
        /// The rejected tag text.
        token: String,
    },
}

impl ParseError {
    pub(crate) fn unexpected(expected: &'static str, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            expected,
            found: found.into(),
        }
    }

    pub(crate) const fn end(expected: &'static str) -> Self {
        Self::UnexpectedEnd { expected }
    }
}
