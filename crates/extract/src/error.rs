//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Extraction itself never fails; these are raised while *building* pattern
/// rules, so they describe what is wrong with the rule definition.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The regular expression does not compile.
    #[display("invalid regular expression `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },
    /// Keywords are compared against whole alphanumeric filename tokens.
    #[display("keyword must be a single alphanumeric token, found: `{_0}`")]
    InvalidKeyword(#[error(not(source))] String),
    /// The capture group does not exist in the expression (or was given for a keyword).
    #[display("invalid capture group: {_0}")]
    InvalidCapture(#[error(not(source))] String),
    /// Not one of the six tag categories.
    #[display("unknown tag category: {_0}")]
    UnknownCategory(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Rule definitions are either valid or they're not.
        false
    }
}
