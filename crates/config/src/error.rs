//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use shotsort_extract::Category;
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document could not be read at all.
    #[display("unable to read configuration: {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
    /// The document is not a map of the expected shape.
    #[display("malformed {document} document: {reason}")]
    Malformed { document: &'static str, reason: String },
    /// A pattern rule is well-formed but can't be used (`position` is 1-based).
    #[display("invalid {category} pattern #{position}: {reason}")]
    InvalidPattern { category: Category, position: usize, reason: String },
    /// A classification rule is well-formed but can't be used (`position` is 1-based).
    #[display("invalid rule #{position} in profile `{profile}`: {reason}")]
    InvalidRule { profile: String, position: usize, reason: String },
    /// The path template does not compile, or renders an unusable path.
    #[display("invalid path template `{template}`: {reason}")]
    Template { template: String, reason: String },
    /// The path would escape the destination root, or is empty.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Settings failed to load or validate.
    #[display("invalid settings: {_0}")]
    Settings(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Someone might be halfway through saving the file.
        matches!(self, Self::Unreadable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        let kind = ErrorKind::InvalidPattern {
            category: Category::Task,
            position: 2,
            reason: "keyword and regex are mutually exclusive".to_string(),
        };
        assert_eq!(kind.to_string(), "invalid task pattern #2: keyword and regex are mutually exclusive");
        assert!(ErrorKind::Unreadable(PathBuf::from("patterns.yaml")).is_retryable());
        assert!(!kind.is_retryable());
    }
}
