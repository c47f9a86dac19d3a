//! Error types for the [`mapping`](super) module.
//!
//! Mapping errors never abort a run: they are captured on the [`Proposal`]
//! they belong to, and only surface as `Err` from explicit recompute and
//! commit calls.
//!
//! [`Proposal`]: super::Proposal

use derive_more::{Display, Error};
use std::path::PathBuf;

use crate::mapping::ProposalId;

/// A mapping error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for mapping operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tags can't be extracted from a name that isn't valid UTF-8.
    #[display("file name is not valid UTF-8: {}", _0.display())]
    NonUtf8Name(#[error(not(source))] PathBuf),
    /// The matched rule's template could not produce a usable destination.
    #[display("rule `{rule}` could not render a destination: {reason}")]
    Template { rule: String, reason: String },
    /// Another proposal already claims the same destination.
    #[display("destination collides with proposal {_0}")]
    Collision(#[error(not(source))] ProposalId),
    /// No proposal with this id exists in the run.
    #[display("unknown proposal {_0}")]
    UnknownProposal(#[error(not(source))] ProposalId),
    #[display("mapping cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Mapping is pure; the same input always fails the same way.
        false
    }
}
