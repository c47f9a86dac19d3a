//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the config, scan and
//! mapping layers are raised into one of these kinds at the orchestrator
//! boundary, keeping the original error as a child in the tree.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a failure at the orchestrator boundary.
///
/// ### Fatal
/// - [`ErrorKind::Config`]: loading or reloading configuration failed; the
///   previous configuration is still active.
/// - [`ErrorKind::Scan`]: the source root couldn't be scanned.
/// - [`ErrorKind::UnknownProfile`]
///
/// ### Not failures
/// - [`ErrorKind::Busy`]: a run is already in flight.
/// - [`ErrorKind::Cancelled`]: the caller asked the run to stop.
///
/// Per-item mapping failures are never returned here; they are embedded in
/// each [`Proposal`](crate::Proposal).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("scan failed")]
    Scan,
    #[display("mapping failed")]
    Mapping,
    #[display("a normalization run is already in progress")]
    Busy,
    #[display("normalization cancelled")]
    Cancelled,
    #[display("unknown profile: {_0}")]
    UnknownProfile(#[error(not(source))] String),
    /// Runs are spawned onto the current Tokio runtime.
    #[display("no async runtime available")]
    NoRuntime,
    /// The background task panicked or was aborted.
    #[display("normalization task terminated unexpectedly")]
    Terminated,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Config | Self::Scan)
    }
}
