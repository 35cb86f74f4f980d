//! Error types for the Fibonacci service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of a `Number` or `Sequence` call. It implements
//! `From<Error>` for `tonic::Status` so handlers can propagate errors with `?`
//! and clients receive a machine-readable code plus a human-readable message.
//!
//! ## Error Cases
//! - `InvalidRequest`: The argument is outside the operation's domain.
//! - `OutOfRange`: The argument exceeds a server-configured limit.
//! - `Evaluation`: The evaluator timed out or was cancelled (via `fibtree`).
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the Fibonacci service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The client supplied an out-of-domain value. Not retryable as-is.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The client supplied a value beyond what this server will compute.
    #[error("Out of range: {reason}")]
    OutOfRange { reason: String },

    /// The evaluator did not produce a value.
    #[error(transparent)]
    Evaluation(#[from] fibtree::Error),

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::OutOfRange { reason } => Status::out_of_range(reason),
            Error::Evaluation(e @ fibtree::Error::DeadlineExceeded { .. }) => {
                Status::deadline_exceeded(e.to_string())
            }
            Error::Evaluation(e @ fibtree::Error::Cancelled) => Status::cancelled(e.to_string()),
            Error::Evaluation(e) => Status::internal(e.to_string()),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
