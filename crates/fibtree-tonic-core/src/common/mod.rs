//! Shared protocol types and error definitions.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized service error type and its gRPC status mapping.
//! - [`types`] - Wire-level limits and value conversions.
//! - [`proto`] - Generated Protobuf service and message definitions.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from `proto/fib.proto`.
///
/// ## Service
///
/// - `Number` - computes a single Fibonacci value under a deadline.
/// - `Sequence` - returns the first `number` terms of the sequence.
///
/// ## Messages
///
/// - [`NumberRequest`](proto::NumberRequest) /
///   [`NumberResponse`](proto::NumberResponse)
/// - [`SequenceRequest`](proto::SequenceRequest) /
///   [`SequenceResponse`](proto::SequenceResponse)
pub mod proto {
    tonic::include_proto!("fib");

    /// Encoded file descriptor set for `tonic-reflection`.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("fib_descriptor");
}
