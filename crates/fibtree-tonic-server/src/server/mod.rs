//! Server-side components of the `fibtree` gRPC service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration and validation.
//! - [`service`] - The `FibService` facade and its lifecycle.
//! - [`telemetry`] - Logging initialization and optional OpenTelemetry export.

pub mod config;
pub mod service;
pub mod telemetry;
