//! gRPC service implementation and request lifecycle.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`FibHandler`).
//! - [`lifecycle`] - admission control, in-flight tracking and graceful
//!   shutdown.

pub mod handler;
pub mod lifecycle;
