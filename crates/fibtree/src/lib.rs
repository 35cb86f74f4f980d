//! # `fibtree`: deadline-bounded concurrent recursive evaluation
//!
//! `fibtree` computes Fibonacci numbers the expensive way, on purpose: every
//! recursive call `fib(n) = fib(n - 1) + fib(n - 2)` becomes its own tokio
//! task, and results are aggregated up the tree over one-shot channels. The
//! point is not the arithmetic but the shape of the work: an exponentially
//! growing fan-out of tasks that has to be bounded by a deadline and torn down
//! cleanly when it is no longer wanted.
//!
//! ## Building blocks
//!
//! - [`CancelToken`] - idempotent, many-reader cancellation signal scoped to
//!   one request.
//! - [`TaskTree`] - spawns and tracks the nodes of one evaluation; every node
//!   checks the token before doing work, and cancelled children release their
//!   waiting parents by closing their channels.
//! - [`DeadlineCoordinator`] - races the root of a tree against a fixed
//!   budget and fires the token on expiry or abandonment.
//! - [`Sequence`] - restartable generator of consecutive terms for batch
//!   requests.
//!
//! ## Indexing
//!
//! Both the tree and the generator are 1-indexed: `fib(1) = fib(2) = 1`, and
//! the first five generator terms are `1, 1, 2, 3, 5`.
//!
//! ## Example
//!
//! ```rust
//! use core::time::Duration;
//! use fibtree::{DeadlineCoordinator, Error};
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() {
//! let coordinator = DeadlineCoordinator::new(Duration::from_secs(2));
//! assert_eq!(coordinator.evaluate(10).await, Ok(55));
//!
//! let hurried = DeadlineCoordinator::new(Duration::from_millis(10));
//! assert!(matches!(
//!     hurried.evaluate(40).await,
//!     Err(Error::DeadlineExceeded { .. })
//! ));
//! # }
//! ```
//!
//! ## Limits
//!
//! Work and live task count grow like `fib(n)`. Nothing here caps `n`; callers
//! are expected to bound it (the gRPC server caps it at 46, the largest index
//! whose value fits an `int32`).
//!
//! The deadline bounds time, not memory. Every spawned node that has not
//! exited holds a task allocation and a one-shot channel, and workers spawn
//! nodes faster than the tree unwinds, so a single `fib(46)` evaluation can
//! reach hundreds of megabytes before its deadline. Peak usage grows with the
//! budget and with the number of worker threads. Concurrent large requests
//! multiply it; there is no per-request memory cap.

mod cancel;
mod deadline;
mod error;
mod sequence;
mod tree;

pub use crate::cancel::*;
pub use crate::deadline::*;
pub use crate::error::*;
pub use crate::sequence::*;
pub use crate::tree::*;
