//! The recursive task tree.
//!
//! Each node of the tree resolves `fib(n)` for one `n`. Leaves (`n <= 2`)
//! publish `1` straight away; every other node spawns two children for `n - 1`
//! and `n - 2` and publishes their sum. The work is deliberately exponential:
//! there is no memoization and no sharing between subtrees, so the amount of
//! work is exactly what the deadline exists to bound.
//!
//! Results travel up the tree over one-shot channels. A channel that closes
//! without a value means the subtree below it was cancelled, and that absence
//! propagates upward: a parent that sees a closed child closes its own channel
//! without a value instead of summing against a default.
//!
//! Cancellation flows through those same channels. Only node entry reads the
//! token; a waiting parent is released when its children exit, never by the
//! token itself. Firing therefore only flips a flag, and the unwinding of the
//! tree is done by the runtime's workers rather than by whoever fired.

use crate::CancelToken;
use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

/// The value type produced by the evaluator.
///
/// `u64` holds every Fibonacci number up to `fib(93)`; sums saturate beyond
/// that instead of wrapping.
pub type Fib = u64;

/// The receiving half of a node's completion channel.
///
/// Resolves to `Ok(value)` when the node finished and `Err(_)` when the node
/// exited without a value because its request was cancelled.
pub type Completion = oneshot::Receiver<Fib>;

/// A per-request tree of concurrently evaluated nodes.
///
/// Every node is spawned onto the current tokio runtime and registered with a
/// [`TaskTracker`], which lets the owner count live nodes and await the full
/// teardown of the tree. Cloning a `TaskTree` is cheap and yields another
/// handle to the same tree.
#[derive(Clone, Debug)]
pub struct TaskTree {
    token: CancelToken,
    tracker: TaskTracker,
    spawned: Arc<AtomicU64>,
}

impl TaskTree {
    /// Creates an empty tree whose nodes all observe `token`.
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            tracker: TaskTracker::new(),
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The token every node of this tree checks.
    pub const fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Spawns the root node for `n` and returns its completion channel.
    ///
    /// A root for `n == 0` resolves to `0` without spawning children.
    pub fn spawn_root(&self, n: u32) -> Completion {
        self.spawn_node(n)
    }

    fn spawn_node(&self, n: u32) -> Completion {
        let (tx, rx) = oneshot::channel();
        self.spawned.fetch_add(1, Ordering::Relaxed);
        self.tracker.spawn(node(self.clone(), n, tx));
        rx
    }

    /// Number of nodes that have been spawned and not yet exited.
    pub fn live(&self) -> usize {
        self.tracker.len()
    }

    /// Total number of nodes spawned over the lifetime of the tree.
    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Waits up to `grace` for every node to exit.
    ///
    /// Returns `true` when the tree fully drained in time. This does not fire
    /// the token; a tree that is still computing will keep computing.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok()
    }
}

async fn node(tree: TaskTree, n: u32, tx: oneshot::Sender<Fib>) {
    if tree.token.is_fired() {
        return;
    }

    if n <= 2 {
        // The parent may already have given up; a one-shot send never blocks.
        let _ = tx.send(if n == 0 { 0 } else { 1 });
        return;
    }

    let left = tree.spawn_node(n - 1);
    let right = tree.spawn_node(n - 2);

    if let Some(sum) = join_children(left, right).await {
        let _ = tx.send(sum);
    }
}

/// Waits for both children of a node and sums them as `left + right`.
///
/// The children may complete in either order. Returns `None` when either
/// child closed without a value, in which case the caller must publish
/// nothing. After the token fires every pending child exits at entry, so the
/// wait is bounded without registering on the token.
pub async fn join_children(left: Completion, right: Completion) -> Option<Fib> {
    match futures::future::join(left, right).await {
        (Ok(left), Ok(right)) => Some(left.saturating_add(right)),
        _ => None,
    }
}
