use crate::{CancelToken, Error, Fib, Result, TaskTree};
use core::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Races the root of a [`TaskTree`] against a fixed wall-clock budget.
///
/// The deadline is taken once, when [`DeadlineCoordinator::run`] is entered,
/// and is never extended. Exactly one outcome is produced per run:
///
/// - the root delivered first: the value is returned and the token is left
///   alone;
/// - the timer fired first: the token is fired once and
///   [`Error::DeadlineExceeded`] is returned;
/// - the root closed without a value first (the token was fired elsewhere):
///   [`Error::Cancelled`] is returned.
///
/// If the future returned by `run` is dropped before either happens, the
/// token fires so that no node of an abandoned tree keeps computing.
///
/// Firing costs the same regardless of tree size. The tree unwinds on the
/// runtime's workers after `run` has returned, unless a teardown grace asks
/// `run` to wait for it.
#[derive(Clone, Copy, Debug)]
pub struct DeadlineCoordinator {
    budget: Duration,
    teardown_grace: Duration,
}

impl DeadlineCoordinator {
    /// Creates a coordinator that allows `budget` per evaluation and does not
    /// wait for teardown after a timeout.
    pub const fn new(budget: Duration) -> Self {
        Self {
            budget,
            teardown_grace: Duration::ZERO,
        }
    }

    /// After a timeout or cancellation, waits up to `grace` for the tree to
    /// drain before returning. `Duration::ZERO` returns immediately.
    #[must_use]
    pub const fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Evaluates `fib(n)` on a fresh tree with its own token.
    pub async fn evaluate(&self, n: u32) -> Result<Fib> {
        let tree = TaskTree::new(CancelToken::new());
        self.run(&tree, n).await
    }

    /// Evaluates `fib(n)` on `tree`, spawning its root now.
    ///
    /// The tree should be fresh; its token is the one fired on timeout.
    pub async fn run(&self, tree: &TaskTree, n: u32) -> Result<Fib> {
        let deadline = Instant::now() + self.budget;
        let guard = tree.token().fire_on_drop();
        let root = tree.spawn_root(n);

        // Prefer a ready value over a timer that elapsed in the same poll.
        let outcome = tokio::select! {
            biased;
            res = root => res.map_err(|_| Error::Cancelled),
            () = sleep_until(deadline) => Err(Error::DeadlineExceeded { budget: self.budget }),
        };
        let _ = guard.disarm();

        match outcome {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(n, value, spawned = tree.spawned(), "tree completed");
                Ok(value)
            }
            Err(err) => {
                tree.token().fire();
                self.teardown(tree).await;
                Err(err)
            }
        }
    }

    async fn teardown(&self, tree: &TaskTree) {
        if self.teardown_grace.is_zero() {
            return;
        }
        if tree.drain(self.teardown_grace).await {
            #[cfg(feature = "tracing")]
            tracing::debug!(spawned = tree.spawned(), "tree drained");
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                live = tree.live(),
                grace = ?self.teardown_grace,
                "tree still draining after grace period"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    const GRACE: Duration = Duration::from_secs(10);

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn returns_the_value_when_the_tree_wins() {
        let coordinator = DeadlineCoordinator::new(Duration::from_secs(30));
        let tree = TaskTree::new(CancelToken::new());

        assert_eq!(coordinator.run(&tree, 20).await, Ok(6765));
        assert!(!tree.token().is_fired());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn base_case_beats_any_budget() {
        let coordinator = DeadlineCoordinator::new(Duration::from_millis(1));
        assert_eq!(coordinator.evaluate(1).await, Ok(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn times_out_on_an_expensive_tree() {
        let budget = Duration::from_millis(50);
        let coordinator = DeadlineCoordinator::new(budget).with_teardown_grace(GRACE);
        let tree = TaskTree::new(CancelToken::new());

        let start = std::time::Instant::now();
        let res = coordinator.run(&tree, 40).await;

        assert_eq!(res, Err(Error::DeadlineExceeded { budget }));
        assert!(tree.token().is_fired());
        assert_eq!(tree.live(), 0, "teardown should have drained the tree");
        assert!(start.elapsed() < GRACE + Duration::from_secs(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn does_not_wait_for_teardown_without_grace() {
        let coordinator = DeadlineCoordinator::new(Duration::from_millis(20));
        let tree = TaskTree::new(CancelToken::new());

        let res = coordinator.run(&tree, 40).await;

        assert!(matches!(res, Err(Error::DeadlineExceeded { .. })));
        assert!(tree.drain(GRACE).await, "{} tasks leaked", tree.live());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn large_tree_times_out_close_to_the_budget() {
        let budget = Duration::from_millis(500);
        let coordinator = DeadlineCoordinator::new(budget);
        let tree = TaskTree::new(CancelToken::new());

        let start = std::time::Instant::now();
        let res = coordinator.run(&tree, 46).await;
        let elapsed = start.elapsed();

        assert_eq!(res, Err(Error::DeadlineExceeded { budget }));
        assert!(
            elapsed < budget + Duration::from_millis(50),
            "returned after {elapsed:?} for a {budget:?} budget"
        );
        assert!(tree.drain(GRACE).await, "{} tasks leaked", tree.live());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn abandoning_the_run_fires_the_token() {
        let coordinator = DeadlineCoordinator::new(Duration::from_secs(60));
        let tree = TaskTree::new(CancelToken::new());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), coordinator.run(&tree, 35)).await;

        assert!(abandoned.is_err());
        assert!(tree.token().is_fired());
        assert!(tree.drain(GRACE).await, "{} tasks leaked", tree.live());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parent_cancellation_surfaces_as_cancelled() {
        let shutdown = CancellationToken::new();
        let coordinator =
            DeadlineCoordinator::new(Duration::from_secs(60)).with_teardown_grace(GRACE);
        let tree = TaskTree::new(CancelToken::child_of(&shutdown));

        let cancel = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                shutdown.cancel();
            }
        });

        assert_eq!(coordinator.run(&tree, 35).await, Err(Error::Cancelled));
        assert_eq!(tree.live(), 0);
        cancel.await.unwrap();
    }
}
