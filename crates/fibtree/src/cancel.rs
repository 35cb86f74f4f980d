use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

/// A request-scoped, write-once cancellation signal.
///
/// Every clone observes the same state. Firing is idempotent and monotone: the
/// token goes from "not fired" to "fired" at most once and never back.
/// Observers can only read the state, or await the transition with
/// [`CancelToken::fired`].
///
/// A token may be derived from a parent with [`CancelToken::child_of`] so that
/// firing the parent (e.g. on service shutdown) fires every request token,
/// while firing a request token leaves the parent and its siblings untouched.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    /// Creates a fresh token that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that fires whenever `parent` fires.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            inner: parent.child_token(),
        }
    }

    /// Fires the token. Calling this more than once has no further effect.
    pub fn fire(&self) {
        self.inner.cancel();
    }

    /// Returns `true` once the token has fired. Never blocks.
    pub fn is_fired(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once the token has fired, immediately if it already has.
    pub fn fired(&self) -> WaitForCancellationFuture<'_> {
        self.inner.cancelled()
    }

    /// Returns a guard that fires the token when dropped unless it is
    /// disarmed first.
    pub(crate) fn fire_on_drop(&self) -> DropGuard {
        self.inner.clone().drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn starts_unfired() {
        let token = CancelToken::new();
        assert!(!token.is_fired());
    }

    #[test]
    fn firing_twice_is_the_same_as_firing_once() {
        let once = CancelToken::new();
        once.fire();

        let twice = CancelToken::new();
        twice.fire();
        twice.fire();

        assert_eq!(once.is_fired(), twice.is_fired());
        assert!(twice.is_fired());
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let observers: Vec<_> = (0..16).map(|_| token.clone()).collect();
        token.fire();
        assert!(observers.iter().all(CancelToken::is_fired));
    }

    #[test]
    fn parent_fires_children_but_not_the_reverse() {
        let parent = CancellationToken::new();
        let a = CancelToken::child_of(&parent);
        let b = CancelToken::child_of(&parent);

        a.fire();
        assert!(a.is_fired());
        assert!(!b.is_fired());
        assert!(!parent.is_cancelled());

        parent.cancel();
        assert!(b.is_fired());
    }

    #[test]
    fn drop_guard_fires_unless_disarmed() {
        let token = CancelToken::new();
        drop(token.fire_on_drop());
        assert!(token.is_fired());

        let token = CancelToken::new();
        let _ = token.fire_on_drop().disarm();
        assert!(!token.is_fired());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fired_wakes_every_waiter() {
        let token = CancelToken::new();
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let token = token.clone();
                tokio::spawn(async move { token.fired().await })
            })
            .collect();

        token.fire();

        let all = futures::future::join_all(waiters);
        let joined = tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("waiters should wake after fire");
        assert!(joined.into_iter().all(|r| r.is_ok()));
    }
}
