//! Admission control and graceful shutdown for the Fibonacci service.
//!
//! [`Lifecycle`] owns the service-wide shutdown token from which every request
//! token is derived, and counts in-flight computations so shutdown can wait for
//! them to finish before cancelling what is left.

use crate::server::telemetry::{decrement_inflight, increment_inflight};
use core::time::Duration;
use fibtree_tonic_core::{Error, fibtree::CancelToken};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Lifecycle {
    shutdown_token: CancellationToken,
    accepting: AtomicBool,
    inflight: AtomicUsize,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            shutdown_token: CancellationToken::new(),
            accepting: AtomicBool::new(true),
            inflight: AtomicUsize::new(0),
        }
    }
}

impl Lifecycle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a new in-flight request.
    ///
    /// The returned guard must be held for as long as the request is doing
    /// work; dropping it releases the slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once [`Lifecycle::shutdown`] has
    /// started.
    pub fn admit(self: &Arc<Self>) -> Result<InflightGuard, Error> {
        // Count first so a concurrent shutdown either sees this request or we
        // see its flag.
        self.inflight.fetch_add(1, Ordering::SeqCst);
        if !self.accepting.load(Ordering::SeqCst) {
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::ServiceShutdown);
        }
        increment_inflight();
        Ok(InflightGuard {
            lifecycle: Arc::clone(self),
        })
    }

    /// A fresh per-request token that also fires on shutdown.
    pub fn request_token(&self) -> CancelToken {
        CancelToken::child_of(&self.shutdown_token)
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Gracefully shuts the service down.
    ///
    /// - Refuses new requests.
    /// - Waits up to `drain_timeout` for in-flight requests to finish.
    /// - Fires the shutdown token, cancelling every remaining task tree.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        // === Phase 0: Stop accepting new requests ===
        tracing::info!("Refusing new requests");
        self.accepting.store(false, Ordering::SeqCst);

        // === Phase 1: Wait for in-flight requests to drain ===
        tracing::info!("Draining in-flight requests ({} active)", self.inflight());
        let drain_result = timeout(drain_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => tracing::debug!("All in-flight requests drained successfully"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} requests still active)",
                self.inflight()
            ),
        }

        // === Phase 2: Cancel any remaining work ===
        tracing::debug!("Cancelling remaining work via shutdown token");
        self.shutdown_token.cancel();

        tracing::info!("Service shutdown complete");
    }
}

/// Marks one request as in flight until dropped.
#[derive(Debug)]
pub struct InflightGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.lifecycle.inflight.fetch_sub(1, Ordering::SeqCst);
        decrement_inflight();
    }
}
