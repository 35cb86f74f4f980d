//! gRPC service implementation for deadline-bounded Fibonacci evaluation.
//!
//! This module defines [`FibHandler`], the concrete implementation of the
//! [`FibService`] gRPC service defined in `proto/fib.proto`. It is the
//! seam between tonic and the `fibtree` evaluator.
//!
//! ## Responsibilities
//!
//! - Validate `Number` and `Sequence` arguments and enforce limits.
//! - Run `Number` on a fresh task tree raced against the configured deadline.
//! - Map evaluator outcomes to gRPC statuses.
//! - Refuse work and cancel in-flight trees during graceful shutdown.

use crate::server::{
    config::ServerConfig,
    service::lifecycle::Lifecycle,
    telemetry::{
        increment_deadlines_exceeded, increment_errors, increment_requests,
        record_compute_duration, record_tasks_spawned,
    },
};
use fibtree_tonic_core::{
    Error,
    fibtree::{self, DeadlineCoordinator, Sequence, TaskTree},
    proto::{
        NumberRequest, NumberResponse, SequenceRequest, SequenceResponse,
        fib_service_server::FibService,
    },
    types::to_wire,
};
use std::sync::Arc;
use std::time::Instant;
use tonic::{Request, Response, Status};
use tracing::{Instrument, Span};

/// gRPC facade over the `fibtree` evaluator.
///
/// Cloning is cheap; clones share the same lifecycle, so shutting down one
/// clone shuts down all of them.
#[derive(Clone)]
pub struct FibHandler {
    config: ServerConfig,
    coordinator: DeadlineCoordinator,
    lifecycle: Arc<Lifecycle>,
    span: Span,
}

impl FibHandler {
    /// Creates a service that logs under `span`.
    ///
    /// Every request span is created as a child of `span`, so callers decide
    /// where (and whether) request logs go by choosing the span they pass in.
    pub fn new(config: ServerConfig, span: Span) -> Self {
        let coordinator =
            DeadlineCoordinator::new(config.deadline).with_teardown_grace(config.teardown_grace);

        Self {
            config,
            coordinator,
            lifecycle: Lifecycle::new(),
            span,
        }
    }

    /// Initiates a graceful shutdown.
    ///
    /// New requests are refused immediately; in-flight computations get up to
    /// the configured shutdown timeout to finish before their trees are
    /// cancelled.
    pub async fn shutdown(&self) {
        self.lifecycle
            .shutdown(self.config.shutdown_timeout)
            .instrument(self.span.clone())
            .await;
    }

    fn validate_number(&self, n: i32) -> Result<u32, Error> {
        if n <= 0 {
            return Err(Error::InvalidRequest {
                reason: "number must be greater than 0".to_string(),
            });
        }
        if n > self.config.max_number {
            return Err(Error::OutOfRange {
                reason: format!(
                    "number {} exceeds maximum allowed ({})",
                    n, self.config.max_number
                ),
            });
        }
        Ok(n.unsigned_abs())
    }

    fn validate_count(&self, count: i32) -> Result<usize, Error> {
        if count < 0 {
            return Err(Error::InvalidRequest {
                reason: "number must be 0 or greater".to_string(),
            });
        }
        if count > self.config.max_sequence {
            return Err(Error::OutOfRange {
                reason: format!(
                    "count {} exceeds maximum allowed ({})",
                    count, self.config.max_sequence
                ),
            });
        }
        Ok(count.unsigned_abs() as usize)
    }

    async fn compute_number(&self, n: i32) -> Result<i32, Error> {
        let n = self.validate_number(n)?;
        let _inflight = self.lifecycle.admit()?;

        let tree = TaskTree::new(self.lifecycle.request_token());
        let outcome = self.coordinator.run(&tree, n).await;
        record_tasks_spawned(tree.spawned());
        tracing::debug!(spawned = tree.spawned(), live = tree.live(), "tree finished");

        if let Err(fibtree::Error::DeadlineExceeded { budget }) = &outcome {
            increment_deadlines_exceeded();
            tracing::warn!(?budget, live = tree.live(), "deadline exceeded");
        }

        to_wire(outcome?)
    }

    fn compute_sequence(&self, count: i32) -> Result<Vec<i32>, Error> {
        let count = self.validate_count(count)?;
        let _inflight = self.lifecycle.admit()?;

        Sequence::new().take(count).map(to_wire).collect()
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        start: Instant,
        res: Result<T, Error>,
    ) -> Result<T, Status> {
        record_compute_duration(operation, start.elapsed().as_secs_f64() * 1000.0);
        res.map_err(|err| {
            let status = Status::from(err);
            increment_errors(operation, status.code());
            tracing::info!(code = ?status.code(), message = status.message(), "request failed");
            status
        })
    }
}

#[tonic::async_trait]
impl FibService for FibHandler {
    /// Computes `fib(number)` on a concurrent task tree bounded by the
    /// configured deadline.
    ///
    /// If the client goes away before a result is ready, tonic drops this
    /// future and the coordinator's drop guard cancels the tree.
    async fn number(
        &self,
        req: Request<NumberRequest>,
    ) -> Result<Response<NumberResponse>, Status> {
        let start = Instant::now();
        let n = req.get_ref().number;
        increment_requests("number");

        let span = tracing::info_span!(parent: &self.span, "number", n);
        let res = self.compute_number(n).instrument(span.clone()).await;

        span.in_scope(|| {
            let result = self.finish("number", start, res)?;
            tracing::info!(
                result,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "number computed"
            );
            Ok(Response::new(NumberResponse { result }))
        })
    }

    /// Returns the first `number` terms of the sequence.
    async fn sequence(
        &self,
        req: Request<SequenceRequest>,
    ) -> Result<Response<SequenceResponse>, Status> {
        let start = Instant::now();
        let count = req.get_ref().number;
        increment_requests("sequence");

        let span = tracing::info_span!(parent: &self.span, "sequence", count);
        span.in_scope(|| {
            let result = self.finish("sequence", start, self.compute_sequence(count))?;
            tracing::info!(len = result.len(), "sequence generated");
            Ok(Response::new(SequenceResponse { result }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fibtree_tonic_core::proto::{
        fib_service_client::FibServiceClient, fib_service_server::FibServiceServer,
    };
    use fibtree_tonic_core::types::MAX_INT32_INDEX;
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::Code;

    fn service() -> FibHandler {
        FibHandler::new(ServerConfig::default(), Span::none())
    }

    async fn number(svc: &FibHandler, n: i32) -> Result<i32, Status> {
        svc.number(Request::new(NumberRequest { number: n }))
            .await
            .map(|r| r.into_inner().result)
    }

    async fn sequence(svc: &FibHandler, count: i32) -> Result<Vec<i32>, Status> {
        svc.sequence(Request::new(SequenceRequest { number: count }))
            .await
            .map(|r| r.into_inner().result)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn number_base_cases_are_one() {
        let svc = service();
        assert_eq!(number(&svc, 1).await.unwrap(), 1);
        assert_eq!(number(&svc, 2).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn number_follows_the_recurrence() {
        let svc = service();
        let mut prev = (0, 1); // (Number(0) := 0, Number(1))
        for n in 2..=20 {
            let got = number(&svc, n).await.unwrap();
            assert_eq!(got, prev.0 + prev.1, "Number({n})");
            prev = (prev.1, got);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn number_rejects_non_positive_input() {
        let svc = service();
        for n in [0, -5, i32::MIN] {
            let status = number(&svc, n).await.unwrap_err();
            assert_eq!(status.code(), Code::InvalidArgument, "Number({n})");
            assert_eq!(status.message(), "number must be greater than 0");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn number_rejects_input_past_the_configured_maximum() {
        let svc = FibHandler::new(
            ServerConfig {
                max_number: 30,
                ..ServerConfig::default()
            },
            Span::none(),
        );
        let status = number(&svc, 31).await.unwrap_err();
        assert_eq!(status.code(), Code::OutOfRange);
        assert_eq!(number(&svc, 47).await.unwrap_err().code(), Code::OutOfRange);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn number_hits_the_deadline_on_an_expensive_tree() {
        let svc = FibHandler::new(
            ServerConfig {
                deadline: Duration::from_millis(50),
                ..ServerConfig::default()
            },
            Span::none(),
        );

        let start = Instant::now();
        let status = number(&svc, 40).await.unwrap_err();

        assert_eq!(status.code(), Code::DeadlineExceeded);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(svc.lifecycle.inflight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn number_times_out_close_to_the_deadline_on_the_largest_input() {
        let deadline = Duration::from_millis(500);
        let svc = FibHandler::new(
            ServerConfig {
                deadline,
                teardown_grace: Duration::ZERO,
                ..ServerConfig::default()
            },
            Span::none(),
        );

        let start = Instant::now();
        let status = number(&svc, MAX_INT32_INDEX).await.unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(status.code(), Code::DeadlineExceeded);
        assert!(
            elapsed < deadline + Duration::from_millis(50),
            "responded after {elapsed:?} for a {deadline:?} deadline"
        );
    }

    #[test]
    fn registers_under_the_fib_service_name() {
        use tonic::server::NamedService;
        assert_eq!(FibServiceServer::<FibHandler>::NAME, "fib.FibService");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sequence_returns_the_first_terms() {
        let svc = service();
        assert_eq!(sequence(&svc, 0).await.unwrap(), Vec::<i32>::new());
        assert_eq!(sequence(&svc, 5).await.unwrap(), [1, 1, 2, 3, 5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sequence_agrees_with_number() {
        let svc = service();
        let terms = sequence(&svc, 20).await.unwrap();
        for (i, term) in terms.into_iter().enumerate() {
            let n = i as i32 + 1;
            assert_eq!(number(&svc, n).await.unwrap(), term, "Number({n})");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sequence_validates_its_count() {
        let svc = service();
        let status = sequence(&svc, -1).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "number must be 0 or greater");

        assert_eq!(sequence(&svc, 46).await.unwrap().len(), 46);
        assert_eq!(sequence(&svc, 47).await.unwrap_err().code(), Code::OutOfRange);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_refuses_new_requests() {
        let svc = FibHandler::new(
            ServerConfig {
                shutdown_timeout: Duration::from_millis(10),
                ..ServerConfig::default()
            },
            Span::none(),
        );
        svc.shutdown().await;

        assert_eq!(number(&svc, 5).await.unwrap_err().code(), Code::Unavailable);
        assert_eq!(sequence(&svc, 5).await.unwrap_err().code(), Code::Unavailable);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_cancels_inflight_computations() {
        let svc = FibHandler::new(
            ServerConfig {
                deadline: Duration::from_secs(60),
                shutdown_timeout: Duration::from_millis(50),
                ..ServerConfig::default()
            },
            Span::none(),
        );

        let pending = tokio::spawn({
            let svc = svc.clone();
            async move { number(&svc, 40).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        svc.shutdown().await;

        let status = tokio::time::timeout(Duration::from_secs(10), pending)
            .await
            .expect("cancelled request should return")
            .unwrap()
            .unwrap_err();
        assert_eq!(status.code(), Code::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn serves_both_operations_over_grpc() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let svc = service();

        let server = tokio::spawn(
            tonic::transport::Server::builder()
                .add_service(FibServiceServer::new(svc))
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );

        let mut client = FibServiceClient::connect(format!("http://{addr}"))
            .await
            .unwrap();

        let res = client
            .number(NumberRequest { number: 10 })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(res.result, 55);

        let res = client
            .sequence(SequenceRequest { number: 5 })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(res.result, [1, 1, 2, 3, 5]);

        let status = client
            .number(NumberRequest { number: 0 })
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        server.abort();
    }
}
