//! Retry orchestration for a single call.
//!
//! `RetryExecutor` owns the loop: consult the breaker, run each attempt
//! under its deadline, classify failures, record breaker state, and back
//! off between attempts. The per-attempt deadline wait and the backoff
//! sleep are the only suspension points, and both abort immediately on
//! cancellation.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classifier::{ErrorKind, classify};
use crate::error::{CallError, CallFailure};
use crate::notify::NotificationSink;
use crate::policy::RetryPolicy;
use crate::registry::{ServiceKey, ServiceRegistry};

/// Terminal result of one `execute` call.
#[derive(Debug)]
pub struct Outcome<T> {
    pub result: Result<T, CallFailure>,
    /// Attempts actually performed; zero when the circuit was open.
    pub attempts: u32,
    pub elapsed: Duration,
}

impl<T> Outcome<T> {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match &self.result {
            Ok(_) => None,
            Err(failure) => failure.kind(),
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(&self.result, Err(failure) if failure.is_circuit_open())
    }

    pub fn into_result(self) -> Result<T, CallFailure> {
        self.result
    }

    /// Value-erased view handed to notification sinks.
    pub fn report(&self) -> OutcomeReport {
        OutcomeReport {
            success: self.success(),
            kind: self.kind(),
            circuit_open: self.is_circuit_open(),
            attempts: self.attempts,
            elapsed: self.elapsed,
        }
    }
}

/// What a [`NotificationSink`] sees of a completed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeReport {
    pub success: bool,
    pub kind: Option<ErrorKind>,
    /// True when the call was rejected without being attempted.
    pub circuit_open: bool,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Orchestrates attempts for outbound calls.
pub struct RetryExecutor {
    registry: Arc<ServiceRegistry>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl RetryExecutor {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self {
            registry,
            sink: None,
        }
    }

    /// Attach a sink that receives one report per completed call.
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Run `operation` against `target` under `policy`.
    ///
    /// Each invocation of `operation` is one network attempt. The
    /// returned outcome is always surfaced; nothing is swallowed here.
    pub async fn execute<T, F, Fut>(
        &self,
        target: &str,
        operation: F,
        policy: &RetryPolicy,
    ) -> Outcome<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, CallError>> + Send,
        T: Send,
    {
        self.execute_cancellable(target, operation, policy, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), aborting at the next suspension
    /// point once `cancel` fires. Cancellation reflects caller intent,
    /// not service health; it is never recorded against the breaker.
    pub async fn execute_cancellable<T, F, Fut>(
        &self,
        target: &str,
        mut operation: F,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Outcome<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, CallError>> + Send,
        T: Send,
    {
        let started = Instant::now();
        let service = self.registry.service_key(target);
        let breaker = self.registry.breaker(service.clone());

        if !breaker.admit() {
            warn!(service = %service, "call rejected: circuit open");
            return self.settle(
                &service,
                Err(CallFailure::CircuitOpen {
                    service: service.clone(),
                }),
                0,
                started,
            );
        }

        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return self.settle(
                    &service,
                    Err(CallFailure::Failed {
                        kind: ErrorKind::Cancelled,
                        source: CallError::Cancelled,
                    }),
                    attempt,
                    started,
                );
            }

            let attempt_result = tokio::select! {
                _ = cancel.cancelled() => Err(CallError::Cancelled),
                completed = timeout(policy.per_attempt_timeout, operation()) => {
                    match completed {
                        Ok(inner) => inner,
                        Err(_) => Err(CallError::DeadlineExceeded),
                    }
                }
            };

            match attempt_result {
                Ok(value) => {
                    breaker.record_success();
                    return self.settle(&service, Ok(value), attempt + 1, started);
                }
                Err(error) => {
                    let class = classify(&error);
                    if class.kind == ErrorKind::Cancelled {
                        return self.settle(
                            &service,
                            Err(CallFailure::Failed {
                                kind: ErrorKind::Cancelled,
                                source: error,
                            }),
                            attempt + 1,
                            started,
                        );
                    }

                    breaker.record_failure();

                    if !class.retryable || attempt == policy.max_retries {
                        return self.settle(
                            &service,
                            Err(CallFailure::Failed {
                                kind: class.kind,
                                source: error,
                            }),
                            attempt + 1,
                            started,
                        );
                    }

                    let delay = policy.delay_for_attempt(attempt);
                    debug!(
                        service = %service,
                        attempt = attempt + 1,
                        kind = %class.kind,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying after backoff"
                    );
                    if wait_with_cancel(cancel, delay).await.is_err() {
                        return self.settle(
                            &service,
                            Err(CallFailure::Failed {
                                kind: ErrorKind::Cancelled,
                                source: CallError::Cancelled,
                            }),
                            attempt + 1,
                            started,
                        );
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn settle<T>(
        &self,
        service: &ServiceKey,
        result: Result<T, CallFailure>,
        attempts: u32,
        started: Instant,
    ) -> Outcome<T> {
        let outcome = Outcome {
            result,
            attempts,
            elapsed: started.elapsed(),
        };
        if let Some(sink) = &self.sink {
            sink.on_outcome(service, &outcome.report());
        }
        outcome
    }
}

/// Sleep that aborts as soon as the token fires.
async fn wait_with_cancel(cancel: &CancellationToken, duration: Duration) -> Result<(), ()> {
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = sleep(duration) => Ok(()),
        _ = cancel.cancelled() => Err(()),
    }
}
