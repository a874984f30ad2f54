//! Per-service circuit breaker.
//!
//! A breaker gates whether calls to its service are attempted at all.
//! Consecutive failures trip it open; after a cooldown a single probe is
//! admitted to test recovery. `admit`, `record_success`, and
//! `record_failure` are atomic with respect to each other, so concurrent
//! callers for the same service cannot observe or produce torn state.

use serde::Serialize;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::registry::ServiceKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; every call is admitted.
    Closed,
    /// Tripped; calls are rejected until the cooldown elapses.
    Open,
    /// Cooldown elapsed; one probe is in flight, everything else is rejected.
    HalfOpen,
}

/// Breaker tuning, immutable per service.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker; must be >= 1.
    pub failure_threshold: u32,
    /// Cooldown after tripping before a probe is admitted.
    pub reset_timeout: Duration,
    /// Reserved: stored for forward compatibility, currently unused.
    pub monitoring_period: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(30_000),
            monitoring_period: Duration::from_millis(60_000),
        }
    }
}

/// Read-only view of a breaker for display, e.g. a degraded-service banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

/// Circuit breaker for a single service key.
///
/// Lives for the process lifetime; obtained through
/// [`ServiceRegistry::breaker_for`](crate::registry::ServiceRegistry::breaker_for).
#[derive(Debug)]
pub struct CircuitBreaker {
    service: ServiceKey,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(service: ServiceKey, config: CircuitBreakerConfig) -> Self {
        Self {
            service,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    /// Whether a call may proceed right now.
    ///
    /// While open, returns false until the cooldown has elapsed; the one
    /// caller that observes the elapsed cooldown flips the breaker to
    /// half-open and is admitted as the probe. While half-open, everyone
    /// else is rejected until the probe resolves.
    pub fn admit(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure_at
                    .map(|at| at.elapsed() >= self.config.reset_timeout)
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    debug!(service = %self.service, "circuit half-open, admitting probe");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    ///
    /// Resets the failure count and closes the breaker when observed in
    /// closed or half-open state. A success cannot be observed while
    /// open (no call was admitted), so open state is left untouched.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.last_failure_at = None;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_failures = 0;
                inner.last_failure_at = None;
                inner.state = CircuitState::Closed;
                debug!(service = %self.service, "probe succeeded, circuit closed");
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call.
    ///
    /// Trips the breaker once the threshold is reached; a half-open probe
    /// failure reopens immediately with a fresh cooldown, without
    /// re-evaluating the threshold.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        service = %self.service,
                        failures = inner.consecutive_failures,
                        "failure threshold reached, circuit open"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                warn!(service = %self.service, "probe failed, circuit reopened");
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Read-only view for collaborators that display breaker health.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    pub fn service(&self) -> &ServiceKey {
        &self.service
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
