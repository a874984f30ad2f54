//! Resilient remote-call layer.
//!
//! Wraps outbound requests with bounded retries (exponential backoff plus
//! jitter), per-service circuit breaking, and error classification that
//! decides retryability. Callers hand [`RetryExecutor::execute`] a target
//! and an operation; they get back either the operation's value or a
//! classified terminal failure, and an attached [`NotificationSink`]
//! hears about every completed call.
//!
//! ```no_run
//! use backstop::{CallError, ConfigLoader, RetryExecutor, TracingSink};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! let registry = Arc::new(config.build_registry());
//! let executor = RetryExecutor::new(registry).with_sink(Arc::new(TracingSink));
//!
//! let outcome = executor
//!     .execute(
//!         "/api/strategy/backtest",
//!         || async {
//!             let response = reqwest::get("https://quotes.example.com/api/strategy/backtest")
//!                 .await
//!                 .map_err(CallError::from)?;
//!             response.error_for_status().map_err(CallError::from)
//!         },
//!         &config.retry_policy(),
//!     )
//!     .await;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod breaker;
pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod notify;
pub mod policy;
pub mod registry;

pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use classifier::{Classification, ErrorKind, classify};
pub use config::{ConfigError, ConfigLoader, ResilienceConfig};
pub use error::{CallError, CallFailure};
pub use executor::{Outcome, OutcomeReport, RetryExecutor};
pub use notify::{NotificationSink, TracingSink};
pub use policy::RetryPolicy;
pub use registry::{DEFAULT_SERVICE, ServiceKey, ServiceRegistry, ServiceRoute};
