//! Terminal-outcome reporting seam.
//!
//! The call layer does no rendering of its own; collaborators that show
//! users what happened implement [`NotificationSink`] and receive one
//! report per completed call. [`TracingSink`] is the built-in
//! implementation that routes reports into `tracing`.

use tracing::{debug, error, warn};

use crate::classifier::ErrorKind;
use crate::executor::OutcomeReport;
use crate::registry::ServiceKey;

/// Receives the terminal outcome of every `execute` call, including
/// breaker-open fast fails.
pub trait NotificationSink: Send + Sync {
    fn on_outcome(&self, service: &ServiceKey, outcome: &OutcomeReport);
}

/// Sink that logs outcomes through `tracing`.
///
/// Client errors are warnings (the request was bad, the service is fine),
/// server and transport failures are errors, and a rejected call is a
/// degraded-service warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn on_outcome(&self, service: &ServiceKey, outcome: &OutcomeReport) {
        if outcome.success {
            debug!(
                service = %service,
                attempts = outcome.attempts,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "call succeeded"
            );
            return;
        }
        if outcome.circuit_open {
            warn!(service = %service, "service degraded: circuit open, call not attempted");
            return;
        }
        match outcome.kind {
            Some(ErrorKind::ClientError) => warn!(
                service = %service,
                attempts = outcome.attempts,
                "request rejected by service"
            ),
            Some(ErrorKind::Cancelled) => debug!(
                service = %service,
                attempts = outcome.attempts,
                "call cancelled by caller"
            ),
            Some(kind) => error!(
                service = %service,
                kind = %kind,
                attempts = outcome.attempts,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "call failed"
            ),
            None => error!(service = %service, "call failed without classification"),
        }
    }
}
