//! Error types for the call layer.
//!
//! `CallError` is the raw failure an individual attempt produces;
//! `CallFailure` is the terminal failure `execute` hands back after the
//! retry budget is spent (or before any attempt, for an open circuit).

use thiserror::Error;

use crate::classifier::ErrorKind;
use crate::registry::ServiceKey;

/// Raw failure signal from one attempt of an operation.
#[derive(Debug, Error)]
pub enum CallError {
    /// The call completed with a non-success HTTP status.
    #[error("HTTP status {code}")]
    Status { code: u16 },

    /// Connect, DNS, or reset-level transport fault.
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-attempt deadline expired before the call completed.
    #[error("attempt deadline exceeded")]
    DeadlineExceeded,

    /// The caller abandoned the call.
    #[error("call cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CallError::DeadlineExceeded
        } else if let Some(status) = err.status() {
            CallError::Status {
                code: status.as_u16(),
            }
        } else if err.is_connect() {
            CallError::Transport(err.to_string())
        } else {
            CallError::Other(err.to_string())
        }
    }
}

/// Terminal failure of an `execute` call.
///
/// `CircuitOpen` means the call was rejected before any attempt was made;
/// it is deliberately not an [`ErrorKind`].
#[derive(Debug, Error)]
pub enum CallFailure {
    #[error("service `{service}` unavailable: circuit open")]
    CircuitOpen { service: ServiceKey },

    #[error("{kind}: {source}")]
    Failed {
        kind: ErrorKind,
        #[source]
        source: CallError,
    },
}

impl CallFailure {
    /// The classified kind, if any attempt was made.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CallFailure::CircuitOpen { .. } => None,
            CallFailure::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CallFailure::CircuitOpen { .. })
    }
}
