//! Error classification for retry decisions.
//!
//! `classify` is a pure function of the failure signal: it consults no
//! breaker or retry state, so every rule is independently testable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CallError;

/// What went wrong with an attempt, as far as retry logic cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 4xx response. The request itself is bad; retrying cannot help.
    ClientError,
    /// 5xx response.
    ServerError,
    /// Connect, DNS, or reset-level transport fault.
    NetworkError,
    /// The per-attempt deadline expired.
    TimeoutError,
    /// The caller abandoned the call.
    Cancelled,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ClientError => "client error",
            ErrorKind::ServerError => "server error",
            ErrorKind::NetworkError => "network error",
            ErrorKind::TimeoutError => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown error",
        };
        f.write_str(name)
    }
}

/// Kind plus the retryability verdict derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub retryable: bool,
}

/// Map a raw failure to its kind and retryability.
///
/// Rules are evaluated in order: cancellation, deadline expiry, response
/// status, transport fault, then everything else.
pub fn classify(error: &CallError) -> Classification {
    match error {
        CallError::Cancelled => Classification {
            kind: ErrorKind::Cancelled,
            retryable: false,
        },
        CallError::DeadlineExceeded => Classification {
            kind: ErrorKind::TimeoutError,
            retryable: true,
        },
        CallError::Status { code } if (400..=499).contains(code) => Classification {
            kind: ErrorKind::ClientError,
            retryable: false,
        },
        CallError::Status { code } if (500..=599).contains(code) => Classification {
            kind: ErrorKind::ServerError,
            retryable: true,
        },
        CallError::Status { .. } | CallError::Other(_) => Classification {
            kind: ErrorKind::Unknown,
            retryable: true,
        },
        CallError::Transport(_) => Classification {
            kind: ErrorKind::NetworkError,
            retryable: true,
        },
    }
}
