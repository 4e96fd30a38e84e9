//! Caller-facing error taxonomy
//!
//! Every error is returned to the immediate caller; this layer never
//! retries, swallows, or escalates. Timeout is deliberately distinct from
//! remote status errors so callers can apply their own retry policy.

use thiserror::Error;

use crate::models::StatusCode;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the vehicle HAL client
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// Neither transport generation could be located at construction
    #[error("no vehicle transport available")]
    NoTransport,

    /// The remote service reported a non-OK status for a get/set
    #[error("vehicle service returned {0}")]
    RemoteStatus(StatusCode),

    /// No response arrived within the bounded wait
    #[error("timed out waiting for vehicle response")]
    Timeout,

    /// Malformed request, rejected before dispatch
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The result slot was closed before a result or a timeout; the wait
    /// was interrupted from outside the protocol
    #[error("wait interrupted before completion")]
    Interrupted,

    /// Synchronous transport failure while dispatching
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Whether a caller-side retry can reasonably be expected to succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RemoteStatus(code) => matches!(code, StatusCode::TryAgain),
            ClientError::Timeout => true,
            ClientError::NoTransport
            | ClientError::InvalidRequest(_)
            | ClientError::Interrupted
            | ClientError::Transport(_) => false,
        }
    }

    /// Remote status code, if this error carries one.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ClientError::RemoteStatus(code) => Some(*code),
            _ => None,
        }
    }
}
