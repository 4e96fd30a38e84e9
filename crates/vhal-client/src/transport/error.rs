//! Transport layer errors

use thiserror::Error;
use vhal_core::ClientError;

#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("not supported by this transport generation: {0}")]
    Unsupported(String),

    #[error("payload paging failed: {0}")]
    Paging(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ServiceNotFound(_) => ClientError::NoTransport,
            TransportError::InvalidArg(msg) => ClientError::InvalidRequest(msg),
            TransportError::Paging(msg) => ClientError::InvalidRequest(msg),
            other => ClientError::Transport(other.to_string()),
        }
    }
}
