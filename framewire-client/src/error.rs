//! Client error types.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] framewire_protocol::ProtocolError),

    #[error("queue error: {0}")]
    Queue(#[from] framewire_queue::QueueError),

    #[error("not connected")]
    NotConnected,

    #[error("connection attempt timed out")]
    ConnectTimeout,

    #[error("work was halted")]
    Halted,
}

impl ClientError {
    /// Whether a fresh attempt (reconnect, resend) is worth trying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ClientError::Halted)
    }
}
