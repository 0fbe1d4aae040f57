//! Server error types.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] framewire_protocol::ProtocolError),

    #[error("queue error: {0}")]
    Queue(#[from] framewire_queue::QueueError),

    #[error("server shutting down")]
    ShuttingDown,
}
