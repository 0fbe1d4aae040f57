//! Producer error types.

use thiserror::Error;

/// Errors a [`crate::FrameProducer`] variant can raise.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("couldn't open video feed")]
    OpenFailed,

    #[error("network producer error: {0}")]
    Client(#[from] framewire_client::ClientError),

    #[error("queue error: {0}")]
    Queue(#[from] framewire_queue::QueueError),

    #[error("change_feed is not supported by this producer variant")]
    ChangeFeedUnsupported,

    #[error("work was halted")]
    Halted,
}
