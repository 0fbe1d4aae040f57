//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue empty after waiting for the requested timeout")]
    Empty,

    #[error("queue full after waiting for the requested timeout")]
    Full,

    #[error("work was halted")]
    Halted,
}
