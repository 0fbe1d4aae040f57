//! Per-reader reset signalling used by `change_feed`.
//!
//! Distinct from the halt signal (monotone, process-wide): a reset request
//! carries a new source and is acknowledged once the reader has swapped to
//! it, giving `change_feed` the same "halt, reinit, resume" semantics as the
//! source's thread-join-then-restart approach, without blocking the whole
//! process.

use crate::error::ProducerError;
use tokio::sync::{mpsc, oneshot};

/// A pending `change_feed` request: the new source to switch to, and where
/// to report the outcome once the reader has (re)initialized against it.
pub struct ChangeFeedRequest<S> {
    pub new_source: S,
    pub ack: oneshot::Sender<Result<(), ProducerError>>,
}

/// The caller-facing half of a reset channel; `change_feed` sends through
/// this and awaits the acknowledgement.
#[derive(Clone)]
pub struct ResetController<S> {
    tx: mpsc::Sender<ChangeFeedRequest<S>>,
}

/// The reader-task-facing half; polled alongside decoding and the halt
/// signal in the producer's main select loop.
pub struct ResetReceiver<S> {
    rx: mpsc::Receiver<ChangeFeedRequest<S>>,
}

/// Creates a linked reset controller/receiver pair.
pub fn reset_channel<S>() -> (ResetController<S>, ResetReceiver<S>) {
    let (tx, rx) = mpsc::channel(1);
    (ResetController { tx }, ResetReceiver { rx })
}

impl<S> ResetController<S> {
    /// Requests a feed change and waits for the reader to acknowledge it.
    pub async fn change_feed(&self, new_source: S) -> Result<(), ProducerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(ChangeFeedRequest {
                new_source,
                ack: ack_tx,
            })
            .await
            .map_err(|_| ProducerError::Halted)?;
        ack_rx.await.map_err(|_| ProducerError::Halted)?
    }
}

impl<S> ResetReceiver<S> {
    pub async fn recv(&mut self) -> Option<ChangeFeedRequest<S>> {
        self.rx.recv().await
    }

    /// Drains one pending request without blocking, if any is queued.
    pub fn try_recv(&mut self) -> Option<ChangeFeedRequest<S>> {
        self.rx.try_recv().ok()
    }
}
