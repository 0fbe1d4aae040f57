//! A shared, monotone cancellation signal.
//!
//! Every long-lived task (producer, server connection handler, client loop)
//! holds a [`HaltHandle`] and checks it at every blocking point instead of
//! polling a process-wide flag.

use tokio::sync::watch;

/// Raises the shared halt signal. Cloning shares the same underlying signal;
/// raising it from any clone is observed by every [`HaltHandle`].
#[derive(Clone)]
pub struct HaltSwitch {
    tx: watch::Sender<bool>,
}

/// Observes (and can wait on) the shared halt signal.
#[derive(Clone)]
pub struct HaltHandle {
    rx: watch::Receiver<bool>,
}

/// Creates a linked halt switch/handle pair, initially not halted.
pub fn halt_pair() -> (HaltSwitch, HaltHandle) {
    let (tx, rx) = watch::channel(false);
    (HaltSwitch { tx }, HaltHandle { rx })
}

impl HaltSwitch {
    /// Raises the signal. Idempotent: raising twice has no further effect.
    pub fn raise(&self) {
        let _ = self.tx.send_if_modified(|halted| {
            if *halted {
                false
            } else {
                *halted = true;
                true
            }
        });
    }

    pub fn handle(&self) -> HaltHandle {
        HaltHandle {
            rx: self.tx.subscribe(),
        }
    }
}

impl HaltHandle {
    pub fn is_halted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves as soon as the signal is raised; resolves immediately if
    /// it already has been.
    pub async fn wait(&self) {
        if self.is_halted() {
            return;
        }
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|halted| *halted).await;
    }
}
