//! Server configuration.
//!
//! Configuration is loaded from environment variables over a small set of
//! defaults; there is no file-based layer or command-line parser here (see
//! the crate root for why).

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Capacity of the server's outbound frame queue.
    pub queue_capacity: usize,
    /// How long a connection's `OK` handler waits on an empty, non-halting
    /// queue before checking the halt flag and trying again.
    pub idle_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], framewire_protocol::DEFAULT_PORT)),
            queue_capacity: framewire_protocol::DEFAULT_QUEUE_CAPACITY,
            idle_poll_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("FRAMEWIRE_BIND") {
            match addr.parse() {
                Ok(parsed) => self.bind_addr = parsed,
                Err(e) => tracing::warn!("ignoring invalid FRAMEWIRE_BIND={:?}: {}", addr, e),
            }
        }

        if let Ok(cap) = std::env::var("FRAMEWIRE_QUEUE_CAPACITY") {
            match cap.parse() {
                Ok(n) => self.queue_capacity = n,
                Err(e) => {
                    tracing::warn!("ignoring invalid FRAMEWIRE_QUEUE_CAPACITY={:?}: {}", cap, e)
                }
            }
        }
    }
}
