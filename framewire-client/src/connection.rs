//! The client request/response loop: connect, request frames, decode them,
//! and hand them to a local [`FrameQueue`].

use crate::error::ClientError;
use framewire_protocol::{Packet, PacketType, ProtocolError, StreamFramer};
use framewire_queue::{FrameQueue, HaltHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub addr: SocketAddr,
    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,
    /// Delay between reconnection attempts.
    pub reconnect_backoff: Duration,
    /// Number of consecutive decode failures tolerated before the frame is
    /// dropped and the client resumes with a fresh `OK`.
    pub max_consecutive_failures: u8,
}

impl ClientConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            reconnect_backoff: Duration::from_secs(1),
            max_consecutive_failures: 3,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub fn with_max_consecutive_failures(mut self, n: u8) -> Self {
        self.max_consecutive_failures = n;
        self
    }
}

/// Connects to a [`crate`]-protocol server and drives the `OK`/`REQUEST`/`HALT`
/// loop, depositing decoded frames into a shared [`FrameQueue`].
pub struct FrameClient {
    config: ClientConfig,
    halt: HaltHandle,
    queue: Arc<FrameQueue<framewire_protocol::FrameData>>,
}

impl FrameClient {
    pub fn new(
        config: ClientConfig,
        halt: HaltHandle,
        queue: Arc<FrameQueue<framewire_protocol::FrameData>>,
    ) -> Self {
        Self {
            config,
            halt,
            queue,
        }
    }

    /// Runs the client until halted. Reconnects automatically if the
    /// connection drops.
    pub async fn run_forever(&self) -> Result<(), ClientError> {
        loop {
            if self.halt.is_halted() {
                return Ok(());
            }

            let stream = match self.connect_with_retry().await {
                Ok(stream) => stream,
                Err(ClientError::Halted) => return Ok(()),
                Err(e) => {
                    tracing::warn!("giving up connecting to {}: {}", self.config.addr, e);
                    continue;
                }
            };

            tracing::info!("connected to {}", self.config.addr);
            if let Err(e) = self.serve_connection(stream).await {
                tracing::warn!("connection to {} ended: {}", self.config.addr, e);
            }
        }
    }

    async fn connect_with_retry(&self) -> Result<TcpStream, ClientError> {
        loop {
            if self.halt.is_halted() {
                return Err(ClientError::Halted);
            }

            match time::timeout(self.config.connect_timeout, TcpStream::connect(self.config.addr))
                .await
            {
                Ok(Ok(stream)) => {
                    stream.set_nodelay(true).ok();
                    return Ok(stream);
                }
                Ok(Err(e)) => tracing::debug!("connect to {} failed: {}", self.config.addr, e),
                Err(_) => tracing::debug!("connect to {} timed out", self.config.addr),
            }

            tokio::select! {
                _ = self.halt.wait() => return Err(ClientError::Halted),
                _ = time::sleep(self.config.reconnect_backoff) => {}
            }
        }
    }

    async fn serve_connection(&self, mut stream: TcpStream) -> Result<(), ClientError> {
        let mut consecutive_failures = 0u8;

        loop {
            if self.halt.is_halted() {
                let halt_packet = Packet::control(0, PacketType::Halt);
                // Best effort: the server may already have gone away.
                let _ = stream.write_all(&halt_packet.encode()).await;
                return Ok(());
            }

            let request_type = if consecutive_failures > 0 {
                PacketType::Request
            } else {
                PacketType::Ok
            };
            let request = Packet::control(0, request_type);
            stream.write_all(&request.encode()).await?;

            match Self::read_one_frame(&mut stream).await {
                Ok(packet) => {
                    consecutive_failures = 0;
                    let data = framewire_protocol::FrameData::from_packet(&packet);
                    self.queue
                        .put_nonblocking_drop_oldest((packet.frame_number, data))
                        .await;
                }
                Err(e @ ProtocolError::Io(_)) | Err(e @ ProtocolError::ConnectionClosed) => {
                    tracing::warn!("connection to server lost: {}", e);
                    return Err(ClientError::from(e));
                }
                Err(e) => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        "frame decode failed ({}/{} consecutive): {}",
                        consecutive_failures,
                        self.config.max_consecutive_failures,
                        e
                    );
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        tracing::warn!("dropping frame, resuming with OK");
                        consecutive_failures = 0;
                    }
                }
            }
        }
    }

    async fn read_one_frame(stream: &mut TcpStream) -> Result<Packet, ProtocolError> {
        let raw = StreamFramer::read_packet(stream).await?;
        Packet::decode(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_policy() {
        let config = ClientConfig::new("127.0.0.1:47828".parse().unwrap());
        assert_eq!(config.max_consecutive_failures, 3);
    }
}
