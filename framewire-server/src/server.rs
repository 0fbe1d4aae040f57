//! TCP server implementation.

use crate::config::Config;
use crate::error::ServerError;
use framewire_protocol::{FrameData, Packet, PacketType, ProtocolError, StreamFramer};
use framewire_queue::{FrameQueue, HaltHandle, QueueError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server that serves frames out of a shared [`FrameQueue`] on request.
pub struct FrameServer {
    config: Config,
    queue: Arc<FrameQueue<FrameData>>,
    halt: HaltHandle,
    stats: Arc<ServerStats>,
    running: AtomicBool,
}

impl FrameServer {
    pub fn new(config: Config, queue: Arc<FrameQueue<FrameData>>, halt: HaltHandle) -> Self {
        Self {
            config,
            queue,
            halt,
            stats: Arc::new(ServerStats::default()),
            running: AtomicBool::new(false),
        }
    }

    /// Runs the accept loop until the shared halt signal is raised.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("server listening on {}", self.config.bind_addr);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let session_id = Uuid::new_v4();
                            let queue = self.queue.clone();
                            let halt = self.halt.clone();
                            let poll_interval = self.config.idle_poll_interval;
                            let stats = self.stats.clone();

                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, addr, session_id, queue, halt, poll_interval).await {
                                    tracing::debug!("[{} {}] connection error: {}", session_id, addr, e);
                                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                }
                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!("[{} {}] client disconnected", session_id, addr);
                            });
                        }
                        Err(e) => tracing::error!("accept error: {}", e),
                    }
                }
                _ = self.halt.wait() => {
                    tracing::info!("server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Per-connection IDLE -> DISPATCH -> CLOSE state machine.
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        session_id: Uuid,
        queue: Arc<FrameQueue<FrameData>>,
        halt: HaltHandle,
        poll_interval: Duration,
    ) -> Result<(), ServerError> {
        tracing::info!("[{} {}] client connected", session_id, addr);
        let mut current_data_to_send: Option<Packet> = None;

        loop {
            let raw = match StreamFramer::read_packet(&mut stream).await {
                Ok(raw) => raw,
                Err(ProtocolError::Io(e)) => return Err(ServerError::Io(e)),
                Err(ProtocolError::ConnectionClosed) => {
                    tracing::info!("[{} {}] client closed the connection", session_id, addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("[{} {}] framing error, resyncing: {}", session_id, addr, e);
                    continue;
                }
            };

            let request = match Packet::decode(raw) {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::warn!("[{} {}] malformed request, skipping: {}", session_id, addr, e);
                    continue;
                }
            };

            match request.packet_type {
                PacketType::Ok => 'dispatch: loop {
                    if halt.is_halted() && queue.is_empty().await {
                        tracing::info!("[{} {}] halting with an empty queue, closing", session_id, addr);
                        return Ok(());
                    }

                    match queue.get(poll_interval).await {
                        Ok((frame_number, data)) => {
                            let packet = data.into_packet(frame_number);
                            stream.write_all(&packet.encode()).await?;
                            current_data_to_send = Some(packet);
                            break 'dispatch;
                        }
                        Err(QueueError::Empty) => continue 'dispatch,
                        Err(QueueError::Halted) => {
                            tracing::info!("[{} {}] halted while waiting for a frame", session_id, addr);
                            return Ok(());
                        }
                        Err(QueueError::Full) => unreachable!("get() never returns Full"),
                    }
                },
                PacketType::Request => match &current_data_to_send {
                    Some(packet) => {
                        stream.write_all(&packet.encode()).await?;
                    }
                    None => {
                        tracing::debug!("[{} {}] REQUEST before any frame was sent, ignoring", session_id, addr);
                    }
                },
                PacketType::Halt => {
                    tracing::info!("[{} {}] client sent HALT, closing", session_id, addr);
                    return Ok(());
                }
                PacketType::Frame => {
                    tracing::warn!("[{} {}] unexpected FRAME from client, ignoring", session_id, addr);
                }
            }
        }
    }
}
