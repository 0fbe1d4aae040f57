//! Fills a [`FrameQueue`] from a remote framewire server.
//!
//! Delegates the connect/request/decode loop to [`framewire_client::FrameClient`]
//! entirely; this module only adds the `change_feed`/`get_shape` surface the
//! other two producer variants share, by running the client under a
//! per-session halt scoped to the current address.

use crate::error::ProducerError;
use crate::reset::{reset_channel, ResetController, ResetReceiver};
use crate::source::NetworkSource;
use framewire_client::{ClientConfig, FrameClient};
use framewire_protocol::FrameData;
use framewire_queue::{halt_pair, FrameQueue, HaltHandle};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Connects to a remote server and deposits decoded frames into a shared
/// [`FrameQueue`].
pub struct NetworkProducer {
    queue: Arc<FrameQueue<FrameData>>,
    outer_halt: HaltHandle,
    reset: ResetController<NetworkSource>,
    reset_rx: Mutex<Option<ResetReceiver<NetworkSource>>>,
    initial_source: NetworkSource,
}

impl NetworkProducer {
    pub fn new(
        source: NetworkSource,
        queue: Arc<FrameQueue<FrameData>>,
        outer_halt: HaltHandle,
    ) -> Self {
        let (reset, reset_rx) = reset_channel();
        Self {
            queue,
            outer_halt,
            reset,
            reset_rx: Mutex::new(Some(reset_rx)),
            initial_source: source,
        }
    }

    /// Shape of the first frame the client has deposited, if any. Peeks the
    /// shared queue rather than tracking decode state itself, since decoding
    /// happens entirely inside [`FrameClient`].
    pub async fn get_shape(&self) -> Option<(u16, u16)> {
        self.queue
            .peek_front()
            .await
            .map(|(_, data)| (data.height, data.width))
    }

    /// Reconnects to `new_source`: the current session is halted, its
    /// client task is awaited to completion, then a fresh session is
    /// started against the new address.
    pub async fn change_feed(&self, new_source: NetworkSource) -> Result<(), ProducerError> {
        self.reset.change_feed(new_source).await
    }

    pub fn start(&self) -> JoinHandle<Result<(), ProducerError>> {
        let queue = self.queue.clone();
        let outer_halt = self.outer_halt.clone();
        let reset_rx = self
            .reset_rx
            .try_lock()
            .expect("start() called concurrently with itself")
            .take()
            .expect("start() called more than once");

        tokio::spawn(Self::run(self.initial_source, queue, outer_halt, reset_rx))
    }

    async fn run(
        mut source: NetworkSource,
        queue: Arc<FrameQueue<FrameData>>,
        outer_halt: HaltHandle,
        mut reset_rx: ResetReceiver<NetworkSource>,
    ) -> Result<(), ProducerError> {
        loop {
            if outer_halt.is_halted() {
                return Ok(());
            }

            let (session_switch, session_halt) = halt_pair();
            let config = ClientConfig::new(source.addr);
            let client = Arc::new(FrameClient::new(config, session_halt, queue.clone()));
            let mut run_task = tokio::spawn({
                let client = client.clone();
                async move { client.run_forever().await }
            });

            tokio::select! {
                _ = outer_halt.wait() => {
                    session_switch.raise();
                    let _ = (&mut run_task).await;
                    return Ok(());
                }
                req = reset_rx.recv() => {
                    session_switch.raise();
                    let _ = (&mut run_task).await;
                    match req {
                        Some(req) => {
                            source = req.new_source;
                            let _ = req.ack.send(Ok(()));
                        }
                        None => return Ok(()),
                    }
                }
                result = &mut run_task => {
                    return result.map_err(|_| ProducerError::Halted)?.map_err(ProducerError::from);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framewire_server::{Config as ServerConfig, FrameServer};
    use std::time::Duration;

    #[tokio::test]
    async fn connects_and_receives_frames_from_a_real_server() {
        let (_server_switch, server_halt) = halt_pair();
        let server_queue = Arc::new(FrameQueue::new(4, server_halt.clone()));
        let mut server_config = ServerConfig::default();
        server_config.bind_addr = "127.0.0.1:0".parse().unwrap();
        server_config.idle_poll_interval = Duration::from_millis(50);

        server_queue
            .put(
                (
                    1,
                    FrameData::new(1, 1, 1, framewire_protocol::Dtype::U8, vec![9].into()),
                ),
                Duration::from_millis(100),
            )
            .await
            .unwrap();

        let listener = tokio::net::TcpListener::bind(server_config.bind_addr)
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        server_config.bind_addr = addr;

        let server = Arc::new(FrameServer::new(server_config, server_queue, server_halt.clone()));
        let server2 = server.clone();
        tokio::spawn(async move { server2.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (client_switch, client_halt) = halt_pair();
        let client_queue = Arc::new(FrameQueue::new(4, client_halt.clone()));
        let producer = NetworkProducer::new(NetworkSource::new(addr), client_queue.clone(), client_halt);
        let handle = producer.start();

        let (frame_number, data) = tokio::time::timeout(
            Duration::from_secs(2),
            client_queue.get(Duration::from_secs(2)),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(frame_number, 1);
        assert_eq!(data.bytes.as_ref(), &[9]);

        client_switch.raise();
        _server_switch.raise();
        let _ = handle.await;
    }
}
