//! framewire - TCP video-frame streaming
//!
//! Runs a `FrameProducer` that fills a shared `FrameQueue`, and a
//! `FrameServer` that serves the head of that queue to a single connected
//! `FrameClient` on request. Configuration is environment-derived only; see
//! `framewire_server::Config::from_env` and `FRAMEWIRE_SOURCE`/
//! `FRAMEWIRE_SOURCE_KIND` below.

use framewire_producer::{FileSource, FrameProducer, NetworkSource};
use framewire_protocol::FrameData;
use framewire_queue::{halt_pair, FrameQueue};
use framewire_server::{Config, FrameServer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// What kind of producer to start, chosen from `FRAMEWIRE_SOURCE_KIND`.
/// Cameras need a platform capture library this crate doesn't depend on, so
/// they're out of scope for this binary; embed `framewire_producer` directly
/// to wire one up.
enum SourceKind {
    File,
    Network,
}

impl SourceKind {
    fn from_env() -> Self {
        match std::env::var("FRAMEWIRE_SOURCE_KIND").as_deref() {
            Ok("network") => SourceKind::Network,
            _ => SourceKind::File,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    tracing::info!("starting framewire server");
    tracing::info!("  bind address: {}", config.bind_addr);
    tracing::info!("  queue capacity: {}", config.queue_capacity);

    let (halt_switch, halt) = halt_pair();
    let queue: Arc<FrameQueue<FrameData>> = Arc::new(FrameQueue::new(config.queue_capacity, halt.clone()));

    let producer = build_producer(SourceKind::from_env(), queue.clone(), halt.clone())?;
    let producer_handle = producer.start()?;

    let server = Arc::new(FrameServer::new(config, queue, halt));
    let server_for_shutdown = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("received shutdown signal, halting");
        halt_switch.raise();
        let _ = server_for_shutdown;
    });

    server.run().await?;
    match producer_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("producer stopped with an error: {}", e),
        Err(e) => tracing::warn!("producer task panicked: {}", e),
    }

    tracing::info!("framewire stopped");
    Ok(())
}

fn build_producer(
    kind: SourceKind,
    queue: Arc<FrameQueue<FrameData>>,
    halt: framewire_queue::HaltHandle,
) -> Result<FrameProducer, Box<dyn std::error::Error>> {
    match kind {
        SourceKind::File => {
            let path = std::env::var("FRAMEWIRE_SOURCE")
                .map_err(|_| "FRAMEWIRE_SOURCE must name a file path when FRAMEWIRE_SOURCE_KIND=file")?;
            let loop_playback = std::env::var("FRAMEWIRE_LOOP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(true);
            let reader = framewire_producer::FileVideoReader::new(
                FileSource::new(path, loop_playback),
                queue,
                halt,
            );
            Ok(FrameProducer::File(reader))
        }
        SourceKind::Network => {
            let addr = std::env::var("FRAMEWIRE_SOURCE")
                .map_err(|_| "FRAMEWIRE_SOURCE must name a host:port when FRAMEWIRE_SOURCE_KIND=network")?
                .parse()
                .map_err(|e| format!("invalid FRAMEWIRE_SOURCE address: {}", e))?;
            let producer = framewire_producer::NetworkProducer::new(NetworkSource::new(addr), queue, halt);
            Ok(FrameProducer::Network(producer))
        }
    }
}
