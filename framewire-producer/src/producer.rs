//! The unifying producer type.
//!
//! A video feed is a file, a camera, or a remote framewire server; each has
//! a genuinely different start/stop/reconnect shape, so `FrameProducer` is
//! modeled as a tagged union rather than a trait object. Dynamic dispatch is
//! reserved for the one place it's actually needed: constructing the
//! decoder or camera device a [`FileVideoReader`]/[`CameraReader`] uses
//! internally (see [`crate::video::DecoderFactory`] and
//! [`crate::camera::CameraFactory`]).

use crate::camera_reader::CameraReader;
use crate::error::ProducerError;
use crate::file_reader::FileVideoReader;
use crate::network_reader::NetworkProducer;
use crate::source::Source;
use tokio::task::JoinHandle;

/// A running or runnable frame source feeding a shared
/// [`framewire_queue::FrameQueue`].
pub enum FrameProducer {
    File(FileVideoReader),
    Camera(CameraReader),
    Network(NetworkProducer),
}

impl FrameProducer {
    /// Shape of the first frame the producer has deposited, if known yet.
    pub async fn get_shape(&self) -> Option<(u16, u16)> {
        match self {
            FrameProducer::File(reader) => reader.get_shape(),
            FrameProducer::Camera(reader) => reader.get_shape(),
            FrameProducer::Network(reader) => reader.get_shape().await,
        }
    }

    /// Reconnects this producer to a new source of the same kind. Returns
    /// [`ProducerError::ChangeFeedUnsupported`] if `new_source`'s kind
    /// doesn't match this producer's variant.
    pub async fn change_feed(&self, new_source: Source) -> Result<(), ProducerError> {
        match (self, new_source) {
            (FrameProducer::File(reader), Source::File(source)) => reader.change_feed(source).await,
            (FrameProducer::Camera(reader), Source::Camera(source)) => {
                reader.change_feed(source).await
            }
            (FrameProducer::Network(reader), Source::Network(source)) => {
                reader.change_feed(source).await
            }
            _ => Err(ProducerError::ChangeFeedUnsupported),
        }
    }

    /// Spawns the background task that fills the queue. May only be called
    /// once per producer; a camera device that fails to open is reported
    /// immediately rather than via the returned handle's task result.
    pub fn start(&self) -> Result<JoinHandle<Result<(), ProducerError>>, ProducerError> {
        match self {
            FrameProducer::File(reader) => Ok(reader.start()),
            FrameProducer::Camera(reader) => reader.start(),
            FrameProducer::Network(reader) => Ok(reader.start()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::test_support::fake_camera_factory;
    use crate::source::{CameraSource, FileSource, NetworkSource};
    use framewire_protocol::FrameData;
    use framewire_queue::{halt_pair, FrameQueue};
    use std::io::Write;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn file_variant_dispatches_start_and_get_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.raw");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&[1u8, 0u8]).unwrap();
        file.write_all(&[4u8]).unwrap();
        drop(file);

        let (_switch, halt) = halt_pair();
        let queue: Arc<FrameQueue<FrameData>> = Arc::new(FrameQueue::new(4, halt.clone()));
        let producer = FrameProducer::File(FileVideoReader::new(
            FileSource::new(&path, false),
            queue.clone(),
            halt,
        ));

        let handle = producer.start().unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(producer.get_shape().await, Some((1, 1)));
    }

    #[tokio::test]
    async fn change_feed_rejects_a_mismatched_source_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.raw");
        std::fs::File::create(&path).unwrap();

        let (_switch, halt) = halt_pair();
        let queue: Arc<FrameQueue<FrameData>> = Arc::new(FrameQueue::new(4, halt.clone()));
        let producer = FrameProducer::File(FileVideoReader::new(
            FileSource::new(&path, false),
            queue,
            halt,
        ));

        let result = producer.change_feed(Source::Camera(CameraSource::new(0))).await;
        assert!(matches!(result, Err(ProducerError::ChangeFeedUnsupported)));
    }

    #[tokio::test]
    async fn camera_variant_dispatches_start() {
        let (switch, halt) = halt_pair();
        let queue: Arc<FrameQueue<FrameData>> = Arc::new(FrameQueue::new(4, halt.clone()));
        let producer = FrameProducer::Camera(CameraReader::new(
            CameraSource::new(0),
            queue.clone(),
            halt,
            fake_camera_factory(),
        ));

        let handle = producer.start().unwrap();
        let _ = queue.get(Duration::from_millis(200)).await.unwrap();
        switch.raise();
        let _ = handle.await.unwrap();
    }

    #[tokio::test]
    async fn network_variant_dispatches_get_shape_on_an_empty_queue() {
        let (_switch, halt) = halt_pair();
        let queue: Arc<FrameQueue<FrameData>> = Arc::new(FrameQueue::new(4, halt.clone()));
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let producer = FrameProducer::Network(NetworkProducer::new(
            NetworkSource::new(addr),
            queue,
            halt,
        ));
        assert_eq!(producer.get_shape().await, None);
    }
}
