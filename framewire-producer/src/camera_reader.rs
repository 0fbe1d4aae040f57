//! Reads frames from a camera device index. No looping, no inter-frame
//! sleep: a camera is read as fast as the device and queue allow.

use crate::camera::CameraFactory;
use crate::error::ProducerError;
use crate::reset::{reset_channel, ResetController, ResetReceiver};
use crate::source::CameraSource;
use framewire_protocol::FrameData;
use framewire_queue::{FrameQueue, HaltHandle};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Reads frames from an open camera device and deposits them into a shared
/// [`FrameQueue`]. Holds a [`CameraFactory`] rather than being generic over
/// the capture device, so this crate never depends on a concrete platform
/// capture library even at the type level.
pub struct CameraReader {
    queue: Arc<FrameQueue<FrameData>>,
    halt: HaltHandle,
    reset: ResetController<CameraSource>,
    reset_rx: Mutex<Option<ResetReceiver<CameraSource>>>,
    initial_source: CameraSource,
    factory: CameraFactory,
    shape_tx: Mutex<Option<watch::Sender<Option<(u16, u16)>>>>,
    shape_rx: watch::Receiver<Option<(u16, u16)>>,
}

impl CameraReader {
    /// There is no stdlib-only default camera factory; callers must supply
    /// one backed by their platform's capture library (or, in tests,
    /// `camera::test_support::fake_camera_factory`).
    pub fn new(
        source: CameraSource,
        queue: Arc<FrameQueue<FrameData>>,
        halt: HaltHandle,
        factory: CameraFactory,
    ) -> Self {
        let (reset, reset_rx) = reset_channel();
        let (shape_tx, shape_rx) = watch::channel(None);
        Self {
            queue,
            halt,
            reset,
            reset_rx: Mutex::new(Some(reset_rx)),
            initial_source: source,
            factory,
            shape_tx: Mutex::new(Some(shape_tx)),
            shape_rx,
        }
    }

    pub fn get_shape(&self) -> Option<(u16, u16)> {
        *self.shape_rx.borrow()
    }

    pub async fn change_feed(&self, new_source: CameraSource) -> Result<(), ProducerError> {
        self.reset.change_feed(new_source).await
    }

    /// Opens the device and spawns the read loop. Fails immediately with
    /// [`ProducerError::OpenFailed`] if the device can't be opened, rather
    /// than spawning a task doomed to fail.
    pub fn start(&self) -> Result<JoinHandle<Result<(), ProducerError>>, ProducerError> {
        let device = (self.factory)(self.initial_source.index)?;
        let queue = self.queue.clone();
        let halt = self.halt.clone();
        let factory = self.factory.clone();
        let reset_rx = self
            .reset_rx
            .try_lock()
            .expect("start() called concurrently with itself")
            .take()
            .expect("start() called more than once");
        let shape_tx = self
            .shape_tx
            .try_lock()
            .expect("start() called concurrently with itself")
            .take()
            .expect("start() called more than once");

        Ok(tokio::spawn(Self::run(device, factory, queue, halt, reset_rx, shape_tx)))
    }

    async fn run(
        mut device: Box<dyn crate::camera::CameraDevice>,
        factory: CameraFactory,
        queue: Arc<FrameQueue<FrameData>>,
        halt: HaltHandle,
        mut reset_rx: ResetReceiver<CameraSource>,
        shape_tx: watch::Sender<Option<(u16, u16)>>,
    ) -> Result<(), ProducerError> {
        let mut frame_number: u32 = 0;

        loop {
            if halt.is_halted() {
                return Ok(());
            }

            if let Some(req) = reset_rx.try_recv() {
                match factory(req.new_source.index) {
                    Ok(d) => {
                        device = d;
                        frame_number = 0;
                        let _ = shape_tx.send(None);
                        let _ = req.ack.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = req.ack.send(Err(e));
                    }
                }
                continue;
            }

            let data = device.read_frame()?;
            if shape_tx.borrow().is_none() {
                let _ = shape_tx.send(Some((data.height, data.width)));
            }
            queue
                .put_nonblocking_drop_oldest((frame_number, data))
                .await;
            frame_number = frame_number.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::test_support::{fake_camera_factory, UNAVAILABLE_INDEX};
    use framewire_queue::halt_pair;
    use std::time::Duration;

    #[tokio::test]
    async fn reads_frames_with_increasing_frame_numbers() {
        let (switch, halt) = halt_pair();
        let queue = Arc::new(FrameQueue::new(10, halt.clone()));
        let reader = CameraReader::new(
            CameraSource::new(0),
            queue.clone(),
            halt,
            fake_camera_factory(),
        );
        let handle = reader.start().unwrap();

        let (n0, _) = queue.get(Duration::from_millis(200)).await.unwrap();
        let (n1, _) = queue.get(Duration::from_millis(200)).await.unwrap();
        assert!(n1 > n0);

        switch.raise();
        let _ = handle.await.unwrap();
    }

    #[tokio::test]
    async fn open_failure_is_reported_immediately() {
        let (_switch, halt) = halt_pair();
        let queue = Arc::new(FrameQueue::new(10, halt.clone()));
        let reader = CameraReader::new(
            CameraSource::new(UNAVAILABLE_INDEX),
            queue,
            halt,
            fake_camera_factory(),
        );
        let result = reader.start();
        assert!(matches!(result, Err(ProducerError::OpenFailed)));
    }
}
