//! Reads frames sequentially from a video file via an external decoder.

use crate::error::ProducerError;
use crate::reset::{reset_channel, ResetController, ResetReceiver};
use crate::source::FileSource;
use crate::video::{raw_frame_file_factory, DecoderFactory, VideoDecoder};
use framewire_protocol::FrameData;
use framewire_queue::{FrameQueue, HaltHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

/// Approximates real-time playback between successive frames of a file.
pub const INTER_FRAME_SLEEP: Duration = Duration::from_millis(50);

/// Reads frames out of a video file, optionally looping, and deposits them
/// into a shared [`FrameQueue`]. Holds a [`DecoderFactory`] rather than
/// being generic over the decoder type, so the reader itself stays a plain
/// struct and dynamic dispatch lives only at construction.
pub struct FileVideoReader {
    queue: Arc<FrameQueue<FrameData>>,
    halt: HaltHandle,
    reset: ResetController<FileSource>,
    reset_rx: Mutex<Option<ResetReceiver<FileSource>>>,
    initial_source: Mutex<FileSource>,
    factory: DecoderFactory,
    shape_tx: Mutex<Option<watch::Sender<Option<(u16, u16)>>>>,
    shape_rx: watch::Receiver<Option<(u16, u16)>>,
}

impl FileVideoReader {
    /// Builds a reader backed by the default [`raw_frame_file_factory`].
    pub fn new(source: FileSource, queue: Arc<FrameQueue<FrameData>>, halt: HaltHandle) -> Self {
        Self::with_decoder_factory(source, queue, halt, raw_frame_file_factory())
    }

    /// Builds a reader backed by a caller-supplied decoder factory, for
    /// production deployments that plug in a real video codec.
    pub fn with_decoder_factory(
        source: FileSource,
        queue: Arc<FrameQueue<FrameData>>,
        halt: HaltHandle,
        factory: DecoderFactory,
    ) -> Self {
        let (reset, reset_rx) = reset_channel();
        let (shape_tx, shape_rx) = watch::channel(None);
        Self {
            queue,
            halt,
            reset,
            reset_rx: Mutex::new(Some(reset_rx)),
            initial_source: Mutex::new(source),
            factory,
            shape_tx: Mutex::new(Some(shape_tx)),
            shape_rx,
        }
    }

    /// Shape of the first decoded frame, once one has arrived.
    pub fn get_shape(&self) -> Option<(u16, u16)> {
        *self.shape_rx.borrow()
    }

    /// Atomically swaps to a new source: halts the current decode loop,
    /// reinitializes against `new_source`, clears the reset signal, and
    /// resumes with `frame_number` restarting at 0.
    pub async fn change_feed(&self, new_source: FileSource) -> Result<(), ProducerError> {
        self.reset.change_feed(new_source).await
    }

    /// Spawns the background read loop. May only be called once per reader.
    pub fn start(&self) -> JoinHandle<Result<(), ProducerError>> {
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
        let initial_source = self.initial_source.try_lock().expect("uncontended at start").clone();

        tokio::spawn(Self::run(initial_source, factory, queue, halt, reset_rx, shape_tx))
    }

    async fn run(
        mut source: FileSource,
        factory: DecoderFactory,
        queue: Arc<FrameQueue<FrameData>>,
        halt: HaltHandle,
        mut reset_rx: ResetReceiver<FileSource>,
        shape_tx: watch::Sender<Option<(u16, u16)>>,
    ) -> Result<(), ProducerError> {
        let mut decoder = factory(&source.path)?;
        let mut frame_number: u32 = 0;

        loop {
            if halt.is_halted() {
                return Ok(());
            }
            if let Some(req) = reset_rx.try_recv() {
                Self::apply_reset(req, &factory, &mut decoder, &mut source, &mut frame_number, &shape_tx);
                continue;
            }

            match decoder.next_frame()? {
                Some(data) => {
                    if shape_tx.borrow().is_none() {
                        let _ = shape_tx.send(Some((data.height, data.width)));
                    }
                    queue
                        .put_nonblocking_drop_oldest((frame_number, data))
                        .await;
                    frame_number = frame_number.wrapping_add(1);

                    tokio::select! {
                        _ = halt.wait() => return Ok(()),
                        req = reset_rx.recv() => {
                            if let Some(req) = req {
                                Self::apply_reset(req, &factory, &mut decoder, &mut source, &mut frame_number, &shape_tx);
                            } else {
                                return Ok(());
                            }
                        }
                        _ = time::sleep(INTER_FRAME_SLEEP) => {}
                    }
                }
                None => {
                    if source.loop_playback {
                        decoder.rewind()?;
                    } else {
                        tracing::info!("file producer reached end of stream, stopping");
                        return Ok(());
                    }
                }
            }
        }
    }

    fn apply_reset(
        req: crate::reset::ChangeFeedRequest<FileSource>,
        factory: &DecoderFactory,
        decoder: &mut Box<dyn VideoDecoder>,
        source: &mut FileSource,
        frame_number: &mut u32,
        shape_tx: &watch::Sender<Option<(u16, u16)>>,
    ) {
        match factory(&req.new_source.path) {
            Ok(d) => {
                *decoder = d;
                *source = req.new_source;
                *frame_number = 0;
                let _ = shape_tx.send(None);
                let _ = req.ack.send(Ok(()));
            }
            Err(e) => {
                let _ = req.ack.send(Err(e));
            }
        }
    }
}
