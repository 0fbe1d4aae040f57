//! The external camera-capture boundary.
//!
//! Like [`crate::video::VideoDecoder`], opening and reading a physical
//! camera device is delegated to a platform capture library; this crate
//! only depends on the trait and a [`CameraFactory`] closure that
//! constructs one, so [`crate::camera_reader::CameraReader`] never needs to
//! be generic over a concrete device type.

use crate::error::ProducerError;
use framewire_protocol::FrameData;
use std::sync::Arc;

/// A single open camera device, identified by an integer index.
pub trait CameraDevice: Send {
    /// Reads the next frame. Cameras don't signal end-of-stream; a read
    /// failure is reported as an error instead.
    fn read_frame(&mut self) -> Result<FrameData, ProducerError>;
}

/// Opens device `index`. Fails with [`ProducerError::OpenFailed`] if the
/// device can't be opened, per the protocol's `IoError("couldn't open video
/// feed")` policy. Production callers supply a factory backed by their
/// platform's capture library; there is no stdlib-only default.
pub type CameraFactory = Arc<dyn Fn(u32) -> Result<Box<dyn CameraDevice>, ProducerError> + Send + Sync>;
