//! # framewire-producer
//!
//! Frame producers for framewire: reads frames from a file, a camera, or a
//! remote framewire server and deposits them into a shared
//! [`framewire_queue::FrameQueue`].
//!
//! This crate provides:
//! - [`FrameProducer`], a tagged union over the three feed kinds with a
//!   uniform `start`/`get_shape`/`change_feed` surface
//! - The external [`video::VideoDecoder`]/[`camera::CameraDevice`] seams a
//!   real deployment plugs a platform codec or capture library into
//! - `change_feed`, a synchronous "halt, reinitialize, resume" reconnect
//!   distinct from the crate-wide halt signal

pub mod camera;
pub mod camera_reader;
pub mod error;
pub mod file_reader;
pub mod network_reader;
pub mod producer;
pub mod reset;
pub mod source;
pub mod video;

pub use camera::{CameraDevice, CameraFactory};
pub use camera_reader::CameraReader;
pub use error::ProducerError;
pub use file_reader::FileVideoReader;
pub use network_reader::NetworkProducer;
pub use producer::FrameProducer;
pub use source::{CameraSource, FileSource, NetworkSource, Source};
pub use video::{DecoderFactory, VideoDecoder};
