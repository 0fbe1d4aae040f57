//! The external-decoder boundary.
//!
//! Video-file decoding is explicitly out of scope for this crate (§1): a
//! real deployment plugs in a decoder backed by a platform video library.
//! [`VideoDecoder`] is that seam, and [`DecoderFactory`] is how a concrete
//! decoder gets constructed without [`crate::file_reader::FileVideoReader`]
//! being generic over it -- dynamic dispatch belongs at the configuration
//! boundary, not threaded through every producer type.
//! [`RawFrameFileDecoder`] is a minimal, dependency-free implementation used
//! by tests and by callers who just want to replay a sequence of raw frames
//! without linking a codec.

use crate::error::ProducerError;
use framewire_protocol::{Dtype, FrameData};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// A source of sequential frames, opened against a
/// [`crate::source::FileSource`] path. Implementations wrap whatever
/// platform decoder is available; this crate only depends on the trait,
/// never a concrete codec.
pub trait VideoDecoder: Send {
    /// Decodes the next frame, or `None` at end-of-stream.
    fn next_frame(&mut self) -> Result<Option<FrameData>, ProducerError>;

    /// Rewinds to the first frame. Used when `loop_playback` is set.
    fn rewind(&mut self) -> Result<(), ProducerError>;
}

/// Opens a decoder against a path. Kept separate from [`VideoDecoder`]
/// itself so the decoder trait stays object-safe; a factory is what
/// [`crate::file_reader::FileVideoReader`] actually stores.
pub type DecoderFactory = Arc<dyn Fn(&Path) -> Result<Box<dyn VideoDecoder>, ProducerError> + Send + Sync>;

/// A trivial decoder over a custom container: a sequence of
/// `height:u16, width:u16, channel_count:u8, dtype:u8` headers each followed
/// by `height*width*max(channel_count,1)*dtype.size_of()` raw bytes.
///
/// Exists so the producer crate and its tests don't need a real video
/// library; production deployments provide their own [`DecoderFactory`].
pub struct RawFrameFileDecoder {
    path: std::path::PathBuf,
    reader: BufReader<File>,
}

impl RawFrameFileDecoder {
    pub fn open(path: &Path) -> Result<Self, ProducerError> {
        let file = File::open(path).map_err(|_| ProducerError::OpenFailed)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }
}

impl VideoDecoder for RawFrameFileDecoder {
    fn next_frame(&mut self) -> Result<Option<FrameData>, ProducerError> {
        let mut header = [0u8; 6];
        match self.reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(ProducerError::Io(e)),
        }

        let height = u16::from_le_bytes([header[0], header[1]]);
        let width = u16::from_le_bytes([header[2], header[3]]);
        let channel_count = header[4];
        let dtype = match header[5] {
            0 => Dtype::U8,
            1 => Dtype::I32,
            2 => Dtype::F32,
            _ => Dtype::F64,
        };

        let elements = height as usize * width as usize * channel_count.max(1) as usize;
        let mut bytes = vec![0u8; elements * dtype.size_of()];
        self.reader.read_exact(&mut bytes)?;

        Ok(Some(FrameData::new(
            height,
            width,
            channel_count,
            dtype,
            bytes.into(),
        )))
    }

    fn rewind(&mut self) -> Result<(), ProducerError> {
        let file = File::open(&self.path).map_err(|_| ProducerError::OpenFailed)?;
        self.reader = BufReader::new(file);
        Ok(())
    }
}

/// The default [`DecoderFactory`]: opens a [`RawFrameFileDecoder`].
pub fn raw_frame_file_factory() -> DecoderFactory {
    Arc::new(|path: &Path| {
        RawFrameFileDecoder::open(path).map(|d| Box::new(d) as Box<dyn VideoDecoder>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_raw_frame(file: &mut File, h: u16, w: u16, c: u8, dtype: u8, value: u8) {
        file.write_all(&h.to_le_bytes()).unwrap();
        file.write_all(&w.to_le_bytes()).unwrap();
        file.write_all(&[c, dtype]).unwrap();
        let elements = h as usize * w as usize * c.max(1) as usize;
        file.write_all(&vec![value; elements]).unwrap();
    }

    #[test]
    fn decodes_two_frames_then_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.raw");
        let mut file = File::create(&path).unwrap();
        write_raw_frame(&mut file, 2, 2, 1, 0, 7);
        write_raw_frame(&mut file, 2, 2, 1, 0, 9);
        drop(file);

        let mut decoder = RawFrameFileDecoder::open(&path).unwrap();
        let first = decoder.next_frame().unwrap().unwrap();
        assert_eq!(first.bytes.as_ref(), &[7, 7, 7, 7]);
        let second = decoder.next_frame().unwrap().unwrap();
        assert_eq!(second.bytes.as_ref(), &[9, 9, 9, 9]);
        assert!(decoder.next_frame().unwrap().is_none());
    }

    #[test]
    fn rewind_replays_from_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.raw");
        let mut file = File::create(&path).unwrap();
        write_raw_frame(&mut file, 1, 1, 1, 0, 3);
        drop(file);

        let mut decoder = RawFrameFileDecoder::open(&path).unwrap();
        decoder.next_frame().unwrap();
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.rewind().unwrap();
        let again = decoder.next_frame().unwrap().unwrap();
        assert_eq!(again.bytes.as_ref(), &[3]);
    }

    #[test]
    fn open_failure_on_missing_file() {
        let result = RawFrameFileDecoder::open(Path::new("/nonexistent/clip.raw"));
        assert!(matches!(result, Err(ProducerError::OpenFailed)));
    }

    #[test]
    fn factory_produces_a_working_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.raw");
        let mut file = File::create(&path).unwrap();
        write_raw_frame(&mut file, 1, 1, 1, 0, 5);
        drop(file);

        let factory = raw_frame_file_factory();
        let mut decoder = factory(&path).unwrap();
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.bytes.as_ref(), &[5]);
    }
}
