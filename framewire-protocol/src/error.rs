//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or packet decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("start magic word not found before deadline")]
    StartMagicNotFound,

    #[error("end magic word not found before deadline")]
    EndMagicNotFound,

    #[error("connection closed by peer while extracting a packet")]
    ConnectionClosed,

    #[error("unsupported protocol version: {0:#04b}")]
    UnsupportedVersion(u8),

    #[error("invalid packet type bits: {0:#04b}")]
    InvalidPacketType(u8),

    #[error("invalid payload dtype bits: {0:#04b}")]
    InvalidDtype(u8),

    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("payload length mismatch: header declared {declared}, buffer held {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("read deadline exceeded while extracting a packet")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("work was halted")]
    Halted,
}

impl ProtocolError {
    /// Whether the caller should resync (scan for the next start word) rather than
    /// treat this as connection-fatal.
    pub fn is_resync(&self) -> bool {
        matches!(
            self,
            ProtocolError::StartMagicNotFound
                | ProtocolError::EndMagicNotFound
                | ProtocolError::UnsupportedVersion(_)
                | ProtocolError::InvalidPacketType(_)
                | ProtocolError::InvalidDtype(_)
                | ProtocolError::CrcMismatch { .. }
                | ProtocolError::LengthMismatch { .. }
                | ProtocolError::Timeout
        )
    }
}
