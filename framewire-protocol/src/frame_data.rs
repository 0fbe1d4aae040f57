//! The consumer-facing frame representation: shape, dtype, and raw bytes,
//! independent of the packet-type wrapper a [`crate::packet::Packet`] carries.

use crate::packet::{Dtype, Packet, PacketType};
use bytes::Bytes;

/// A decoded frame's payload, in the height x width x channels convention
/// used by the surrounding image-processing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    pub height: u16,
    pub width: u16,
    pub channel_count: u8,
    pub dtype: Dtype,
    pub bytes: Bytes,
}

impl FrameData {
    pub fn new(height: u16, width: u16, channel_count: u8, dtype: Dtype, bytes: Bytes) -> Self {
        Self {
            height,
            width,
            channel_count,
            dtype,
            bytes,
        }
    }

    /// Extracts the frame payload out of a decoded `FRAME` packet.
    pub fn from_packet(packet: &Packet) -> Self {
        Self {
            height: packet.height,
            width: packet.width,
            channel_count: packet.channel_count,
            dtype: packet.dtype,
            bytes: packet.payload.clone(),
        }
    }

    /// Wraps this frame payload into a `FRAME` packet with the given number.
    pub fn into_packet(self, frame_number: u32) -> Packet {
        Packet {
            frame_number,
            packet_type: PacketType::Frame,
            channel_count: self.channel_count,
            dtype: self.dtype,
            width: self.width,
            height: self.height,
            payload: self.bytes,
        }
    }
}
