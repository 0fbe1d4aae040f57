//! Binary packet format.
//!
//! Packet layout (22 bytes fixed + payload):
//!
//! ```text
//! +-------+----+--------------+-------+-------+---------------+---------+------+-------+
//! | magic | HB | frame_number | width | height| payload_length| payload | crc16| magic |
//! | 3     | 1  | 4            | 2     | 2     | 4              | L       | 2    | 4     |
//! +-------+----+--------------+-------+-------+---------------+---------+------+-------+
//! ```
//!
//! `HB` (header byte) packs four 2-bit fields, MSB first: protocol version,
//! packet type, channel count, payload dtype.

use crate::crc;
use crate::error::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Start-of-packet magic word.
pub const START_MAGIC: [u8; 3] = *b"INU";
/// End-of-packet magic word.
pub const END_MAGIC: [u8; 4] = *b"NEKO";
/// Protocol version carried in the top two bits of the header byte.
pub const PROTOCOL_VERSION: u8 = 0b10;
/// Size of every field up to and including `payload_length`.
pub const FIXED_HEADER_SIZE: usize = 3 + 1 + 4 + 2 + 2 + 4;
/// Size of the trailing CRC + end magic.
pub const FIXED_TRAILER_SIZE: usize = 2 + 4;

/// The four control/data packet kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Ok,
    Frame,
    Request,
    Halt,
}

impl PacketType {
    fn bits(self) -> u8 {
        match self {
            PacketType::Ok => 0b00,
            PacketType::Frame => 0b01,
            PacketType::Request => 0b10,
            PacketType::Halt => 0b11,
        }
    }

    fn from_bits(bits: u8) -> Result<Self, ProtocolError> {
        match bits {
            0b00 => Ok(PacketType::Ok),
            0b01 => Ok(PacketType::Frame),
            0b10 => Ok(PacketType::Request),
            0b11 => Ok(PacketType::Halt),
            other => Err(ProtocolError::InvalidPacketType(other)),
        }
    }
}

/// Primitive element types a payload may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    U8,
    I32,
    F32,
    F64,
}

impl Dtype {
    /// Size in bytes of one element of this dtype.
    pub fn size_of(self) -> usize {
        match self {
            Dtype::U8 => 1,
            Dtype::I32 => 4,
            Dtype::F32 => 4,
            Dtype::F64 => 8,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Dtype::U8 => 0b00,
            Dtype::I32 => 0b01,
            Dtype::F32 => 0b10,
            Dtype::F64 => 0b11,
        }
    }

    fn from_bits(bits: u8) -> Result<Self, ProtocolError> {
        match bits {
            0b00 => Ok(Dtype::U8),
            0b01 => Ok(Dtype::I32),
            0b10 => Ok(Dtype::F32),
            0b11 => Ok(Dtype::F64),
            other => Err(ProtocolError::InvalidDtype(other)),
        }
    }
}

/// A decoded (or about-to-be-encoded) packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub frame_number: u32,
    pub packet_type: PacketType,
    pub channel_count: u8,
    pub dtype: Dtype,
    pub width: u16,
    pub height: u16,
    pub payload: Bytes,
}

impl Packet {
    /// Builds a zero-payload control packet (`OK`, `REQUEST`, or `HALT`).
    pub fn control(frame_number: u32, packet_type: PacketType) -> Self {
        Self {
            frame_number,
            packet_type,
            channel_count: 0,
            dtype: Dtype::U8,
            width: 0,
            height: 0,
            payload: Bytes::new(),
        }
    }

    /// Builds a `FRAME` packet carrying a rectangular payload.
    pub fn frame(
        frame_number: u32,
        channel_count: u8,
        dtype: Dtype,
        width: u16,
        height: u16,
        payload: Bytes,
    ) -> Self {
        Self {
            frame_number,
            packet_type: PacketType::Frame,
            channel_count,
            dtype,
            width,
            height,
            payload,
        }
    }

    fn header_byte(&self) -> u8 {
        (PROTOCOL_VERSION << 6)
            | (self.packet_type.bits() << 4)
            | ((self.channel_count & 0b11) << 2)
            | self.dtype.bits()
    }

    /// Encodes this packet to its exact wire representation.
    pub fn encode(&self) -> BytesMut {
        let payload_len = self.payload.len();
        let total = FIXED_HEADER_SIZE + payload_len + FIXED_TRAILER_SIZE;
        let mut buf = BytesMut::with_capacity(total);

        buf.put_slice(&START_MAGIC);
        buf.put_u8(self.header_byte());
        buf.put_u32_le(self.frame_number);
        buf.put_u16_le(self.width);
        buf.put_u16_le(self.height);
        buf.put_u32_le(payload_len as u32);
        buf.put_slice(&self.payload);
        buf.put_u16_le(crc::checksum(&self.payload));
        buf.put_slice(&END_MAGIC);

        buf
    }

    /// Decodes a packet from a buffer that holds exactly one framed packet
    /// (i.e. the bytes a [`crate::framer::StreamFramer`] extracted).
    pub fn decode(mut buf: Bytes) -> Result<Self, ProtocolError> {
        if buf.len() < START_MAGIC.len() {
            return Err(ProtocolError::StartMagicNotFound);
        }
        let magic = buf.split_to(START_MAGIC.len());
        if magic.as_ref() != START_MAGIC {
            return Err(ProtocolError::StartMagicNotFound);
        }

        if buf.remaining() < FIXED_HEADER_SIZE - START_MAGIC.len() {
            return Err(ProtocolError::LengthMismatch {
                declared: FIXED_HEADER_SIZE - START_MAGIC.len(),
                actual: buf.remaining(),
            });
        }

        let hb = buf.get_u8();
        let version = hb >> 6;
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        let packet_type = PacketType::from_bits((hb >> 4) & 0b11)?;
        let channel_count = (hb >> 2) & 0b11;
        let dtype = Dtype::from_bits(hb & 0b11)?;

        let frame_number = buf.get_u32_le();
        let width = buf.get_u16_le();
        let height = buf.get_u16_le();
        let payload_length = buf.get_u32_le() as usize;

        if buf.remaining() < payload_length + FIXED_TRAILER_SIZE {
            return Err(ProtocolError::LengthMismatch {
                declared: payload_length + FIXED_TRAILER_SIZE,
                actual: buf.remaining(),
            });
        }

        let payload = buf.split_to(payload_length);

        let expected_crc = buf.get_u16_le();
        let actual_crc = crc::checksum(&payload);
        if expected_crc != actual_crc {
            return Err(ProtocolError::CrcMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        if buf.remaining() < END_MAGIC.len() || buf[..END_MAGIC.len()] != END_MAGIC {
            return Err(ProtocolError::EndMagicNotFound);
        }

        Ok(Self {
            frame_number,
            packet_type,
            channel_count,
            dtype,
            width,
            height,
            payload,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn packet_type_strategy() -> impl Strategy<Value = PacketType> {
        prop_oneof![
            Just(PacketType::Ok),
            Just(PacketType::Frame),
            Just(PacketType::Request),
            Just(PacketType::Halt),
        ]
    }

    fn dtype_strategy() -> impl Strategy<Value = Dtype> {
        prop_oneof![
            Just(Dtype::U8),
            Just(Dtype::I32),
            Just(Dtype::F32),
            Just(Dtype::F64),
        ]
    }

    proptest! {
        /// `decode(encode(p)) == p` for any well-formed packet, including the
        /// `channel_count == 1` payload-reshape case.
        #[test]
        fn roundtrip_any_well_formed_packet(
            frame_number in any::<u32>(),
            packet_type in packet_type_strategy(),
            channel_count in 0u8..=3,
            dtype in dtype_strategy(),
            width in 0u16..64,
            height in 0u16..64,
            fill in any::<u8>(),
        ) {
            let elements = width as usize * height as usize * channel_count.max(1) as usize;
            let byte_len = elements * dtype.size_of();
            let payload = Bytes::from(vec![fill; byte_len]);
            let packet = Packet {
                frame_number,
                packet_type,
                channel_count,
                dtype,
                width,
                height,
                payload,
            };

            let decoded = Packet::decode(packet.encode().freeze()).unwrap();
            prop_assert_eq!(decoded, packet);
        }

        /// Flipping any single bit in the payload region must surface as a
        /// CRC mismatch, never a silent decode.
        #[test]
        fn single_bit_flip_in_payload_is_detected(
            fill in any::<u8>(),
            len in 1usize..64,
            flip_byte in 0usize..64,
            flip_bit in 0u8..8,
        ) {
            let flip_byte = flip_byte % len;
            let payload = Bytes::from(vec![fill; len]);
            let packet = Packet::frame(1, 1, Dtype::U8, len as u16, 1, payload);
            let mut encoded = packet.encode();
            encoded[FIXED_HEADER_SIZE + flip_byte] ^= 1 << flip_bit;

            let result = Packet::decode(encoded.freeze());
            prop_assert!(matches!(result, Err(ProtocolError::CrcMismatch { .. })));
        }

        /// Any header byte whose top two bits aren't the current protocol
        /// version is rejected, regardless of the other three fields.
        #[test]
        fn non_current_version_bits_are_always_rejected(
            version in (0u8..4).prop_filter("must differ from current", |v| *v != PROTOCOL_VERSION),
            type_bits in 0u8..4,
            channel_bits in 0u8..4,
            dtype_bits in 0u8..4,
        ) {
            let packet = Packet::control(1, PacketType::Ok);
            let mut encoded = packet.encode();
            encoded[3] = (version << 6) | (type_bits << 4) | (channel_bits << 2) | dtype_bits;

            let result = Packet::decode(encoded.freeze());
            prop_assert!(matches!(result, Err(ProtocolError::UnsupportedVersion(v)) if v == version));
        }
    }
}
