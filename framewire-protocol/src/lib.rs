//! # framewire-protocol
//!
//! Wire protocol implementation for framewire.
//!
//! This crate provides:
//! - Bit-packed binary packet framing (magic words, header byte, CRC-16/ARC)
//! - Stream resync: locating packet boundaries in an arbitrary byte stream
//! - The packet/error taxonomy shared by the server and client crates

pub mod crc;
pub mod error;
pub mod frame_data;
pub mod framer;
pub mod packet;

pub use error::ProtocolError;
pub use frame_data::FrameData;
pub use framer::StreamFramer;
pub use packet::{Dtype, Packet, PacketType, END_MAGIC, PROTOCOL_VERSION, START_MAGIC};

/// Default TCP port for a framewire server.
pub const DEFAULT_PORT: u16 = 47828;

/// Default capacity of a [`FrameQueue`](../framewire_queue/struct.FrameQueue.html)-style bounded buffer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 30;
