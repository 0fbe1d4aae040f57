//! Extracts framed packets out of an arbitrary byte stream.

use crate::error::ProtocolError;
use crate::packet::{END_MAGIC, START_MAGIC};
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::time::{self, Instant};

/// Maximum total time allowed to extract one packet.
pub const READ_DEADLINE: Duration = Duration::from_secs(30);

/// Scans a stream for packet boundaries and hands back the raw bytes of one
/// framed packet (start magic through end magic, inclusive).
pub struct StreamFramer;

impl StreamFramer {
    /// Reads from `reader` until a complete framed packet has been observed,
    /// or the 30 second deadline elapses.
    pub async fn read_packet<R>(reader: &mut R) -> Result<Bytes, ProtocolError>
    where
        R: AsyncReadExt + Unpin,
    {
        let deadline = Instant::now() + READ_DEADLINE;

        let start = Self::read_start_word(reader, deadline).await?;
        let rest = Self::read_until_end_word(reader, deadline).await?;

        let mut buf = BytesMut::with_capacity(start.len() + rest.len());
        buf.extend_from_slice(&start);
        buf.extend_from_slice(&rest);
        Ok(buf.freeze())
    }

    /// Reads single bytes until the trailing window matches [`START_MAGIC`].
    async fn read_start_word<R>(reader: &mut R, deadline: Instant) -> Result<Vec<u8>, ProtocolError>
    where
        R: AsyncReadExt + Unpin,
    {
        let mut window = Vec::with_capacity(START_MAGIC.len());
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(ProtocolError::Timeout)?;

            let mut byte = [0u8; 1];
            let n = time::timeout(remaining, reader.read(&mut byte))
                .await
                .map_err(|_| ProtocolError::Timeout)??;
            if n == 0 {
                return Err(ProtocolError::ConnectionClosed);
            }

            window.push(byte[0]);
            if window.len() > START_MAGIC.len() {
                window.remove(0);
            }
            if window.as_slice() == START_MAGIC {
                return Ok(window);
            }
        }
    }

    /// Reads bytes into a growing buffer until it ends in [`END_MAGIC`].
    async fn read_until_end_word<R>(reader: &mut R, deadline: Instant) -> Result<Vec<u8>, ProtocolError>
    where
        R: AsyncReadExt + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(ProtocolError::Timeout)?;

            let mut byte = [0u8; 1];
            let n = time::timeout(remaining, reader.read(&mut byte))
                .await
                .map_err(|_| ProtocolError::Timeout)??;
            if n == 0 {
                return Err(ProtocolError::ConnectionClosed);
            }

            buf.push(byte[0]);
            if buf.len() >= END_MAGIC.len() && buf[buf.len() - END_MAGIC.len()..] == END_MAGIC {
                return Ok(buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Dtype, Packet, PacketType};
    use std::io::Cursor;

    #[tokio::test]
    async fn extracts_single_packet_with_no_garbage() {
        let packet = Packet::control(1, PacketType::Ok);
        let encoded = packet.encode();
        let mut cursor = Cursor::new(encoded.to_vec());

        let raw = StreamFramer::read_packet(&mut cursor).await.unwrap();
        let decoded = Packet::decode(raw).unwrap();
        assert_eq!(decoded, packet);
    }

    #[tokio::test]
    async fn resyncs_past_leading_garbage() {
        let packet = Packet::frame(9, 1, Dtype::U8, 1, 1, bytes::Bytes::from_static(&[9]));
        let mut stream = vec![0xFFu8, 0xFF, 0x00];
        stream.extend_from_slice(&packet.encode());

        let mut cursor = Cursor::new(stream);
        let raw = StreamFramer::read_packet(&mut cursor).await.unwrap();
        let decoded = Packet::decode(raw).unwrap();
        assert_eq!(decoded, packet);
    }

    #[tokio::test]
    async fn multiple_packets_extracted_in_order() {
        let p1 = Packet::control(1, PacketType::Ok);
        let p2 = Packet::control(2, PacketType::Request);
        let mut stream = p1.encode().to_vec();
        stream.extend_from_slice(&p2.encode());

        let mut cursor = Cursor::new(stream);
        let raw1 = StreamFramer::read_packet(&mut cursor).await.unwrap();
        let raw2 = StreamFramer::read_packet(&mut cursor).await.unwrap();

        assert_eq!(Packet::decode(raw1).unwrap(), p1);
        assert_eq!(Packet::decode(raw2).unwrap(), p2);
    }

    #[tokio::test]
    async fn eof_before_start_word_is_a_closed_connection() {
        let mut cursor = Cursor::new(vec![0x01, 0x02, 0x03]);
        let result = StreamFramer::read_packet(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    }
}
