//! CRC-16/ARC checksum used to validate packet payloads.

use crc::{Crc, CRC_16_ARC};

/// CRC-16/ARC: poly 0x8005, reflected in/out, init 0x0000, xorout 0x0000.
pub const CRC16_ARC: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// Computes the CRC-16/ARC checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    CRC16_ARC.checksum(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_checksums_to_zero() {
        assert_eq!(checksum(&[]), 0x0000);
    }

    #[test]
    fn twelve_fours_checksum_matches_vector() {
        let payload = [0x04u8; 12];
        assert_eq!(checksum(&payload), 0x4FA3);
    }
}
