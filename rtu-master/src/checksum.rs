//! CRC-16/MODBUS checksum used to protect every RTU frame
//!
//! The checksum uses the reflected polynomial 0xA001, is seeded with 0xFFFF and
//! has no final XOR. On the wire it is transmitted low byte first, which is the
//! opposite of the big-endian register fields it protects.

/// Number of bytes the checksum occupies at the end of a frame
pub const CRC_LENGTH: usize = 2;

/// precomputes the CRC table as a constant!
const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

/// Compute the checksum over `bytes`
///
/// An empty input yields the seed value `0xFFFF`.
pub fn compute(bytes: &[u8]) -> u16 {
    CRC.checksum(bytes)
}

/// Check a frame whose last two bytes hold its little-endian checksum
///
/// Inputs shorter than the checksum itself never verify.
pub fn verify(frame: &[u8]) -> bool {
    match split(frame) {
        Some((data, received)) => compute(data) == received,
        None => false,
    }
}

/// Split a frame into the checksummed bytes and the received checksum
pub(crate) fn split(frame: &[u8]) -> Option<(&[u8], u16)> {
    let position = frame.len().checked_sub(CRC_LENGTH)?;
    let (data, crc) = frame.split_at(position);
    match crc {
        [low, high] => Some((data, u16::from_le_bytes([*low, *high]))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(data: &[u8]) -> Vec<u8> {
        let mut frame = data.to_vec();
        frame.extend_from_slice(&compute(data).to_le_bytes());
        frame
    }

    #[test]
    fn empty_input_returns_seed() {
        assert_eq!(compute(&[]), 0xFFFF);
    }

    #[test]
    fn matches_reference_check_value() {
        assert_eq!(compute(b"123456789"), 0x4B37);
    }

    #[test]
    fn matches_known_read_holding_registers_frame() {
        // slave 0x2A, read holding registers, start 0x0010, qty 3
        assert_eq!(compute(&[0x2A, 0x03, 0x00, 0x10, 0x00, 0x03]), 0x1502);
        assert!(verify(&[0x2A, 0x03, 0x00, 0x10, 0x00, 0x03, 0x02, 0x15]));
    }

    #[test]
    fn checksum_is_transmitted_low_byte_first() {
        // the byte-swapped checksum must not verify
        assert!(!verify(&[0x2A, 0x03, 0x00, 0x10, 0x00, 0x03, 0x15, 0x02]));
    }

    #[test]
    fn appended_checksum_always_verifies() {
        let mut data = Vec::new();
        for i in 0..300u32 {
            assert!(verify(&with_crc(&data)), "length {}", data.len());
            data.push((i.wrapping_mul(37) ^ (i >> 3)) as u8);
        }
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        // CRC-16 detects all single bit errors, and all bursts up to 16 bits. Arbitrary
        // multi-bit corruption goes undetected with a probability of roughly 2^-16.
        let frame = with_crc(&[0x10, 0x10, 0x00, 0x04, 0x00, 0x03, 0x06, 0x00, 0x02, 0x00, 0x0B, 0x03, 0xE8]);
        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                assert!(!verify(&corrupted), "flip of bit {bit} in byte {byte}");
            }
        }
    }

    #[test]
    fn short_inputs_never_verify() {
        assert!(!verify(&[]));
        assert!(!verify(&[0xFF]));
        // two bytes is an empty payload followed by the seed value
        assert!(verify(&[0xFF, 0xFF]));
    }
}
