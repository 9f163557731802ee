//! Base-128 variable-length integers.
//!
//! Each byte carries 7 data bits in its low bits, least significant group
//! first. The high bit (`0x80`) is set when another byte follows.
//!
//! ```text
//!   300 = 0b1_0010_1100
//!
//!   byte 0: 1 0101100   low 7 bits, continuation set
//!   byte 1: 0 0000010   next 7 bits, last byte
//! ```
//!
//! Encodings are capped at [`MAX_VARINT_BYTES`]. The encoder stops after
//! that many bytes and drops whatever high bits are left, so only the low
//! 28 bits of a value survive a round-trip. The decoder stops after the
//! same number of bytes even if the last one still has its continuation
//! bit set. Both sides must agree on this cap bit-for-bit.

use crate::ProtocolError;

/// Maximum bytes in one encoded varint.
pub const MAX_VARINT_BYTES: usize = 4;

/// Number of value bits that survive encoding (`7 * MAX_VARINT_BYTES`).
pub const VARINT_VALUE_BITS: u32 = 7 * MAX_VARINT_BYTES as u32;

/// Largest value that round-trips unchanged.
pub const MAX_VARINT_VALUE: u32 = (1 << VARINT_VALUE_BITS) - 1;

const CONTINUATION: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;

/// Appends the varint encoding of `value` to `out` and returns the number
/// of bytes written.
///
/// Values above [`MAX_VARINT_VALUE`] are silently truncated to their low
/// 28 bits.
pub fn encode_varint(mut value: u32, out: &mut Vec<u8>) -> usize {
    let mut written = 0;
    loop {
        let group = (value as u8) & DATA_MASK;
        value >>= 7;
        written += 1;
        if value == 0 || written == MAX_VARINT_BYTES {
            out.push(group);
            return written;
        }
        out.push(group | CONTINUATION);
    }
}

/// Number of bytes [`encode_varint`] would write for `value`.
pub fn varint_len(value: u32) -> usize {
    let bits = u32::BITS - value.leading_zeros();
    (bits.max(1).div_ceil(7) as usize).min(MAX_VARINT_BYTES)
}

/// Decodes a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
/// Returns [`ProtocolError::Truncated`] if `buf` ends while the
/// continuation bit is still set and fewer than [`MAX_VARINT_BYTES`] bytes
/// have been read.
pub fn decode_varint(buf: &[u8]) -> Result<(u32, usize), ProtocolError> {
    let mut value = 0u32;
    for (i, &byte) in buf.iter().take(MAX_VARINT_BYTES).enumerate() {
        value |= u32::from(byte & DATA_MASK) << (7 * i);
        if byte & CONTINUATION == 0 || i + 1 == MAX_VARINT_BYTES {
            return Ok((value, i + 1));
        }
    }
    Err(ProtocolError::Truncated { read: buf.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(value, &mut out);
        out
    }

    #[test]
    fn test_small_values_are_one_byte() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(127), vec![0x7F]);
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        assert_eq!(encode(16_383), vec![0xFF, 0x7F]);
        assert_eq!(encode(16_384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode(MAX_VARINT_VALUE), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_encoding_caps_at_four_bytes() {
        // 2^28 has nothing in the low 28 bits. The fourth byte is written
        // with its continuation bit clear and the top bit is dropped.
        assert_eq!(encode(1 << 28), vec![0x80, 0x80, 0x80, 0x00]);
        assert_eq!(encode(u32::MAX), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_truncated_values_decode_to_low_bits() {
        for value in [1 << 28, (1 << 28) + 5, u32::MAX] {
            let bytes = encode(value);
            let (decoded, used) = decode_varint(&bytes).unwrap();
            assert_eq!(decoded, value & MAX_VARINT_VALUE);
            assert_eq!(used, MAX_VARINT_BYTES);
        }
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        let (value, used) = decode_varint(&[0xAC, 0x02, 0xFF, 0xFF]).unwrap();
        assert_eq!(value, 300);
        assert_eq!(used, 2);
    }

    #[test]
    fn test_decode_stops_after_four_bytes_even_with_continuation() {
        let (value, used) =
            decode_varint(&[0x81, 0x80, 0x80, 0x80, 0x01]).unwrap();
        assert_eq!(value, 1);
        assert_eq!(used, 4);
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_varint(&[]),
            Err(ProtocolError::Truncated { read: 0 })
        ));
        assert!(matches!(
            decode_varint(&[0x80, 0x80]),
            Err(ProtocolError::Truncated { read: 2 })
        ));
    }

    #[test]
    fn test_varint_len_matches_encoding() {
        for value in [0, 1, 127, 128, 16_383, 16_384, MAX_VARINT_VALUE, u32::MAX] {
            assert_eq!(varint_len(value), encode(value).len(), "value {value}");
        }
    }
}
