//! This module contains the pure, stateless kernels for LEB128 (Little-Endian
//! Base 128) variable-length integer encoding and decoding.
//!
//! The container uses it for every count and length in the header and side
//! tables, where most values are small. It is fully panic-free.

use num_traits::{PrimInt, Unsigned};
use std::io::Cursor;

use crate::error::CodecError;

//==================================================================================
// 1. Public API for Single-Value Operations
//==================================================================================

/// Encodes a single unsigned integer into a LEB128 byte sequence, appending to `buffer`.
pub fn encode_one<T>(value: T, buffer: &mut Vec<u8>) -> Result<(), CodecError>
where
    T: PrimInt + Unsigned,
{
    let zero = T::zero();
    let seven_bit_mask = T::from(0x7F).ok_or_else(|| {
        CodecError::InternalError("failed to create 7-bit mask for type".to_string())
    })?;

    let mut current_value = value;
    loop {
        let low = (current_value & seven_bit_mask).to_u8().ok_or_else(|| {
            CodecError::InternalError("failed to narrow a 7-bit group to u8".to_string())
        })?;
        current_value = current_value >> 7;
        if current_value == zero {
            buffer.push(low);
            break;
        }
        buffer.push(low | 0x80);
    }
    Ok(())
}

/// Decodes a single unsigned integer from a LEB128 byte stream cursor.
pub fn decode_one<T>(cursor: &mut Cursor<&[u8]>) -> Result<T, CodecError>
where
    T: PrimInt + Unsigned,
{
    let mut result = T::zero();
    let mut shift = 0usize;
    let total_bits = std::mem::size_of::<T>() * 8;

    loop {
        let pos = cursor.position() as usize;
        let byte = *cursor
            .get_ref()
            .get(pos)
            .ok_or_else(|| CodecError::end_of_stream("varint"))?;
        cursor.set_position((pos + 1) as u64);

        if shift >= total_bits {
            return Err(CodecError::FormatError(
                "varint overflows its target integer type".to_string(),
            ));
        }

        let payload = byte & 0x7F;
        // The final group may only set bits that still fit in the type.
        if shift + 7 > total_bits && (payload >> (total_bits - shift)) > 0 {
            return Err(CodecError::FormatError(
                "varint overflows its target integer type".to_string(),
            ));
        }
        let seven_bits = T::from(payload).ok_or_else(|| {
            CodecError::InternalError("failed to widen a 7-bit group".to_string())
        })?;
        result = result | (seven_bits << shift);

        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Convenience for header fields that are lengths or counts in memory.
pub fn decode_usize(cursor: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
    let value: u64 = decode_one(cursor)?;
    usize::try_from(value)
        .map_err(|_| CodecError::FormatError(format!("varint {} does not fit in usize", value)))
}

//==================================================================================
// 2. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leb128_roundtrip_u32() {
        let original: Vec<u32> = vec![0, 127, 128, 1000, u32::MAX];
        let mut encoded_bytes = Vec::new();
        for &value in &original {
            encode_one(value, &mut encoded_bytes).unwrap();
        }
        let mut cursor = Cursor::new(&encoded_bytes[..]);
        let decoded: Vec<u32> = original
            .iter()
            .map(|_| decode_one::<u32>(&mut cursor).unwrap())
            .collect();
        assert_eq!(decoded, original);
        assert_eq!(cursor.position() as usize, encoded_bytes.len());
    }

    #[test]
    fn test_known_byte_layout() {
        let mut buffer = Vec::new();
        encode_one(624485u64, &mut buffer).unwrap();
        assert_eq!(buffer, vec![0xE5, 0x8E, 0x26]);

        let mut single = Vec::new();
        encode_one(0u32, &mut single).unwrap();
        assert_eq!(single, vec![0x00]);
    }

    #[test]
    fn test_decode_truncated_buffer() {
        let mut encoded_bytes = Vec::new();
        encode_one(624485u64, &mut encoded_bytes).unwrap();
        let result = decode_one::<u64>(&mut Cursor::new(&encoded_bytes[..2]));
        assert!(matches!(result, Err(CodecError::TruncationError(_))));
    }

    #[test]
    fn test_decode_overflow_error() {
        // Six groups cannot fit in a u32.
        let encoded_bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let result = decode_one::<u32>(&mut Cursor::new(&encoded_bytes[..]));
        assert!(matches!(result, Err(CodecError::FormatError(_))));

        // The fifth group of a u32 may only carry four bits.
        let too_wide = [0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
        assert!(matches!(
            decode_one::<u32>(&mut Cursor::new(&too_wide[..])),
            Err(CodecError::FormatError(_))
        ));
    }

    #[test]
    fn test_decode_usize_reads_one_value() {
        let bytes = [0x05, 0x06];
        let mut cursor = Cursor::new(&bytes[..]);
        assert_eq!(decode_usize(&mut cursor).unwrap(), 5);
        assert_eq!(cursor.position(), 1);
    }
}
