//! Bit-granular writer and reader used underneath both entropy coders.
//!
//! Bits are packed most-significant-bit first within each byte. The writer keeps
//! a single partial-byte accumulator (a `BitVec` that never grows past eight
//! bits) and emits a byte as soon as it fills. The reader walks a borrowed
//! `BitSlice` view of the input with a bit cursor.

use bitvec::prelude::*;

use crate::error::CodecError;

//==================================================================================
// 1. Writer
//==================================================================================

#[derive(Debug, Default)]
pub struct BitWriter {
    out: Vec<u8>,
    pending: BitVec<u8, Msb0>,
    bits_written: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single bit, emitting the accumulator once it holds eight bits.
    pub fn write_bit(&mut self, bit: bool) {
        self.pending.push(bit);
        self.bits_written += 1;
        if self.pending.len() == 8 {
            // All eight bits were pushed explicitly, so the raw byte is exact.
            self.out.extend_from_slice(self.pending.as_raw_slice());
            self.pending.clear();
        }
    }

    /// Writes the low `count` bits of `value`, most-significant first.
    pub fn write_bits(&mut self, value: u64, count: u8) -> Result<(), CodecError> {
        if count > 64 {
            return Err(CodecError::InvalidParameterError(format!(
                "cannot write {} bits from a 64-bit value",
                count
            )));
        }
        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
        Ok(())
    }

    /// Writes `count` one-bits followed by a terminating zero-bit.
    pub fn write_unary(&mut self, count: u64) {
        for _ in 0..count {
            self.write_bit(true);
        }
        self.write_bit(false);
    }

    /// Pads a partial trailing byte with zero bits and emits it.
    /// A no-op when the accumulator is empty.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        while self.pending.len() < 8 {
            self.pending.push(false);
        }
        self.out.extend_from_slice(self.pending.as_raw_slice());
        self.pending.clear();
    }

    /// Total number of payload bits written so far, excluding padding.
    pub fn bits_written(&self) -> usize {
        self.bits_written
    }

    /// Flushes and hands back the finished byte buffer.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.out
    }
}

//==================================================================================
// 2. Reader
//==================================================================================

#[derive(Debug)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bits: BitSlice::from_slice(bytes),
            position: 0,
        }
    }

    /// Pulls the next bit. Fails once every byte of the input has been consumed.
    pub fn read_bit(&mut self) -> Result<bool, CodecError> {
        let bit = self
            .bits
            .get(self.position)
            .map(|b| *b)
            .ok_or_else(|| CodecError::end_of_stream("bit stream"))?;
        self.position += 1;
        Ok(bit)
    }

    /// Reads `count` bits (at most 64) into an unsigned value, most-significant first.
    pub fn read_bits(&mut self, count: u8) -> Result<u64, CodecError> {
        if count > 64 {
            return Err(CodecError::InvalidParameterError(format!(
                "cannot read {} bits into a 64-bit value",
                count
            )));
        }
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Counts one-bits up to and including the terminating zero-bit.
    /// `limit` bounds the count so corrupt input cannot spin forever.
    pub fn read_unary(&mut self, limit: u64) -> Result<u64, CodecError> {
        let mut count = 0u64;
        while self.read_bit()? {
            count += 1;
            if count > limit {
                return Err(CodecError::ConsistencyError(format!(
                    "unary run exceeds the maximum of {}",
                    limit
                )));
            }
        }
        Ok(count)
    }

    pub fn bits_consumed(&self) -> usize {
        self.position
    }

    pub fn bits_remaining(&self) -> usize {
        self.bits.len() - self.position
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
