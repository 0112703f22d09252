//! This module contains the pure, stateless kernels for Zig-zag encoding and
//! decoding.
//!
//! It is a lossless, bitwise mapping of signed residuals to unsigned symbols
//! (0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...). The mapping is total over the
//! declared sample width, so `i32::MIN` and `i32::MAX` survive the round trip.

use num_traits::{PrimInt, Signed, Unsigned};

use crate::traits::{HasSigned, HasUnsigned};

//==================================================================================
// 1. Generic Core Logic (The "Engine")
//==================================================================================

/// Encodes a single signed integer using the Zig-zag algorithm.
pub fn encode_val<T>(n: T) -> T::Unsigned
where
    T: PrimInt + Signed + HasUnsigned,
{
    // `>>` on a signed primitive is arithmetic, which the formula relies on.
    let shifted = (n << 1) ^ (n >> (T::BITS - 1));
    shifted.to_unsigned_bits()
}

/// Decodes a single unsigned integer back to its signed representation.
pub fn decode_val<U>(z: U) -> U::Signed
where
    U: PrimInt + Unsigned + HasSigned,
    U::Signed: PrimInt + Signed,
{
    let half = (z >> 1).to_signed_bits();
    let lsb = (z & U::one()).to_signed_bits();
    half ^ (-lsb)
}

//==================================================================================
// 2. Public API (fixed at the codec's 32-bit sample width)
//==================================================================================

#[inline]
pub fn zigzag_encode(n: i32) -> u32 {
    encode_val(n)
}

#[inline]
pub fn zigzag_decode(z: u32) -> i32 {
    decode_val(z)
}

/// Maps a whole residual stream to symbols.
pub fn encode(residuals: &[i32]) -> Vec<u32> {
    residuals.iter().map(|&r| zigzag_encode(r)).collect()
}

/// Maps a whole symbol stream back to residuals.
pub fn decode(symbols: &[u32]) -> Vec<i32> {
    symbols.iter().map(|&z| zigzag_decode(z)).collect()
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
