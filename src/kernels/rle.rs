//! This module contains the pure, stateless kernels for run folding: replacing
//! maximal runs of one symbol with a single run token, and the bit codes used to
//! store the run lengths.
//!
//! Folding is greedy, left to right and non-overlapping. A run whose length
//! reaches the threshold becomes a `Token::Run`; anything shorter is emitted as
//! literals. When the length code has a maximum (a fixed-width field), longer
//! runs are split into maximal-capacity tokens and any tail below the threshold
//! falls back to literals, so the output is canonical for a given
//! `(threshold, scope, max length)`.

use serde::{Deserialize, Serialize};

use super::bitio::{BitReader, BitWriter};
use crate::error::CodecError;

//==================================================================================
// 1. Token and Parameter Types
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(u32),
    Run { value: u32, length: u32 },
}

/// Which symbols may be folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunScope {
    #[default]
    AnySymbol,
    ZerosOnly,
}

impl RunScope {
    pub fn id(self) -> u8 {
        match self {
            Self::AnySymbol => 0,
            Self::ZerosOnly => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, CodecError> {
        match id {
            0 => Ok(Self::AnySymbol),
            1 => Ok(Self::ZerosOnly),
            _ => Err(CodecError::FormatError(format!("unknown run scope {}", id))),
        }
    }

    fn admits(self, value: u32) -> bool {
        match self {
            Self::AnySymbol => true,
            Self::ZerosOnly => value == 0,
        }
    }
}

/// How a run length is written to the bit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLengthCode {
    /// Elias gamma: `N` zero bits then the `N + 1` significant bits of the length.
    Gamma,
    /// `0` -> 0, `10`+4 bits, `110`+8 bits, `1110`+16 bits, `1111`+32 bits.
    #[default]
    Buckets,
    /// A plain field of `width` bits (1..=32).
    Fixed { width: u8 },
}

/// How the decoder tells a run apart from a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapePolicy {
    /// One more than the largest symbol in the stream, or the lowest free
    /// symbol when the largest is `u32::MAX`.
    #[default]
    MaxPlusOne,
    /// A caller-chosen symbol, checked against the data.
    Symbol { value: u32 },
    /// An out-of-band bit before every coded unit.
    FlagBit,
}

/// The escape actually used by one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    Symbol(u32),
    FlagBit,
}

/// Everything an entropy coder needs to interleave run tokens with literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCoding {
    pub escape: Escape,
    pub length_code: RunLengthCode,
}

//==================================================================================
// 2. Folding and Expansion
//==================================================================================

/// Folds `symbols` into a token stream.
pub fn fold(
    symbols: &[u32],
    threshold: u32,
    scope: RunScope,
    max_length: u32,
) -> Result<Vec<Token>, CodecError> {
    if threshold == 0 {
        return Err(CodecError::InvalidParameterError(
            "run threshold must be at least 1".to_string(),
        ));
    }
    if max_length < threshold {
        return Err(CodecError::InvalidParameterError(format!(
            "longest encodable run {} is shorter than the threshold {}",
            max_length, threshold
        )));
    }

    let mut tokens = Vec::with_capacity(symbols.len());
    let mut i = 0usize;
    while i < symbols.len() {
        let value = symbols[i];
        let run_end = symbols[i..]
            .iter()
            .position(|&s| s != value)
            .map_or(symbols.len(), |offset| i + offset);
        // Sample counts are bounded by u32 at the API boundary.
        let mut remaining = (run_end - i) as u64;

        if scope.admits(value) {
            while remaining >= threshold as u64 {
                let length = remaining.min(max_length as u64) as u32;
                tokens.push(Token::Run { value, length });
                remaining -= length as u64;
            }
        }
        tokens.extend(std::iter::repeat(Token::Literal(value)).take(remaining as usize));
        i = run_end;
    }
    Ok(tokens)
}

/// Expands a token stream, refusing to produce more or fewer than `expected` symbols.
pub fn expand(tokens: &[Token], expected: usize) -> Result<Vec<u32>, CodecError> {
    let mut symbols = Vec::with_capacity(expected);
    for token in tokens {
        match *token {
            Token::Literal(value) => symbols.push(value),
            Token::Run { value, length } => {
                let length = length as usize;
                if symbols.len() + length > expected {
                    return Err(CodecError::ConsistencyError(format!(
                        "run of {} overruns the declared total of {} symbols",
                        length, expected
                    )));
                }
                symbols.extend(std::iter::repeat(value).take(length));
            }
        }
        if symbols.len() > expected {
            return Err(CodecError::ConsistencyError(format!(
                "token stream exceeds the declared total of {} symbols",
                expected
            )));
        }
    }
    if symbols.len() != expected {
        return Err(CodecError::ConsistencyError(format!(
            "token stream expands to {} symbols, expected {}",
            symbols.len(),
            expected
        )));
    }
    Ok(symbols)
}

pub fn run_count(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .filter(|t| matches!(t, Token::Run { .. }))
        .count()
}

/// Symbols that appear in the token stream, literal or run value.
fn token_values(tokens: &[Token]) -> impl Iterator<Item = u32> + '_ {
    tokens.iter().map(|t| match *t {
        Token::Literal(value) | Token::Run { value, .. } => value,
    })
}

/// The lowest symbol absent from `tokens`. Used when `u32::MAX` is taken.
fn smallest_unused_symbol(tokens: &[Token]) -> Result<u32, CodecError> {
    let mut used: Vec<u32> = token_values(tokens).collect();
    used.sort_unstable();
    used.dedup();
    let mut candidate = 0u32;
    for &value in &used {
        if value != candidate {
            return Ok(candidate);
        }
        candidate = candidate.checked_add(1).ok_or_else(|| {
            CodecError::InvalidParameterError(
                "no free symbol left for the escape marker".to_string(),
            )
        })?;
    }
    Ok(candidate)
}

/// Turns the configured policy into a concrete escape for this token stream.
pub fn resolve_escape(policy: EscapePolicy, tokens: &[Token]) -> Result<Escape, CodecError> {
    match policy {
        EscapePolicy::FlagBit => Ok(Escape::FlagBit),
        EscapePolicy::MaxPlusOne => match token_values(tokens).max() {
            None => Ok(Escape::Symbol(0)),
            Some(max) => match max.checked_add(1) {
                Some(symbol) => Ok(Escape::Symbol(symbol)),
                // The header stores the marker, so any unused symbol decodes the same.
                None => smallest_unused_symbol(tokens).map(Escape::Symbol),
            },
        },
        EscapePolicy::Symbol { value } => {
            if token_values(tokens).any(|s| s == value) {
                Err(CodecError::InvalidParameterError(format!(
                    "escape symbol {} collides with a real symbol",
                    value
                )))
            } else {
                Ok(Escape::Symbol(value))
            }
        }
    }
}

//==================================================================================
// 3. Run Length Codes
//==================================================================================

impl RunLengthCode {
    pub fn validate(&self) -> Result<(), CodecError> {
        match *self {
            Self::Fixed { width } if !(1..=32).contains(&width) => {
                Err(CodecError::InvalidParameterError(format!(
                    "fixed run length width must be in 1..=32, got {}",
                    width
                )))
            }
            _ => Ok(()),
        }
    }

    /// The longest single run this code can carry.
    pub fn max_length(&self) -> u32 {
        match *self {
            Self::Fixed { width } if width < 32 => (1u32 << width) - 1,
            _ => u32::MAX,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::Gamma => 0,
            Self::Buckets => 1,
            Self::Fixed { .. } => 2,
        }
    }

    pub fn write(&self, writer: &mut BitWriter, length: u32) -> Result<(), CodecError> {
        match *self {
            Self::Gamma => {
                if length == 0 {
                    return Err(CodecError::InvalidParameterError(
                        "Elias gamma cannot code a zero length".to_string(),
                    ));
                }
                let significant = 32 - length.leading_zeros() as u8;
                writer.write_bits(0, significant - 1)?;
                writer.write_bits(length as u64, significant)
            }
            Self::Buckets => {
                let (prefix, prefix_len, width) = match length {
                    0 => return writer.write_bits(0, 1),
                    1..=0xF => (0b10, 2, 4),
                    0x10..=0xFF => (0b110, 3, 8),
                    0x100..=0xFFFF => (0b1110, 4, 16),
                    _ => (0b1111, 4, 32),
                };
                writer.write_bits(prefix, prefix_len)?;
                writer.write_bits(length as u64, width)
            }
            Self::Fixed { width } => {
                if length > self.max_length() {
                    return Err(CodecError::InvalidParameterError(format!(
                        "run length {} does not fit in {} bits",
                        length, width
                    )));
                }
                writer.write_bits(length as u64, width)
            }
        }
    }

    pub fn read(&self, reader: &mut BitReader) -> Result<u32, CodecError> {
        let value = match *self {
            Self::Gamma => {
                let mut zeros = 0u8;
                while !reader.read_bit()? {
                    zeros += 1;
                    if zeros > 31 {
                        return Err(CodecError::ConsistencyError(
                            "Elias gamma prefix longer than 31 bits".to_string(),
                        ));
                    }
                }
                (1u64 << zeros) | reader.read_bits(zeros)?
            }
            Self::Buckets => {
                let mut ones = 0u8;
                while ones < 4 && reader.read_bit()? {
                    ones += 1;
                }
                match ones {
                    0 => 0,
                    1 => reader.read_bits(4)?,
                    2 => reader.read_bits(8)?,
                    3 => reader.read_bits(16)?,
                    _ => reader.read_bits(32)?,
                }
            }
            Self::Fixed { width } => reader.read_bits(width)?,
        };
        // Every branch reads at most 32 significant bits.
        u32::try_from(value)
            .map_err(|_| CodecError::ConsistencyError(format!("run length {} overflows", value)))
    }
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
