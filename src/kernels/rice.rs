//! This module contains the adaptive Golomb-Rice entropy coder.
//!
//! The token stream is cut into blocks of `block_size` coded units. Each block
//! carries its own Rice parameter `k`, unit count and byte length, and its bits
//! start on a fresh byte, so any block can be decoded on its own. A value `z`
//! is written as `z >> k` one-bits, a zero terminator, then the low `k` bits.

use serde::{Deserialize, Serialize};

use super::bitio::{BitReader, BitWriter};
use super::rle::{Escape, RunCoding, Token};
use crate::error::CodecError;

/// The largest parameter the container can describe.
pub const MAX_RICE_K: u8 = 31;

//==================================================================================
// 1. Parameter Selection
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiceParameter {
    /// Derived per block from the mean coded value.
    #[default]
    Adaptive,
    Fixed { k: u8 },
}

impl RiceParameter {
    pub fn id(&self) -> u8 {
        match self {
            Self::Adaptive => 0,
            Self::Fixed { .. } => 1,
        }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        match *self {
            Self::Fixed { k } if k > MAX_RICE_K => Err(CodecError::InvalidParameterError(
                format!("Rice parameter k must be at most {}, got {}", MAX_RICE_K, k),
            )),
            _ => Ok(()),
        }
    }
}

/// `max(0, round(log2(mean + 1)))`, clamped to [`MAX_RICE_K`].
pub fn choose_k(values: &[u32]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|&v| v as u64).sum();
    let mean = sum as f64 / values.len() as f64;
    let k = (mean + 1.0).log2().round().max(0.0);
    (k as u8).min(MAX_RICE_K)
}

/// The values a token contributes to its block's statistics and bit stream.
fn coded_values(token: &Token, runs: Option<&RunCoding>) -> ([u32; 2], usize) {
    match (*token, runs.map(|r| r.escape)) {
        (Token::Literal(v), _) => ([v, 0], 1),
        (Token::Run { value, .. }, Some(Escape::Symbol(esc))) => ([esc, value], 2),
        (Token::Run { value, .. }, _) => ([value, 0], 1),
    }
}

//==================================================================================
// 2. Single-Value Coding
//==================================================================================

pub fn write_rice(writer: &mut BitWriter, value: u32, k: u8) -> Result<(), CodecError> {
    writer.write_unary((value >> k) as u64);
    let mask = (1u64 << k) - 1;
    writer.write_bits(value as u64 & mask, k)
}

pub fn read_rice(reader: &mut BitReader, k: u8) -> Result<u32, CodecError> {
    let quotient = reader.read_unary((u32::MAX >> k) as u64)?;
    let remainder = reader.read_bits(k)?;
    u32::try_from((quotient << k) | remainder)
        .map_err(|_| CodecError::ConsistencyError("Rice value overflows u32".to_string()))
}

//==================================================================================
// 3. Block Streaming
//==================================================================================

/// Side-table entry for one byte-aligned block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiceBlock {
    pub k: u8,
    pub unit_count: usize,
    pub byte_len: usize,
}

/// Encodes `tokens` into blocks. `block_size = 0` puts everything in one block.
pub fn encode_tokens(
    tokens: &[Token],
    runs: Option<&RunCoding>,
    parameter: RiceParameter,
    block_size: usize,
) -> Result<(Vec<RiceBlock>, Vec<u8>), CodecError> {
    parameter.validate()?;
    let chunk = if block_size == 0 {
        tokens.len().max(1)
    } else {
        block_size
    };

    let mut blocks = Vec::with_capacity(tokens.len().div_ceil(chunk));
    let mut payload = Vec::new();

    for block_tokens in tokens.chunks(chunk) {
        let k = match parameter {
            RiceParameter::Fixed { k } => k,
            RiceParameter::Adaptive => {
                let values: Vec<u32> = block_tokens
                    .iter()
                    .flat_map(|t| {
                        let (vals, n) = coded_values(t, runs);
                        vals.into_iter().take(n)
                    })
                    .collect();
                choose_k(&values)
            }
        };

        let mut writer = BitWriter::new();
        for token in block_tokens {
            if let Some(RunCoding { escape: Escape::FlagBit, .. }) = runs {
                writer.write_bit(matches!(token, Token::Run { .. }));
            }
            let (vals, n) = coded_values(token, runs);
            for &v in &vals[..n] {
                write_rice(&mut writer, v, k)?;
            }
            if let Token::Run { length, .. } = *token {
                let coding = runs.ok_or_else(|| {
                    CodecError::InternalError(
                        "run token without run coding parameters".to_string(),
                    )
                })?;
                coding.length_code.write(&mut writer, length)?;
            }
        }
        let bytes = writer.into_bytes();
        blocks.push(RiceBlock {
            k,
            unit_count: block_tokens.len(),
            byte_len: bytes.len(),
        });
        payload.extend_from_slice(&bytes);
    }
    Ok((blocks, payload))
}

/// Decodes a single block's units from its own byte slice.
pub fn decode_block(
    bytes: &[u8],
    block: &RiceBlock,
    runs: Option<&RunCoding>,
) -> Result<Vec<Token>, CodecError> {
    if block.k > MAX_RICE_K {
        return Err(CodecError::InvalidParameterError(format!(
            "Rice parameter k must be at most {}, got {}",
            MAX_RICE_K, block.k
        )));
    }
    let mut reader = BitReader::new(bytes);
    let mut tokens = Vec::with_capacity(block.unit_count.min(bytes.len() * 8));

    for _ in 0..block.unit_count {
        let token = match runs {
            None => Token::Literal(read_rice(&mut reader, block.k)?),
            Some(coding) => {
                let flagged = match coding.escape {
                    Escape::FlagBit => reader.read_bit()?,
                    Escape::Symbol(_) => false,
                };
                let first = read_rice(&mut reader, block.k)?;
                let is_run = flagged || coding.escape == Escape::Symbol(first);
                if is_run {
                    let value = if flagged {
                        first
                    } else {
                        read_rice(&mut reader, block.k)?
                    };
                    let length = coding.length_code.read(&mut reader)?;
                    Token::Run { value, length }
                } else {
                    Token::Literal(first)
                }
            }
        };
        tokens.push(token);
    }

    if reader.bits_remaining() >= 8 {
        return Err(CodecError::FormatError(
            "Rice block is longer than its declared units".to_string(),
        ));
    }
    Ok(tokens)
}

/// Decodes every block in order and checks the symbol total.
pub fn decode_tokens(
    payload: &[u8],
    blocks: &[RiceBlock],
    runs: Option<&RunCoding>,
    expected_symbols: usize,
) -> Result<Vec<Token>, CodecError> {
    let mut tokens = Vec::new();
    let mut offset = 0usize;
    let mut produced = 0usize;

    for block in blocks {
        let end = offset
            .checked_add(block.byte_len)
            .filter(|&end| end <= payload.len())
            .ok_or_else(|| CodecError::end_of_stream("Rice block"))?;
        for token in decode_block(&payload[offset..end], block, runs)? {
            produced += match token {
                Token::Literal(_) => 1,
                Token::Run { length, .. } => length as usize,
            };
            if produced > expected_symbols {
                return Err(CodecError::ConsistencyError(format!(
                    "run overruns the declared total of {} symbols",
                    expected_symbols
                )));
            }
            tokens.push(token);
        }
        offset = end;
    }

    if offset != payload.len() {
        return Err(CodecError::FormatError(
            "trailing bytes after the last Rice block".to_string(),
        ));
    }
    if produced != expected_symbols {
        return Err(CodecError::ConsistencyError(format!(
            "Rice blocks decode to {} symbols, expected {}",
            produced, expected_symbols
        )));
    }
    Ok(tokens)
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
