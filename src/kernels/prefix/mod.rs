//! This module contains the optimal/canonical prefix entropy coder.
//!
//! A two-phase kernel: the caller counts frequencies over every symbol the
//! stream will emit (literals, the escape marker and run values), builds a
//! `CodeTable`, and then streams tokens through it. The table is serialized
//! alongside the payload and is the only thing the decoder needs to rebuild the
//! decode tree.

pub mod canonical;
pub mod tree;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use super::bitio::{BitReader, BitWriter};
use super::leb128;
use super::rle::{Escape, RunCoding, Token};
use crate::error::CodecError;
use tree::DecodeTree;

//==================================================================================
// 1. Code Table
//==================================================================================

/// A single codeword: the low `len` bits of `bits`, sent most-significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codeword {
    pub bits: u64,
    pub len: u8,
}

/// How codeword lengths are derived from frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixConstruction {
    /// Minimum-redundancy merge tree.
    #[default]
    Heap,
    /// Shannon lengths with canonical code assignment.
    Canonical,
}

impl PrefixConstruction {
    pub fn id(self) -> u8 {
        match self {
            Self::Heap => 0,
            Self::Canonical => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, CodecError> {
        match id {
            0 => Ok(Self::Heap),
            1 => Ok(Self::Canonical),
            _ => Err(CodecError::FormatError(format!(
                "unknown prefix construction {}",
                id
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    pub construction: PrefixConstruction,
    codes: BTreeMap<u32, Codeword>,
}

impl CodeTable {
    pub fn build(
        frequencies: &BTreeMap<u32, u64>,
        construction: PrefixConstruction,
    ) -> Result<Self, CodecError> {
        let codes = match construction {
            PrefixConstruction::Heap => tree::build_heap_codes(frequencies)?,
            PrefixConstruction::Canonical => canonical::build_canonical_codes(frequencies)?,
        };
        Ok(Self { construction, codes })
    }

    /// A table with no entries, used when there is nothing to code.
    pub fn empty(construction: PrefixConstruction) -> Self {
        Self {
            construction,
            codes: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, symbol: u32) -> Option<Codeword> {
        self.codes.get(&symbol).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Codeword)> + '_ {
        self.codes.iter().map(|(&s, &c)| (s, c))
    }

    /// Sum of `freq * len` over the table, in bits.
    pub fn coded_bits(&self, frequencies: &BTreeMap<u32, u64>) -> u64 {
        frequencies
            .iter()
            .filter_map(|(s, &f)| self.codes.get(s).map(|c| f * c.len as u64))
            .sum()
    }

    /// Appends `construction u8, varint(entries), entries x {varint sym, len u8, code bytes}`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.push(self.construction.id());
        leb128::encode_one(self.codes.len() as u64, out)?;
        for (&symbol, code) in &self.codes {
            leb128::encode_one(symbol, out)?;
            out.push(code.len);
            let width = (code.len as usize).div_ceil(8);
            out.extend_from_slice(&code.bits.to_be_bytes()[8 - width..]);
        }
        Ok(())
    }

    pub fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mut byte = [0u8; 1];
        cursor
            .read_exact(&mut byte)
            .map_err(|_| CodecError::end_of_stream("prefix construction"))?;
        let construction = PrefixConstruction::from_id(byte[0])?;
        let entries = leb128::decode_usize(cursor)?;

        let mut codes = BTreeMap::new();
        for _ in 0..entries {
            let symbol: u32 = leb128::decode_one(cursor)?;
            cursor
                .read_exact(&mut byte)
                .map_err(|_| CodecError::end_of_stream("code length"))?;
            let len = byte[0];
            if len == 0 || len > 64 {
                return Err(CodecError::FormatError(format!(
                    "code length {} for symbol {} is outside 1..=64",
                    len, symbol
                )));
            }
            let width = (len as usize).div_ceil(8);
            let mut raw = [0u8; 8];
            cursor
                .read_exact(&mut raw[8 - width..])
                .map_err(|_| CodecError::end_of_stream("code bits"))?;
            let bits = u64::from_be_bytes(raw);
            if len < 64 && bits >> len != 0 {
                return Err(CodecError::FormatError(format!(
                    "code for symbol {} has bits beyond its length {}",
                    symbol, len
                )));
            }
            if codes.insert(symbol, Codeword { bits, len }).is_some() {
                return Err(CodecError::FormatError(format!(
                    "symbol {} appears twice in the code table",
                    symbol
                )));
            }
        }
        Ok(Self { construction, codes })
    }
}

//==================================================================================
// 2. Token Streaming
//==================================================================================

/// Counts every symbol the coder will emit for `tokens`.
pub fn symbol_frequencies(tokens: &[Token], runs: Option<&RunCoding>) -> BTreeMap<u32, u64> {
    let escape = runs.and_then(|r| match r.escape {
        Escape::Symbol(s) => Some(s),
        Escape::FlagBit => None,
    });
    let mut frequencies = BTreeMap::new();
    for token in tokens {
        match *token {
            Token::Literal(value) => *frequencies.entry(value).or_insert(0) += 1,
            Token::Run { value, .. } => {
                if let Some(esc) = escape {
                    *frequencies.entry(esc).or_insert(0) += 1;
                }
                *frequencies.entry(value).or_insert(0) += 1;
            }
        }
    }
    frequencies
}

fn write_symbol(writer: &mut BitWriter, table: &CodeTable, symbol: u32) -> Result<(), CodecError> {
    let code = table.get(symbol).ok_or_else(|| {
        CodecError::InternalError(format!("symbol {} has no entry in the code table", symbol))
    })?;
    writer.write_bits(code.bits, code.len)
}

pub fn encode_tokens(
    tokens: &[Token],
    table: &CodeTable,
    runs: Option<&RunCoding>,
) -> Result<Vec<u8>, CodecError> {
    let mut writer = BitWriter::new();
    for token in tokens {
        match (*token, runs) {
            (Token::Literal(value), Some(RunCoding { escape: Escape::FlagBit, .. })) => {
                writer.write_bit(false);
                write_symbol(&mut writer, table, value)?;
            }
            (Token::Literal(value), _) => write_symbol(&mut writer, table, value)?,
            (Token::Run { value, length }, Some(coding)) => {
                match coding.escape {
                    Escape::FlagBit => writer.write_bit(true),
                    Escape::Symbol(esc) => write_symbol(&mut writer, table, esc)?,
                }
                write_symbol(&mut writer, table, value)?;
                coding.length_code.write(&mut writer, length)?;
            }
            (Token::Run { .. }, None) => {
                return Err(CodecError::InternalError(
                    "run token without run coding parameters".to_string(),
                ))
            }
        }
    }
    Ok(writer.into_bytes())
}

/// Decodes tokens until they expand to exactly `expected_symbols` symbols.
pub fn decode_tokens(
    payload: &[u8],
    table: &CodeTable,
    runs: Option<&RunCoding>,
    expected_symbols: usize,
) -> Result<Vec<Token>, CodecError> {
    if expected_symbols == 0 {
        return Ok(Vec::new());
    }
    if table.is_empty() {
        return Err(CodecError::InvalidParameterError(
            "empty code table but symbols were expected".to_string(),
        ));
    }
    let tree = DecodeTree::from_codes(&table.codes)?;
    let mut reader = BitReader::new(payload);
    let mut tokens = Vec::new();
    let mut produced = 0usize;

    while produced < expected_symbols {
        let is_run = match runs {
            Some(RunCoding { escape: Escape::FlagBit, .. }) => reader.read_bit()?,
            _ => false,
        };
        let mut symbol = tree.decode_with(|| reader.read_bit())?;
        let token = match runs {
            Some(coding) if is_run || coding.escape == Escape::Symbol(symbol) => {
                if !is_run {
                    symbol = tree.decode_with(|| reader.read_bit())?;
                }
                let length = coding.length_code.read(&mut reader)?;
                Token::Run {
                    value: symbol,
                    length,
                }
            }
            _ => Token::Literal(symbol),
        };
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

    // Anything left must be the zero padding of the final byte.
    if reader.bits_remaining() >= 8 {
        return Err(CodecError::FormatError(
            "trailing bytes after the prefix-coded payload".to_string(),
        ));
    }
    Ok(tokens)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::rle::RunLengthCode;

    fn roundtrip(tokens: &[Token], runs: Option<&RunCoding>, construction: PrefixConstruction) {
        let freqs = symbol_frequencies(tokens, runs);
        let table = CodeTable::build(&freqs, construction).unwrap();

        let mut side = Vec::new();
        table.write_to(&mut side).unwrap();
        let restored = CodeTable::read_from(&mut Cursor::new(&side[..])).unwrap();
        assert_eq!(restored, table);

        let payload = encode_tokens(tokens, &table, runs).unwrap();
        let expected: usize = tokens
            .iter()
            .map(|t| match t {
                Token::Literal(_) => 1,
                Token::Run { length, .. } => *length as usize,
            })
            .sum();
        let decoded = decode_tokens(&payload, &restored, runs, expected).unwrap();
        assert_eq!(decoded, tokens);
    }

    #[test]
    fn test_literal_stream_roundtrip() {
        let tokens: Vec<Token> = [0, 1, 0, 2, 0, 0, 3, 1]
            .iter()
            .map(|&v| Token::Literal(v))
            .collect();
        roundtrip(&tokens, None, PrefixConstruction::Heap);
        roundtrip(&tokens, None, PrefixConstruction::Canonical);
    }

    #[test]
    fn test_escape_symbol_stream_roundtrip() {
        let coding = RunCoding {
            escape: Escape::Symbol(4),
            length_code: RunLengthCode::Buckets,
        };
        let tokens = vec![
            Token::Literal(1),
            Token::Run { value: 0, length: 12 },
            Token::Literal(3),
            Token::Run { value: 3, length: 300 },
        ];
        roundtrip(&tokens, Some(&coding), PrefixConstruction::Heap);
        roundtrip(&tokens, Some(&coding), PrefixConstruction::Canonical);
    }

    #[test]
    fn test_flag_bit_stream_roundtrip() {
        let coding = RunCoding {
            escape: Escape::FlagBit,
            length_code: RunLengthCode::Gamma,
        };
        let tokens = vec![
            Token::Run { value: u32::MAX, length: 5 },
            Token::Literal(u32::MAX),
            Token::Literal(7),
        ];
        roundtrip(&tokens, Some(&coding), PrefixConstruction::Heap);
    }

    #[test]
    fn test_escape_is_counted_in_frequencies() {
        let coding = RunCoding {
            escape: Escape::Symbol(9),
            length_code: RunLengthCode::Gamma,
        };
        let tokens = vec![
            Token::Run { value: 0, length: 4 },
            Token::Run { value: 0, length: 6 },
        ];
        let freqs = symbol_frequencies(&tokens, Some(&coding));
        assert_eq!(freqs, BTreeMap::from([(0, 2), (9, 2)]));
    }

    #[test]
    fn test_average_length_within_one_bit_of_entropy() {
        let freqs = BTreeMap::from([(0u32, 60u64), (1, 20), (2, 10), (3, 6), (4, 4)]);
        let total: u64 = freqs.values().sum();
        let entropy: f64 = freqs
            .values()
            .map(|&f| {
                let p = f as f64 / total as f64;
                -p * p.log2()
            })
            .sum();
        for construction in [PrefixConstruction::Heap, PrefixConstruction::Canonical] {
            let table = CodeTable::build(&freqs, construction).unwrap();
            let avg = table.coded_bits(&freqs) as f64 / total as f64;
            assert!(avg <= entropy + 1.0, "{:?}: {} > {}", construction, avg, entropy + 1.0);
        }
    }

    #[test]
    fn test_empty_table_with_expected_symbols() {
        let table = CodeTable::empty(PrefixConstruction::Heap);
        assert!(matches!(
            decode_tokens(&[], &table, None, 3),
            Err(CodecError::InvalidParameterError(_))
        ));
        assert!(decode_tokens(&[], &table, None, 0).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_payload() {
        let tokens: Vec<Token> = (0..40).map(|v| Token::Literal(v % 5)).collect();
        let table = CodeTable::build(&symbol_frequencies(&tokens, None), PrefixConstruction::Heap)
            .unwrap();
        let payload = encode_tokens(&tokens, &table, None).unwrap();
        let result = decode_tokens(&payload[..payload.len() / 2], &table, None, 40);
        assert!(matches!(result, Err(CodecError::TruncationError(_))));
    }

    #[test]
    fn test_table_with_stray_high_bits_rejected() {
        // construction 0, one entry: symbol 5, len 2, code byte 0b0000_0111
        let side = [0u8, 1, 5, 2, 0b0000_0111];
        assert!(matches!(
            CodeTable::read_from(&mut Cursor::new(&side[..])),
            Err(CodecError::FormatError(_))
        ));
    }
}
