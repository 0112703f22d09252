//! Canonical code construction from Shannon lengths.
//!
//! Each symbol gets `ceil(-log2(freq / total))` bits (at least one), computed as
//! the smallest `l` with `freq * 2^l >= total`. These lengths always satisfy the
//! Kraft inequality, so the canonical assignment below is prefix-free.

use std::collections::BTreeMap;

use super::Codeword;
use crate::error::CodecError;

/// Smallest `l >= 1` such that `freq * 2^l >= total`.
fn shannon_length(freq: u64, total: u64) -> u8 {
    let mut len = 1u8;
    while (freq as u128) << len < total as u128 {
        len += 1;
    }
    len
}

pub fn code_lengths(frequencies: &BTreeMap<u32, u64>) -> Result<BTreeMap<u32, u8>, CodecError> {
    let total: u64 = frequencies.values().sum();
    if frequencies.is_empty() || total == 0 {
        return Err(CodecError::InvalidParameterError(
            "cannot build a prefix code from an empty frequency table".to_string(),
        ));
    }
    frequencies
        .iter()
        .map(|(&symbol, &freq)| {
            if freq == 0 {
                return Err(CodecError::InvalidParameterError(format!(
                    "symbol {} has zero frequency",
                    symbol
                )));
            }
            Ok((symbol, shannon_length(freq, total)))
        })
        .collect()
}

/// Assigns canonical codes: sort by (length, symbol), count up from zero and
/// shift left whenever the length grows.
pub fn assign_codes(lengths: &BTreeMap<u32, u8>) -> Result<BTreeMap<u32, Codeword>, CodecError> {
    let mut order: Vec<(u8, u32)> = lengths.iter().map(|(&s, &l)| (l, s)).collect();
    order.sort_unstable();

    let mut codes = BTreeMap::new();
    let mut next = 0u64;
    let mut prev_len = order.first().map_or(0, |&(len, _)| len);
    for (i, &(len, symbol)) in order.iter().enumerate() {
        if len == 0 || len > 64 {
            return Err(CodecError::InvalidParameterError(format!(
                "code length {} for symbol {} is outside 1..=64",
                len, symbol
            )));
        }
        if i > 0 {
            next = (next + 1) << (len - prev_len);
        }
        codes.insert(symbol, Codeword { bits: next, len });
        prev_len = len;
    }
    Ok(codes)
}

pub fn build_canonical_codes(
    frequencies: &BTreeMap<u32, u64>,
) -> Result<BTreeMap<u32, Codeword>, CodecError> {
    assign_codes(&code_lengths(frequencies)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_lengths_are_exact() {
        assert_eq!(shannon_length(1, 2), 1);
        assert_eq!(shannon_length(1, 4), 2);
        assert_eq!(shannon_length(1, 5), 3);
        assert_eq!(shannon_length(5, 5), 1);
        assert_eq!(shannon_length(1, u32::MAX as u64), 32);
    }

    #[test]
    fn test_canonical_assignment() {
        // p = 1/2, 1/4, 1/8, 1/8 -> lengths 1, 2, 3, 3
        let freqs = BTreeMap::from([(9, 4u64), (3, 2), (5, 1), (1, 1)]);
        let codes = build_canonical_codes(&freqs).unwrap();
        assert_eq!(codes[&9], Codeword { bits: 0b0, len: 1 });
        assert_eq!(codes[&3], Codeword { bits: 0b10, len: 2 });
        assert_eq!(codes[&1], Codeword { bits: 0b110, len: 3 });
        assert_eq!(codes[&5], Codeword { bits: 0b111, len: 3 });
    }

    #[test]
    fn test_skewed_distribution_leaves_unused_codes() {
        let freqs = BTreeMap::from([(0, 90u64), (1, 7), (2, 3)]);
        let lengths = code_lengths(&freqs).unwrap();
        assert_eq!(lengths[&0], 1);
        assert_eq!(lengths[&1], 4);
        assert_eq!(lengths[&2], 6);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(
            build_canonical_codes(&BTreeMap::new()),
            Err(CodecError::InvalidParameterError(_))
        ));
    }
}
