//! Property-based tests for the grid codec.
//!
//! These tests verify that codec properties hold across a wide range of inputs:
//! - compress/decompress restores samples and row layout for every profile
//! - zigzag mapping is a bijection
//! - run folding expands back to the original symbols
//! - generated code tables are prefix-free and within one bit of the entropy
//! - bit packing reads back exactly what was written
//!
//! Run with: cargo test --test proptest_roundtrip

use std::collections::BTreeMap;

use proptest::prelude::*;

use gridcodec::config::{
    EscapePolicy, PredictorMode, PrefixConstruction, RunFoldingConfig, RunLengthCode, RunScope,
};
use gridcodec::kernels::bitio::{BitReader, BitWriter};
use gridcodec::kernels::prefix::CodeTable;
use gridcodec::kernels::{rle, zigzag};
use gridcodec::{compress, decompress, CodecConfig, RowLayout};

/// Strategy for row lengths, including empty rows.
fn row_lengths_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..24, 0..12)
}

/// Strategy for exactly `total` samples made of runs of extreme values.
fn extreme_runs_strategy(total: usize) -> impl Strategy<Value = Vec<i32>> {
    let value = prop::sample::select(vec![i32::MIN, i32::MAX, 0, -1, 1]);
    prop::collection::vec((value, 1usize..12), 0..=total).prop_map(move |pieces| {
        let mut samples: Vec<i32> = pieces
            .into_iter()
            .flat_map(|(v, n)| std::iter::repeat(v).take(n))
            .collect();
        samples.resize(total, i32::MIN);
        samples
    })
}

/// Strategy for a grid: small values with repeats, the full i32 range, or
/// extreme values in runs.
fn grid_strategy() -> impl Strategy<Value = (Vec<i32>, RowLayout)> {
    row_lengths_strategy().prop_flat_map(|lengths| {
        let total: usize = lengths.iter().sum();
        let values = prop_oneof![
            prop::collection::vec(-3i32..=3, total),
            prop::collection::vec(any::<i32>(), total),
            extreme_runs_strategy(total),
        ];
        (values, Just(RowLayout::from_lengths(lengths)))
    })
}

fn config_strategy() -> impl Strategy<Value = CodecConfig> {
    let profiles = prop::sample::select(CodecConfig::PROFILE_NAMES.to_vec())
        .prop_map(|name| CodecConfig::profile(name).unwrap());
    let folding = (
        1u32..8,
        prop_oneof![Just(RunScope::AnySymbol), Just(RunScope::ZerosOnly)],
        prop_oneof![
            Just(RunLengthCode::Gamma),
            Just(RunLengthCode::Buckets),
            // Three bits already hold the largest generated threshold.
            (3u8..=32).prop_map(|width| RunLengthCode::Fixed { width }),
        ],
        prop_oneof![Just(EscapePolicy::MaxPlusOne), Just(EscapePolicy::FlagBit)],
    )
        .prop_map(|(threshold, scope, length_code, escape)| RunFoldingConfig {
            threshold,
            scope,
            length_code,
            escape,
        });
    let predictor = prop_oneof![
        Just(PredictorMode::FirstOrderDelta),
        Just(PredictorMode::SecondOrderDelta),
        Just(PredictorMode::Neighbor2d),
    ];
    (profiles, predictor, prop::option::of(folding)).prop_map(
        |(mut config, predictor, run_folding)| {
            config.predictor = predictor;
            config.run_folding = run_folding;
            config
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    /// Property: decompress(compress(x)) == x, layout included.
    #[test]
    fn prop_codec_roundtrip((samples, layout) in grid_strategy(), config in config_strategy()) {
        let bytes = compress(&samples, &layout, &config).unwrap();
        let (decoded, decoded_layout) = decompress(&bytes).unwrap();
        prop_assert_eq!(decoded, samples);
        prop_assert_eq!(decoded_layout, layout);
    }

    /// Property: zigzag maps i32 onto u32 one-to-one.
    #[test]
    fn prop_zigzag_bijection(n in any::<i32>(), z in any::<u32>()) {
        prop_assert_eq!(zigzag::zigzag_decode(zigzag::zigzag_encode(n)), n);
        prop_assert_eq!(zigzag::zigzag_encode(zigzag::zigzag_decode(z)), z);
    }

    /// Property: folding with any threshold expands back to the input.
    #[test]
    fn prop_fold_expand_roundtrip(
        symbols in prop::collection::vec(0u32..4, 0..300),
        threshold in 1u32..10,
        zeros_only in any::<bool>(),
    ) {
        let scope = if zeros_only { RunScope::ZerosOnly } else { RunScope::AnySymbol };
        let tokens = rle::fold(&symbols, threshold, scope, u32::MAX).unwrap();
        prop_assert_eq!(rle::expand(&tokens, symbols.len()).unwrap(), symbols);
    }

    /// Property: code tables are prefix-free and average length <= entropy + 1.
    #[test]
    fn prop_code_table_bounds(
        freqs in prop::collection::btree_map(any::<u32>(), 1u64..10_000, 1..64),
        canonical in any::<bool>(),
    ) {
        let construction = if canonical {
            PrefixConstruction::Canonical
        } else {
            PrefixConstruction::Heap
        };
        let table = CodeTable::build(&freqs, construction).unwrap();
        prop_assert_eq!(table.len(), freqs.len());

        let codes: Vec<_> = table.iter().collect();
        for (i, &(_, a)) in codes.iter().enumerate() {
            for &(_, b) in &codes[i + 1..] {
                let shorter = a.len.min(b.len);
                prop_assert!(
                    a.bits >> (a.len - shorter) != b.bits >> (b.len - shorter),
                    "codes {:?} and {:?} share a prefix", a, b
                );
            }
        }

        let total: u64 = freqs.values().sum();
        let entropy: f64 = freqs
            .values()
            .map(|&f| {
                let p = f as f64 / total as f64;
                -p * p.log2()
            })
            .sum();
        let average = table.coded_bits(&freqs) as f64 / total as f64;
        prop_assert!(average <= entropy + 1.0 + 1e-9, "avg {} entropy {}", average, entropy);
    }

    /// Property: packed bits occupy ceil(bits / 8) bytes and read back exactly.
    #[test]
    fn prop_bit_packing_exact(fields in prop::collection::vec((any::<u64>(), 1u8..=64), 0..50)) {
        let fields: Vec<(u64, u8)> = fields
            .into_iter()
            .map(|(v, n)| (if n == 64 { v } else { v & ((1u64 << n) - 1) }, n))
            .collect();
        let total_bits: usize = fields.iter().map(|&(_, n)| n as usize).sum();

        let mut writer = BitWriter::new();
        for &(value, count) in &fields {
            writer.write_bits(value, count).unwrap();
        }
        let bytes = writer.into_bytes();
        prop_assert_eq!(bytes.len(), total_bits.div_ceil(8));

        let mut reader = BitReader::new(&bytes);
        for &(value, count) in &fields {
            prop_assert_eq!(reader.read_bits(count).unwrap(), value);
        }
        prop_assert!(reader.bits_remaining() < 8);
        let pad = (8 - total_bits % 8) % 8;
        if pad > 0 {
            prop_assert_eq!(reader.read_bits(pad as u8).unwrap(), 0);
        }
    }
}

#[test]
fn test_single_symbol_gets_one_bit_code() {
    let freqs = BTreeMap::from([(7u32, 1u64)]);
    let table = CodeTable::build(&freqs, PrefixConstruction::Heap).unwrap();
    assert_eq!(table.get(7).unwrap().len, 1);
}
