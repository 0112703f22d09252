// In: src/bridge/tests.rs

//! End-to-end tests through the public bridge: text in, container, text out.

use super::*;
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::pipeline::artifact::CompressedGrid;
use crate::types::LayoutDescriptor;

/// Text -> container -> text, asserting the text survives byte for byte.
fn text_roundtrip(text: &str, config: &CodecConfig) -> Vec<u8> {
    let grid = parse_str(text).unwrap();
    let bytes = compress(grid.samples(), grid.layout(), config).unwrap();
    let (samples, layout) = decompress(&bytes).unwrap();
    assert_eq!(format_rows(&samples, &layout).unwrap(), text);
    bytes
}

#[test]
fn test_constant_grid_becomes_one_run() {
    let text = "5 5 5 5 5 5\n5 5 5 5 5 5\n";
    for name in CodecConfig::PROFILE_NAMES {
        let config = CodecConfig::profile(name).unwrap();
        let bytes = text_roundtrip(text, &config);
        let grid = CompressedGrid::from_bytes(&bytes).unwrap();
        assert_eq!(grid.first_value, 5);
        assert_eq!(grid.total_samples, 12);
        if config.run_folding.is_some() {
            assert_eq!(grid.run_folding.unwrap().run_count, 1, "{}", name);
        }
    }
}

#[test]
fn test_empty_input_is_header_only() {
    for name in CodecConfig::PROFILE_NAMES {
        let config = CodecConfig::profile(name).unwrap();
        let bytes = text_roundtrip("", &config);
        let stats = analyze(&bytes).unwrap();
        assert_eq!(stats.payload_size, 0);
        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.row_count, 0);
        assert_eq!(stats.header_size, bytes.len());
    }

    // Blank lines are rows of length zero and survive as such.
    text_roundtrip("\n\n\n", &CodecConfig::default());
}

#[test]
fn test_single_sample_has_no_symbols() {
    for name in CodecConfig::PROFILE_NAMES {
        let config = CodecConfig::profile(name).unwrap();
        let bytes = text_roundtrip("42\n", &config);
        let grid = CompressedGrid::from_bytes(&bytes).unwrap();
        assert_eq!(grid.first_value, 42);
        assert!(grid.payload.is_empty());
        assert!(grid.run_folding.is_none());
    }
}

#[test]
fn test_ragged_rows_keep_variable_layout() {
    let bytes = text_roundtrip("1 2 3\n4 5\n", &CodecConfig::default());
    let grid = CompressedGrid::from_bytes(&bytes).unwrap();
    assert_eq!(
        grid.layout.descriptor(),
        LayoutDescriptor::Variable(vec![3, 2])
    );
}

#[test]
fn test_corrupted_magic_is_a_format_error() {
    let grid = parse_str("1 2 3\n4 5\n").unwrap();
    let mut bytes = compress(grid.samples(), grid.layout(), &CodecConfig::default()).unwrap();
    bytes[1] ^= 0xFF;

    assert!(matches!(decompress(&bytes), Err(CodecError::FormatError(_))));
    assert!(matches!(analyze(&bytes), Err(CodecError::FormatError(_))));
    assert_eq!(detect_format(&bytes), None);
}

#[test]
fn test_profiles_pick_their_magic() {
    let grid = parse_str("1 2 3\n").unwrap();
    let rice = compress(grid.samples(), grid.layout(), &CodecConfig::golomb_rice_enhanced())
        .unwrap();
    let prefix = compress(grid.samples(), grid.layout(), &CodecConfig::canonical_prefix())
        .unwrap();
    assert_eq!(&rice[..4], RICE_MAGIC);
    assert_eq!(&prefix[..4], PREFIX_MAGIC);
}

#[test]
fn test_config_from_json_drives_compression() {
    let config = CodecConfig::from_json_str(
        r#"{ "predictor": "neighbor_2d", "coder": "golomb_rice", "run_folding": null }"#,
    )
    .unwrap();
    let text = "3 4 5 6\n4 5 6 7\n5 6 7 8\n";
    let bytes = text_roundtrip(text, &config);
    let stats = analyze(&bytes).unwrap();
    assert_eq!(stats.format, GridFormat::GolombRice);
    assert!(stats.plan_json.contains("\"run_folding\":null"));
}
