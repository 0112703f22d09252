//! Defines the self-describing on-disk format for a compressed grid.
//! This module is the single source of truth for serialization, deserialization,
//! and metadata peeking of the container.
//!
//! Layout (fixed fields little-endian, `varint` = unsigned LEB128):
//! magic(4) | total_samples u32 | first_value i32 | row layout | transform |
//! run folding side table | coder side table | payload

use std::io::{Cursor, Read};

use crate::bridge::format::GridFormat;
use crate::error::CodecError;
use crate::kernels::leb128;
use crate::kernels::neighbor;
use crate::kernels::prefix::CodeTable;
use crate::kernels::rice::{RiceBlock, MAX_RICE_K};
use crate::kernels::rle::{Escape, EscapePolicy, RunLengthCode, RunScope};
use crate::pipeline::models::{
    CoderDescriptor, PlanSummary, RiceKMode, RunFoldDescriptor, TransformDescriptor,
};
use crate::types::RowLayout;

//==================================================================================
// Format Constants
//==================================================================================
/// The size of the fixed-width prefix: magic(4) + total_samples(4) + first_value(4).
const FIXED_PREFIX_SIZE: usize = 12;

const TRANSFORM_DELTA1: u8 = 0;
const TRANSFORM_DELTA2: u8 = 1;
const TRANSFORM_NEIGHBOR: u8 = 2;

const ESCAPE_MAX_PLUS_ONE: u8 = 0;
const ESCAPE_SYMBOL: u8 = 1;
const ESCAPE_FLAG_BIT: u8 = 2;

//==================================================================================
// Public Structs
//==================================================================================

/// Metadata extracted from a container header without decoding the payload.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HeaderInfo {
    pub format: GridFormat,
    pub total_samples: u32,
    pub first_value: i32,
    pub row_count: usize,
    /// The compression plan digest as a UTF-8 JSON string.
    pub plan_json: String,
    /// The size of everything before the payload in bytes.
    pub header_size: usize,
    pub payload_size: usize,
}

/// A fully parsed container held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedGrid {
    pub total_samples: u32,
    pub first_value: i32,
    pub layout: RowLayout,
    pub transform: TransformDescriptor,
    pub run_folding: Option<RunFoldDescriptor>,
    pub coder: CoderDescriptor,
    pub payload: Vec<u8>,
}

//==================================================================================
// Core Implementation
//==================================================================================

impl CompressedGrid {
    /// The variant is implied by the coder side table.
    pub fn format(&self) -> GridFormat {
        match self.coder {
            CoderDescriptor::GolombRice { .. } => GridFormat::GolombRice,
            CoderDescriptor::Prefix(_) => GridFormat::Prefix,
        }
    }

    pub fn plan_summary(&self) -> PlanSummary {
        PlanSummary::describe(&self.transform, self.run_folding.as_ref(), &self.coder)
    }

    /// Serializes the container into its canonical byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(FIXED_PREFIX_SIZE + 16 + self.payload.len());

        buf.extend_from_slice(self.format().magic());
        buf.extend_from_slice(&self.total_samples.to_le_bytes());
        buf.extend_from_slice(&self.first_value.to_le_bytes());

        self.layout.write_to(&mut buf)?;
        write_transform(&mut buf, &self.transform, self.layout.row_count())?;
        write_run_folding(&mut buf, self.run_folding.as_ref())?;
        write_coder(&mut buf, &self.coder)?;

        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Deserializes a full byte slice, including the payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (mut grid, header_size) = parse_header(bytes)?;
        let payload = &bytes[header_size..];

        // Rice blocks declare their byte lengths, so the payload size is known exactly.
        if let CoderDescriptor::GolombRice { blocks, .. } = &grid.coder {
            let declared = blocks
                .iter()
                .try_fold(0usize, |acc, b| acc.checked_add(b.byte_len))
                .ok_or_else(|| {
                    CodecError::FormatError("Rice block lengths overflow".to_string())
                })?;
            if payload.len() < declared {
                return Err(CodecError::end_of_stream("Rice payload"));
            }
            if payload.len() > declared {
                return Err(CodecError::FormatError(format!(
                    "{} trailing bytes after the declared payload",
                    payload.len() - declared
                )));
            }
        }

        grid.payload = payload.to_vec();
        Ok(grid)
    }

    /// Parses the header only and reports sizes and the plan digest.
    pub fn peek_info(bytes: &[u8]) -> Result<HeaderInfo, CodecError> {
        let (grid, header_size) = parse_header(bytes)?;
        Ok(HeaderInfo {
            format: grid.format(),
            total_samples: grid.total_samples,
            first_value: grid.first_value,
            row_count: grid.layout.row_count(),
            plan_json: grid.plan_summary().to_json()?,
            header_size,
            payload_size: bytes.len() - header_size,
        })
    }
}

//==================================================================================
// Private Helpers: header parsing
//==================================================================================

/// Parses everything up to the payload. The returned grid has an empty payload.
fn parse_header(bytes: &[u8]) -> Result<(CompressedGrid, usize), CodecError> {
    let magic = bytes.get(..4).ok_or_else(|| {
        CodecError::FormatError(format!(
            "container is too small to hold a magic number: {} bytes",
            bytes.len()
        ))
    })?;
    let format = GridFormat::from_magic(magic)?;

    if bytes.len() < FIXED_PREFIX_SIZE {
        return Err(CodecError::FormatError(format!(
            "header too short. Minimum size: {}, got: {}",
            FIXED_PREFIX_SIZE,
            bytes.len()
        )));
    }

    let mut cursor = Cursor::new(bytes);
    cursor.set_position(4);
    let mut u32_buf = [0u8; 4];
    read_exact(&mut cursor, &mut u32_buf, "sample count")?;
    let total_samples = u32::from_le_bytes(u32_buf);
    read_exact(&mut cursor, &mut u32_buf, "first value")?;
    let first_value = i32::from_le_bytes(u32_buf);

    let layout = RowLayout::read_from(&mut cursor, total_samples as usize)?;

    let transform = read_transform(&mut cursor, layout.row_count())?;
    let run_folding = read_run_folding(&mut cursor)?;
    let coder = read_coder(&mut cursor, format)?;

    let header_size = cursor.position() as usize;
    Ok((
        CompressedGrid {
            total_samples,
            first_value,
            layout,
            transform,
            run_folding,
            coder,
            payload: Vec::new(),
        },
        header_size,
    ))
}

fn read_exact(cursor: &mut Cursor<&[u8]>, buf: &mut [u8], what: &str) -> Result<(), CodecError> {
    cursor
        .read_exact(buf)
        .map_err(|_| CodecError::end_of_stream(what))
}

fn read_u8(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u8, CodecError> {
    let mut byte = [0u8; 1];
    read_exact(cursor, &mut byte, what)?;
    Ok(byte[0])
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor.get_ref().len() - cursor.position() as usize
}

fn read_transform(
    cursor: &mut Cursor<&[u8]>,
    row_count: usize,
) -> Result<TransformDescriptor, CodecError> {
    match read_u8(cursor, "transform mode")? {
        TRANSFORM_DELTA1 => Ok(TransformDescriptor::Delta { passes: 1 }),
        TRANSFORM_DELTA2 => Ok(TransformDescriptor::Delta { passes: 2 }),
        TRANSFORM_NEIGHBOR => {
            let id_bytes = row_count.div_ceil(4);
            if remaining(cursor) < id_bytes {
                return Err(CodecError::end_of_stream("predictor ids"));
            }
            let mut packed = vec![0u8; id_bytes];
            read_exact(cursor, &mut packed, "predictor ids")?;
            Ok(TransformDescriptor::Neighbor {
                predictors: neighbor::unpack_ids(&packed, row_count)?,
            })
        }
        other => Err(CodecError::FormatError(format!(
            "unknown transform mode {}",
            other
        ))),
    }
}

fn read_run_folding(
    cursor: &mut Cursor<&[u8]>,
) -> Result<Option<RunFoldDescriptor>, CodecError> {
    match read_u8(cursor, "run folding flag")? {
        0 => Ok(None),
        1 => {
            let threshold: u32 = leb128::decode_one(cursor)?;
            if threshold == 0 {
                return Err(CodecError::FormatError(
                    "run folding threshold of 0 in header".to_string(),
                ));
            }
            let scope = RunScope::from_id(read_u8(cursor, "run scope")?)?;
            let length_code = match read_u8(cursor, "run length code")? {
                0 => RunLengthCode::Gamma,
                1 => RunLengthCode::Buckets,
                2 => {
                    let width = read_u8(cursor, "run length width")?;
                    let code = RunLengthCode::Fixed { width };
                    code.validate()
                        .map_err(|e| CodecError::FormatError(e.to_string()))?;
                    code
                }
                other => {
                    return Err(CodecError::FormatError(format!(
                        "unknown run length code {}",
                        other
                    )))
                }
            };
            let (escape_policy, escape) = match read_u8(cursor, "escape policy")? {
                ESCAPE_MAX_PLUS_ONE => {
                    let symbol: u32 = leb128::decode_one(cursor)?;
                    (EscapePolicy::MaxPlusOne, Escape::Symbol(symbol))
                }
                ESCAPE_SYMBOL => {
                    let value: u32 = leb128::decode_one(cursor)?;
                    (EscapePolicy::Symbol { value }, Escape::Symbol(value))
                }
                ESCAPE_FLAG_BIT => (EscapePolicy::FlagBit, Escape::FlagBit),
                other => {
                    return Err(CodecError::FormatError(format!(
                        "unknown escape policy {}",
                        other
                    )))
                }
            };
            let run_count = leb128::decode_usize(cursor)?;
            Ok(Some(RunFoldDescriptor {
                threshold,
                scope,
                length_code,
                escape_policy,
                escape,
                run_count,
            }))
        }
        other => Err(CodecError::FormatError(format!(
            "unknown run folding flag {}",
            other
        ))),
    }
}

fn read_coder(
    cursor: &mut Cursor<&[u8]>,
    format: GridFormat,
) -> Result<CoderDescriptor, CodecError> {
    match format {
        GridFormat::Prefix => Ok(CoderDescriptor::Prefix(CodeTable::read_from(cursor)?)),
        GridFormat::GolombRice => {
            let k_mode = RiceKMode::from_id(read_u8(cursor, "Rice k mode")?)?;
            let block_count = leb128::decode_usize(cursor)?;
            let mut blocks = Vec::with_capacity(block_count.min(remaining(cursor)));
            for _ in 0..block_count {
                let k = read_u8(cursor, "Rice block k")?;
                if k > MAX_RICE_K {
                    return Err(CodecError::FormatError(format!(
                        "Rice block parameter {} exceeds {}",
                        k, MAX_RICE_K
                    )));
                }
                let unit_count = leb128::decode_usize(cursor)?;
                let byte_len = leb128::decode_usize(cursor)?;
                blocks.push(RiceBlock {
                    k,
                    unit_count,
                    byte_len,
                });
            }
            Ok(CoderDescriptor::GolombRice { k_mode, blocks })
        }
    }
}

//==================================================================================
// Private Helpers: header writing
//==================================================================================

fn write_transform(
    buf: &mut Vec<u8>,
    transform: &TransformDescriptor,
    row_count: usize,
) -> Result<(), CodecError> {
    match transform {
        TransformDescriptor::Delta { passes: 1 } => buf.push(TRANSFORM_DELTA1),
        TransformDescriptor::Delta { passes: 2 } => buf.push(TRANSFORM_DELTA2),
        TransformDescriptor::Delta { passes } => {
            return Err(CodecError::InvalidParameterError(format!(
                "delta with {} passes has no container encoding",
                passes
            )))
        }
        TransformDescriptor::Neighbor { predictors } => {
            if predictors.len() != row_count {
                return Err(CodecError::ConsistencyError(format!(
                    "{} predictor ids for {} rows",
                    predictors.len(),
                    row_count
                )));
            }
            buf.push(TRANSFORM_NEIGHBOR);
            buf.extend_from_slice(&neighbor::pack_ids(predictors));
        }
    }
    Ok(())
}

fn write_run_folding(
    buf: &mut Vec<u8>,
    run_folding: Option<&RunFoldDescriptor>,
) -> Result<(), CodecError> {
    let Some(folding) = run_folding else {
        buf.push(0);
        return Ok(());
    };
    buf.push(1);
    leb128::encode_one(folding.threshold, buf)?;
    buf.push(folding.scope.id());
    buf.push(folding.length_code.id());
    if let RunLengthCode::Fixed { width } = folding.length_code {
        buf.push(width);
    }
    match (folding.escape_policy, folding.escape) {
        (EscapePolicy::MaxPlusOne, Escape::Symbol(symbol)) => {
            buf.push(ESCAPE_MAX_PLUS_ONE);
            leb128::encode_one(symbol, buf)?;
        }
        (EscapePolicy::Symbol { .. }, Escape::Symbol(symbol)) => {
            buf.push(ESCAPE_SYMBOL);
            leb128::encode_one(symbol, buf)?;
        }
        (EscapePolicy::FlagBit, Escape::FlagBit) => buf.push(ESCAPE_FLAG_BIT),
        (policy, escape) => {
            return Err(CodecError::InternalError(format!(
                "escape {:?} does not match policy {:?}",
                escape, policy
            )))
        }
    }
    leb128::encode_one(folding.run_count as u64, buf)
}

fn write_coder(buf: &mut Vec<u8>, coder: &CoderDescriptor) -> Result<(), CodecError> {
    match coder {
        CoderDescriptor::Prefix(table) => table.write_to(buf),
        CoderDescriptor::GolombRice { k_mode, blocks } => {
            buf.push(k_mode.id());
            leb128::encode_one(blocks.len() as u64, buf)?;
            for block in blocks {
                buf.push(block.k);
                leb128::encode_one(block.unit_count as u64, buf)?;
                leb128::encode_one(block.byte_len as u64, buf)?;
            }
            Ok(())
        }
    }
}

//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::format::PREFIX_MAGIC;
    use crate::kernels::neighbor::Predictor2d;
    use crate::kernels::prefix::PrefixConstruction;
    use std::collections::BTreeMap;

    fn create_rice_grid() -> CompressedGrid {
        CompressedGrid {
            total_samples: 5,
            first_value: -3,
            layout: RowLayout::from_lengths(vec![3, 2]),
            transform: TransformDescriptor::Neighbor {
                predictors: vec![Predictor2d::Left, Predictor2d::Median],
            },
            run_folding: Some(RunFoldDescriptor {
                threshold: 4,
                scope: RunScope::ZerosOnly,
                length_code: RunLengthCode::Fixed { width: 16 },
                escape_policy: EscapePolicy::FlagBit,
                escape: Escape::FlagBit,
                run_count: 0,
            }),
            coder: CoderDescriptor::GolombRice {
                k_mode: RiceKMode::Adaptive,
                blocks: vec![RiceBlock {
                    k: 2,
                    unit_count: 4,
                    byte_len: 3,
                }],
            },
            payload: vec![0xAB, 0xCD, 0xEF],
        }
    }

    fn create_prefix_grid() -> CompressedGrid {
        let freqs = BTreeMap::from([(0u32, 10u64), (1, 3), (5, 1)]);
        CompressedGrid {
            total_samples: 12,
            first_value: 5,
            layout: RowLayout::uniform(2, 6),
            transform: TransformDescriptor::Delta { passes: 2 },
            run_folding: Some(RunFoldDescriptor {
                threshold: 4,
                scope: RunScope::AnySymbol,
                length_code: RunLengthCode::Buckets,
                escape_policy: EscapePolicy::MaxPlusOne,
                escape: Escape::Symbol(6),
                run_count: 1,
            }),
            coder: CoderDescriptor::Prefix(
                CodeTable::build(&freqs, PrefixConstruction::Canonical).unwrap(),
            ),
            payload: vec![0x12, 0x34],
        }
    }

    #[test]
    fn test_artifact_roundtrip_is_successful() {
        for original in [create_rice_grid(), create_prefix_grid()] {
            let bytes = original.to_bytes().unwrap();
            let reconstructed = CompressedGrid::from_bytes(&bytes).unwrap();
            assert_eq!(original, reconstructed);
        }
    }

    #[test]
    fn test_fixed_prefix_layout() {
        let bytes = create_prefix_grid().to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"GRDP");
        assert_eq!(&bytes[4..8], &12u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &5i32.to_le_bytes());
        // uniform layout: flag 0, 2 rows of 6; then transform mode 1
        assert_eq!(&bytes[12..16], &[0, 2, 6, 1]);
    }

    #[test]
    fn test_peek_info_is_correct() {
        let original = create_rice_grid();
        let bytes = original.to_bytes().unwrap();
        let info = CompressedGrid::peek_info(&bytes).unwrap();

        assert_eq!(info.format, GridFormat::GolombRice);
        assert_eq!(info.total_samples, 5);
        assert_eq!(info.row_count, 2);
        assert_eq!(info.payload_size, 3);
        assert_eq!(info.header_size + info.payload_size, bytes.len());
        assert!(info.plan_json.contains("neighbor2d") || info.plan_json.contains("neighbor_2d"));
        assert!(info.plan_json.contains("golomb_rice"));
    }

    #[test]
    fn test_parsing_errors_are_handled_gracefully() {
        // Too short for a magic number
        assert!(matches!(
            CompressedGrid::peek_info(b"GR"),
            Err(CodecError::FormatError(_))
        ));

        // Bad magic number
        let mut bad_magic = create_prefix_grid().to_bytes().unwrap();
        bad_magic[0] = b'X';
        assert!(matches!(
            CompressedGrid::from_bytes(&bad_magic),
            Err(CodecError::FormatError(_))
        ));

        // Valid magic, header too short
        assert!(matches!(
            CompressedGrid::from_bytes(b"GRDR\x01\x00"),
            Err(CodecError::FormatError(_))
        ));

        // Truncated inside the side tables
        let full = create_prefix_grid().to_bytes().unwrap();
        assert!(matches!(
            CompressedGrid::from_bytes(&full[..17]),
            Err(CodecError::TruncationError(_))
        ));
    }

    #[test]
    fn test_rice_payload_length_is_enforced() {
        let mut bytes = create_rice_grid().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            CompressedGrid::from_bytes(&bytes),
            Err(CodecError::FormatError(_))
        ));

        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            CompressedGrid::from_bytes(&bytes),
            Err(CodecError::TruncationError(_))
        ));
    }

    #[test]
    fn test_layout_must_match_sample_count() {
        let mut grid = create_prefix_grid();
        grid.total_samples = 13;
        let bytes = grid.to_bytes().unwrap();
        assert!(matches!(
            CompressedGrid::peek_info(&bytes),
            Err(CodecError::ConsistencyError(_))
        ));
    }

    /// Magic, sample count and first value, ready for a hand-written layout.
    fn crafted_prefix(total_samples: u32) -> Vec<u8> {
        let mut bytes = PREFIX_MAGIC.to_vec();
        bytes.extend_from_slice(&total_samples.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes
    }

    #[test]
    fn test_oversized_layout_counts_are_rejected() {
        // Uniform layout claiming 2^40 rows of one sample.
        let mut huge_rows = crafted_prefix(1);
        huge_rows.push(0);
        leb128::encode_one(1u64 << 40, &mut huge_rows).unwrap();
        leb128::encode_one(1u64, &mut huge_rows).unwrap();
        huge_rows.extend_from_slice(&[0, 0, 0]);
        assert!(matches!(
            CompressedGrid::from_bytes(&huge_rows),
            Err(CodecError::ConsistencyError(_))
        ));

        // Variable layout whose lengths wrap around usize.
        let mut wrapping = crafted_prefix(1);
        wrapping.extend_from_slice(&[1, 2]);
        leb128::encode_one(usize::MAX as u64, &mut wrapping).unwrap();
        leb128::encode_one(2u64, &mut wrapping).unwrap();
        wrapping.extend_from_slice(&[0, 0, 0]);
        assert!(matches!(
            CompressedGrid::peek_info(&wrapping),
            Err(CodecError::ConsistencyError(_))
        ));
    }

    #[test]
    fn test_unknown_mode_bytes() {
        let mut bytes = create_prefix_grid().to_bytes().unwrap();
        bytes[15] = 9; // transform mode
        assert!(matches!(
            CompressedGrid::from_bytes(&bytes),
            Err(CodecError::FormatError(_))
        ));
    }
}
