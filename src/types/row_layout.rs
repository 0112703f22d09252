//! Row structure of a grid: how the flattened, row-major sample sequence splits
//! back into rows. Rows may be empty and may differ in length.

use serde::Serialize;
use std::io::{Cursor, Read};
use std::ops::Range;

use crate::error::CodecError;
use crate::kernels::leb128;

const LAYOUT_UNIFORM: u8 = 0;
const LAYOUT_VARIABLE: u8 = 1;

//==================================================================================
// 1. RowLayout
//==================================================================================

/// Ordered row lengths. Their sum is the total sample count of the grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowLayout {
    lengths: Vec<usize>,
}

/// The compact on-disk form of a `RowLayout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutDescriptor {
    Uniform { row_count: usize, row_length: usize },
    Variable(Vec<usize>),
}

impl RowLayout {
    pub fn from_lengths(lengths: Vec<usize>) -> Self {
        Self { lengths }
    }

    pub fn uniform(row_count: usize, row_length: usize) -> Self {
        Self {
            lengths: vec![row_length; row_count],
        }
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn row_count(&self) -> usize {
        self.lengths.len()
    }

    /// Sum of all row lengths, `None` if it overflows `usize`.
    pub fn checked_total(&self) -> Option<usize> {
        self.lengths
            .iter()
            .try_fold(0usize, |acc, &len| acc.checked_add(len))
    }

    /// Sum of all row lengths, saturating at `usize::MAX`.
    pub fn total(&self) -> usize {
        self.checked_total().unwrap_or(usize::MAX)
    }

    /// `Some(len)` when every row has the same length. A layout with no rows counts as uniform.
    pub fn uniform_length(&self) -> Option<usize> {
        match self.lengths.split_first() {
            None => Some(0),
            Some((&first, rest)) => rest.iter().all(|&l| l == first).then_some(first),
        }
    }

    /// Half-open index ranges of every row within the flattened sequence.
    pub fn row_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.lengths.iter().scan(0usize, |offset, &len| {
            let range = *offset..*offset + len;
            *offset += len;
            Some(range)
        })
    }

    /// Fails with a `ConsistencyError` unless the rows cover exactly `sample_count` samples.
    pub fn check_total(&self, sample_count: usize) -> Result<(), CodecError> {
        match self.checked_total() {
            Some(total) if total == sample_count => Ok(()),
            Some(total) => Err(CodecError::ConsistencyError(format!(
                "row layout sums to {} but there are {} samples",
                total, sample_count
            ))),
            None => Err(CodecError::ConsistencyError(format!(
                "row layout overflows while there are {} samples",
                sample_count
            ))),
        }
    }

    pub fn descriptor(&self) -> LayoutDescriptor {
        match self.uniform_length() {
            Some(row_length) => LayoutDescriptor::Uniform {
                row_count: self.row_count(),
                row_length,
            },
            None => LayoutDescriptor::Variable(self.lengths.clone()),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self.descriptor() {
            LayoutDescriptor::Uniform {
                row_count,
                row_length,
            } => {
                out.push(LAYOUT_UNIFORM);
                leb128::encode_one(row_count as u64, out)?;
                leb128::encode_one(row_length as u64, out)?;
            }
            LayoutDescriptor::Variable(lengths) => {
                out.push(LAYOUT_VARIABLE);
                leb128::encode_one(lengths.len() as u64, out)?;
                for len in lengths {
                    leb128::encode_one(len as u64, out)?;
                }
            }
        }
        Ok(())
    }

    /// Reads a layout written by `write_to`. Row counts are checked against
    /// `total_samples` before anything is allocated for them.
    pub fn read_from(
        cursor: &mut Cursor<&[u8]>,
        total_samples: usize,
    ) -> Result<Self, CodecError> {
        let mut flag = [0u8; 1];
        cursor
            .read_exact(&mut flag)
            .map_err(|_| CodecError::end_of_stream("row layout flag"))?;
        let row_count = leb128::decode_usize(cursor)?;

        match flag[0] {
            LAYOUT_UNIFORM => {
                let row_length = leb128::decode_usize(cursor)?;
                if row_count.checked_mul(row_length) != Some(total_samples) {
                    return Err(CodecError::ConsistencyError(format!(
                        "uniform layout {} x {} does not cover {} samples",
                        row_count, row_length, total_samples
                    )));
                }
                // Zero-length rows cost nothing on disk, so bound them by the u32 sample range.
                if row_length == 0 && row_count > u32::MAX as usize {
                    return Err(CodecError::FormatError(format!(
                        "{} empty rows exceed the supported row count",
                        row_count
                    )));
                }
                Ok(Self::uniform(row_count, row_length))
            }
            LAYOUT_VARIABLE => {
                let remaining = cursor.get_ref().len() - cursor.position() as usize;
                let mut lengths = Vec::with_capacity(row_count.min(remaining));
                let mut left = total_samples;
                for _ in 0..row_count {
                    let len = leb128::decode_usize(cursor)?;
                    left = left.checked_sub(len).ok_or_else(|| {
                        CodecError::ConsistencyError(format!(
                            "row lengths exceed the declared {} samples",
                            total_samples
                        ))
                    })?;
                    lengths.push(len);
                }
                if left != 0 {
                    return Err(CodecError::ConsistencyError(format!(
                        "row lengths cover {} of the declared {} samples",
                        total_samples - left,
                        total_samples
                    )));
                }
                Ok(Self::from_lengths(lengths))
            }
            other => Err(CodecError::FormatError(format!(
                "unknown row layout flag {}",
                other
            ))),
        }
    }
}

//==================================================================================
// 2. SampleGrid
//==================================================================================

/// A flattened sample sequence together with its row layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleGrid {
    samples: Vec<i32>,
    layout: RowLayout,
}

impl SampleGrid {
    pub fn new(samples: Vec<i32>, layout: RowLayout) -> Result<Self, CodecError> {
        layout.check_total(samples.len())?;
        Ok(Self { samples, layout })
    }

    pub fn from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Self {
        let mut samples = Vec::with_capacity(rows.iter().map(|r| r.as_ref().len()).sum());
        let mut lengths = Vec::with_capacity(rows.len());
        for row in rows {
            samples.extend_from_slice(row.as_ref());
            lengths.push(row.as_ref().len());
        }
        Self {
            samples,
            layout: RowLayout::from_lengths(lengths),
        }
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i32]> + '_ {
        self.layout.row_ranges().map(|r| &self.samples[r])
    }

    pub fn to_rows(&self) -> Vec<Vec<i32>> {
        self.rows().map(<[i32]>::to_vec).collect()
    }

    pub fn into_parts(self) -> (Vec<i32>, RowLayout) {
        (self.samples, self.layout)
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reread(layout: &RowLayout) -> (Vec<u8>, RowLayout) {
        let mut bytes = Vec::new();
        layout.write_to(&mut bytes).unwrap();
        let back = RowLayout::read_from(&mut Cursor::new(&bytes[..]), layout.total()).unwrap();
        (bytes, back)
    }

    #[test]
    fn test_uniform_layout_is_compact() {
        let layout = RowLayout::uniform(2, 6);
        assert_eq!(layout.uniform_length(), Some(6));
        let (bytes, back) = reread(&layout);
        assert_eq!(bytes, vec![LAYOUT_UNIFORM, 2, 6]);
        assert_eq!(back, layout);
    }

    #[test]
    fn test_variable_layout_lists_every_row() {
        let layout = RowLayout::from_lengths(vec![3, 2]);
        assert_eq!(layout.uniform_length(), None);
        let (bytes, back) = reread(&layout);
        assert_eq!(bytes, vec![LAYOUT_VARIABLE, 2, 3, 2]);
        assert_eq!(back, layout);
    }

    #[test]
    fn test_empty_rows_and_no_rows() {
        let blank_lines = RowLayout::uniform(3, 0);
        assert_eq!(reread(&blank_lines).1, blank_lines);
        assert_eq!(blank_lines.total(), 0);

        let nothing = RowLayout::default();
        assert_eq!(nothing.descriptor(), LayoutDescriptor::Uniform { row_count: 0, row_length: 0 });
        assert_eq!(reread(&nothing).1, nothing);
    }

    #[test]
    fn test_row_ranges() {
        let layout = RowLayout::from_lengths(vec![2, 0, 3]);
        let ranges: Vec<_> = layout.row_ranges().collect();
        assert_eq!(ranges, vec![0..2, 2..2, 2..5]);
    }

    #[test]
    fn test_check_total() {
        let layout = RowLayout::from_lengths(vec![3, 2]);
        assert!(layout.check_total(5).is_ok());
        assert!(matches!(
            layout.check_total(6),
            Err(CodecError::ConsistencyError(_))
        ));
    }

    #[test]
    fn test_unknown_flag_and_truncation() {
        let bad_flag = [7u8, 1, 1];
        assert!(matches!(
            RowLayout::read_from(&mut Cursor::new(&bad_flag[..]), 1),
            Err(CodecError::FormatError(_))
        ));
        let short = [LAYOUT_VARIABLE, 3, 1];
        assert!(matches!(
            RowLayout::read_from(&mut Cursor::new(&short[..]), 3),
            Err(CodecError::TruncationError(_))
        ));
    }

    #[test]
    fn test_layout_must_cover_declared_total() {
        // 2^40 rows of one sample: rejected before any row is allocated.
        let mut huge = vec![LAYOUT_UNIFORM];
        leb128::encode_one(1u64 << 40, &mut huge).unwrap();
        leb128::encode_one(1u64, &mut huge).unwrap();
        assert!(matches!(
            RowLayout::read_from(&mut Cursor::new(&huge[..]), 1),
            Err(CodecError::ConsistencyError(_))
        ));

        let mut wrapping = vec![LAYOUT_VARIABLE, 2];
        leb128::encode_one(usize::MAX as u64, &mut wrapping).unwrap();
        leb128::encode_one(2u64, &mut wrapping).unwrap();
        assert!(matches!(
            RowLayout::read_from(&mut Cursor::new(&wrapping[..]), 1),
            Err(CodecError::ConsistencyError(_))
        ));

        let short_rows = [LAYOUT_VARIABLE, 2, 1, 1];
        assert!(matches!(
            RowLayout::read_from(&mut Cursor::new(&short_rows[..]), 3),
            Err(CodecError::ConsistencyError(_))
        ));

        let too_many_blank_rows = [LAYOUT_UNIFORM, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0];
        assert!(matches!(
            RowLayout::read_from(&mut Cursor::new(&too_many_blank_rows[..]), 0),
            Err(CodecError::FormatError(_))
        ));
    }

    #[test]
    fn test_overflowing_lengths_fail_the_total_check() {
        let layout = RowLayout::from_lengths(vec![usize::MAX, 2]);
        assert_eq!(layout.checked_total(), None);
        assert_eq!(layout.total(), usize::MAX);
        assert!(matches!(
            layout.check_total(1),
            Err(CodecError::ConsistencyError(_))
        ));
    }

    #[test]
    fn test_sample_grid_rows() {
        let grid = SampleGrid::from_rows(&[vec![1, 2, 3], vec![], vec![4, 5]]);
        assert_eq!(grid.samples(), &[1, 2, 3, 4, 5]);
        assert_eq!(grid.layout().lengths(), &[3, 0, 2]);
        assert_eq!(grid.to_rows(), vec![vec![1, 2, 3], vec![], vec![4, 5]]);
        assert!(SampleGrid::new(vec![1], RowLayout::uniform(1, 2)).is_err());
    }
}
