//! This module contains the pure, stateless kernels for 2D neighbor prediction.
//!
//! For a sample at (row, col) the neighbors are A (left), B (up) and C (up-left),
//! taken from the current row and the row immediately before it in the layout.
//! Rows may have different lengths, so B and C are undefined wherever the
//! previous row is too short. Each row is coded with one predictor id chosen by
//! minimum absolute residual sum. The global first sample is never predicted.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

//==================================================================================
// 1. Predictor Definitions
//==================================================================================

/// The closed set of per-row predictors. The discriminant is the on-disk id and
/// also the tie-break order during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Predictor2d {
    Left = 0,
    Up = 1,
    Paeth = 2,
    Median = 3,
}

impl Predictor2d {
    pub const ALL: [Predictor2d; 4] = [Self::Left, Self::Up, Self::Paeth, Self::Median];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, CodecError> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| CodecError::FormatError(format!("unknown predictor id {}", id)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Neighbors {
    a: Option<i32>,
    b: Option<i32>,
    c: Option<i32>,
}

impl Neighbors {
    /// `row` must hold at least the first `col` samples of the current row.
    fn at(row: &[i32], prev: &[i32], col: usize) -> Self {
        let left = col.checked_sub(1);
        Self {
            a: left.and_then(|l| row.get(l)).copied(),
            b: prev.get(col).copied(),
            c: left.and_then(|l| prev.get(l)).copied(),
        }
    }

    fn fallback(&self) -> i32 {
        self.a.or(self.b).unwrap_or(0)
    }
}

fn paeth(a: i32, b: i32, c: i32) -> i32 {
    let p = a as i64 + b as i64 - c as i64;
    let pa = (p - a as i64).abs();
    let pb = (p - b as i64).abs();
    let pc = (p - c as i64).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn median(a: i32, b: i32, c: i32) -> i32 {
    if c >= a.max(b) {
        a.min(b)
    } else if c <= a.min(b) {
        a.max(b)
    } else {
        a.wrapping_add(b).wrapping_sub(c)
    }
}

fn predict(predictor: Predictor2d, n: &Neighbors) -> i32 {
    match (predictor, n.a, n.b, n.c) {
        (Predictor2d::Left, Some(a), _, _) => a,
        (Predictor2d::Up, _, Some(b), _) => b,
        (Predictor2d::Paeth, Some(a), Some(b), Some(c)) => paeth(a, b, c),
        (Predictor2d::Median, Some(a), Some(b), Some(c)) => median(a, b, c),
        _ => n.fallback(),
    }
}

//==================================================================================
// 2. Row Walking Helpers
//==================================================================================

fn row_starts(row_lengths: &[usize]) -> Vec<usize> {
    let mut starts = Vec::with_capacity(row_lengths.len());
    let mut offset = 0usize;
    for &len in row_lengths {
        starts.push(offset);
        offset += len;
    }
    starts
}

/// Sum of |residual| for one row under one predictor. `skip_first` excludes the
/// raw global first sample when it lives in this row.
fn row_cost(row: &[i32], prev: &[i32], predictor: Predictor2d, skip_first: bool) -> u64 {
    let start = usize::from(skip_first);
    (start..row.len())
        .map(|col| {
            let guess = predict(predictor, &Neighbors::at(row, prev, col));
            row[col].wrapping_sub(guess).unsigned_abs() as u64
        })
        .sum()
}

//==================================================================================
// 3. Public API
//==================================================================================

/// Picks the cheapest predictor for a single row. Ties go to the lowest id.
pub fn select_row_predictor(row: &[i32], prev: &[i32], skip_first: bool) -> Predictor2d {
    let mut best = Predictor2d::Left;
    let mut best_cost = u64::MAX;
    for candidate in Predictor2d::ALL {
        let cost = row_cost(row, prev, candidate, skip_first);
        if cost < best_cost {
            best = candidate;
            best_cost = cost;
        }
    }
    best
}

/// Chooses one predictor per row of the layout.
pub fn choose_predictors(samples: &[i32], row_lengths: &[usize]) -> Vec<Predictor2d> {
    let starts = row_starts(row_lengths);
    let mut prev: &[i32] = &[];
    row_lengths
        .iter()
        .zip(&starts)
        .map(|(&len, &start)| {
            let row = &samples[start..start + len];
            let choice = select_row_predictor(row, prev, start == 0);
            prev = row;
            choice
        })
        .collect()
}

/// Produces `samples.len() - 1` residuals in row-major order.
pub fn encode(
    samples: &[i32],
    row_lengths: &[usize],
    predictors: &[Predictor2d],
) -> Result<Vec<i32>, CodecError> {
    check_shape(samples.len(), row_lengths, predictors)?;
    let starts = row_starts(row_lengths);
    let mut residuals = Vec::with_capacity(samples.len().saturating_sub(1));
    let mut prev: &[i32] = &[];

    for ((&len, &start), &predictor) in row_lengths.iter().zip(&starts).zip(predictors) {
        let row = &samples[start..start + len];
        for col in 0..len {
            if start + col == 0 {
                continue;
            }
            let guess = predict(predictor, &Neighbors::at(row, prev, col));
            residuals.push(row[col].wrapping_sub(guess));
        }
        prev = row;
    }
    Ok(residuals)
}

/// Rebuilds the sample stream, predicting each sample from already decoded neighbors.
pub fn decode(
    first: i32,
    residuals: &[i32],
    row_lengths: &[usize],
    predictors: &[Predictor2d],
) -> Result<Vec<i32>, CodecError> {
    let total: usize = row_lengths.iter().sum();
    check_shape(total, row_lengths, predictors)?;
    if residuals.len() != total.saturating_sub(1) {
        return Err(CodecError::ConsistencyError(format!(
            "expected {} residuals for {} samples, found {}",
            total.saturating_sub(1),
            total,
            residuals.len()
        )));
    }

    let mut out: Vec<i32> = Vec::with_capacity(total);
    let mut pending = residuals.iter();
    let mut prev_range = 0..0;

    for (&len, &predictor) in row_lengths.iter().zip(predictors) {
        let start = out.len();
        for col in 0..len {
            let value = if start + col == 0 {
                first
            } else {
                let guess = predict(
                    predictor,
                    &Neighbors::at(&out[start..], &out[prev_range.clone()], col),
                );
                let residual = pending.next().ok_or_else(|| {
                    CodecError::ConsistencyError("residual stream ended early".to_string())
                })?;
                guess.wrapping_add(*residual)
            };
            out.push(value);
        }
        prev_range = start..start + len;
    }
    Ok(out)
}

fn check_shape(
    total: usize,
    row_lengths: &[usize],
    predictors: &[Predictor2d],
) -> Result<(), CodecError> {
    if predictors.len() != row_lengths.len() {
        return Err(CodecError::ConsistencyError(format!(
            "{} predictor ids for {} rows",
            predictors.len(),
            row_lengths.len()
        )));
    }
    let declared: usize = row_lengths.iter().sum();
    if declared != total {
        return Err(CodecError::ConsistencyError(format!(
            "row lengths sum to {} but there are {} samples",
            declared, total
        )));
    }
    Ok(())
}

/// Packs predictor ids four per byte, 2 bits each, most-significant first.
pub fn pack_ids(predictors: &[Predictor2d]) -> Vec<u8> {
    predictors
        .chunks(4)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, p)| byte | (p.id() << (6 - 2 * i)))
        })
        .collect()
}

pub fn unpack_ids(bytes: &[u8], row_count: usize) -> Result<Vec<Predictor2d>, CodecError> {
    let needed = row_count.div_ceil(4);
    if bytes.len() < needed {
        return Err(CodecError::end_of_stream("predictor ids"));
    }
    (0..row_count)
        .map(|i| Predictor2d::from_id((bytes[i / 4] >> (6 - 2 * (i % 4))) & 0b11))
        .collect()
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
