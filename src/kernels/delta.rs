//! This module contains the pure, stateless kernels for sequential delta
//! prediction over the flattened, row-major sample stream.
//!
//! The first sample is never a residual; it travels raw in the container
//! header. `passes = 1` yields first-order differences, `passes = 2` takes the
//! difference of differences (with `d2[0] = d1[0]`). All arithmetic wraps, so
//! any `i32` input round-trips even when a difference overflows.

use num_traits::{PrimInt, WrappingAdd, WrappingSub};

//==================================================================================
// 1. Generic Core Logic (The "Engine" - In-Place)
//==================================================================================

/// Performs delta encoding **in-place**: `data[i] = data[i] - data[i - lag]`.
fn encode_slice_inplace<T>(data: &mut [T], lag: usize)
where
    T: PrimInt + WrappingSub,
{
    if data.len() <= lag {
        return;
    }
    // Iterate backwards to use original values for calculation
    for i in (lag..data.len()).rev() {
        data[i] = data[i].wrapping_sub(&data[i - lag]);
    }
}

/// Performs delta decoding (cumulative sum) **in-place**: `data[i] += data[i - lag]`.
fn decode_slice_inplace<T>(data: &mut [T], lag: usize)
where
    T: PrimInt + WrappingAdd,
{
    if data.len() <= lag {
        return;
    }
    // Iterate forwards to use the newly-decoded values for subsequent sums
    for i in lag..data.len() {
        data[i] = data[i].wrapping_add(&data[i - lag]);
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Turns `samples` into `samples.len() - 1` residuals after `passes` rounds of
/// first-order differencing. Returns an empty stream for zero or one sample.
pub fn encode(samples: &[i32], passes: usize) -> Vec<i32> {
    if samples.len() <= 1 {
        return Vec::new();
    }
    let mut data = samples.to_vec();
    encode_slice_inplace(&mut data, 1);
    let mut residuals = data.split_off(1);
    for _ in 1..passes {
        encode_slice_inplace(&mut residuals, 1);
    }
    residuals
}

/// Inverts [`encode`]: rebuilds the full sample stream from the raw first
/// sample and the residuals.
pub fn decode(first: i32, residuals: &[i32], passes: usize) -> Vec<i32> {
    let mut diffs = residuals.to_vec();
    for _ in 1..passes {
        decode_slice_inplace(&mut diffs, 1);
    }
    let mut samples = Vec::with_capacity(diffs.len() + 1);
    samples.push(first);
    samples.extend_from_slice(&diffs);
    decode_slice_inplace(&mut samples, 1);
    samples
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
