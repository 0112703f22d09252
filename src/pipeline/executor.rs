// In: src/pipeline/executor.rs

//! The executor chains the pure kernels in the order a `GridPlan` describes.
//!
//! Encoding runs: transform -> zigzag -> run folding -> entropy coder.
//! Decoding runs the exact inverse and relies only on what the container
//! header recorded. The executor never decides anything itself; every choice
//! comes from the planner or from the header.

use crate::config::RiceParameter;
use crate::error::CodecError;
use crate::kernels::prefix::{self, CodeTable};
use crate::kernels::rle::{self, RunCoding, Token};
use crate::kernels::{delta, neighbor, rice, zigzag};
use crate::pipeline::artifact::CompressedGrid;
use crate::pipeline::models::{
    CoderChoice, CoderDescriptor, GridPlan, RiceKMode, RunFoldDescriptor, TransformDescriptor,
};
use crate::pipeline::planner;
use crate::types::RowLayout;

/// The data-dependent half of a container, ready to be framed.
#[derive(Debug)]
pub struct EncodedStream {
    pub first_value: i32,
    pub transform: TransformDescriptor,
    pub run_folding: Option<RunFoldDescriptor>,
    pub coder: CoderDescriptor,
    pub payload: Vec<u8>,
}

//==================================================================================
// 1. Transform Stage
//==================================================================================

pub fn compute_residuals(
    samples: &[i32],
    layout: &RowLayout,
    transform: &TransformDescriptor,
) -> Result<Vec<i32>, CodecError> {
    match transform {
        TransformDescriptor::Delta { passes } => Ok(delta::encode(samples, *passes as usize)),
        TransformDescriptor::Neighbor { predictors } => {
            neighbor::encode(samples, layout.lengths(), predictors)
        }
    }
}

pub fn reconstruct_samples(
    first_value: i32,
    residuals: &[i32],
    layout: &RowLayout,
    transform: &TransformDescriptor,
) -> Result<Vec<i32>, CodecError> {
    if layout.total() == 0 {
        return Ok(Vec::new());
    }
    match transform {
        TransformDescriptor::Delta { passes } => {
            Ok(delta::decode(first_value, residuals, *passes as usize))
        }
        TransformDescriptor::Neighbor { predictors } => {
            neighbor::decode(first_value, residuals, layout.lengths(), predictors)
        }
    }
}

//==================================================================================
// 2. Encode
//==================================================================================

pub fn execute_encode(
    samples: &[i32],
    layout: &RowLayout,
    plan: &GridPlan,
) -> Result<EncodedStream, CodecError> {
    let residuals = compute_residuals(samples, layout, &plan.transform)?;
    let symbols = zigzag::encode(&residuals);

    let (tokens, run_folding) = match &plan.run_folding {
        Some(config) => {
            let tokens = rle::fold(
                &symbols,
                config.threshold,
                config.scope,
                config.length_code.max_length(),
            )?;
            let descriptor = planner::finalize_run_folding(config, &tokens)?;
            (tokens, descriptor)
        }
        None => (symbols.iter().map(|&s| Token::Literal(s)).collect(), None),
    };
    let runs: Option<RunCoding> = run_folding.as_ref().map(RunFoldDescriptor::coding);

    log::debug!(
        "Encode stages: {} residuals -> {} tokens ({} runs)",
        residuals.len(),
        tokens.len(),
        run_folding.as_ref().map_or(0, |r| r.run_count)
    );

    let (coder, payload) = match &plan.coder {
        CoderChoice::Prefix(construction) => {
            let frequencies = prefix::symbol_frequencies(&tokens, runs.as_ref());
            let table = if frequencies.is_empty() {
                CodeTable::empty(*construction)
            } else {
                CodeTable::build(&frequencies, *construction)?
            };
            let payload = prefix::encode_tokens(&tokens, &table, runs.as_ref())?;
            log_metric!(
                "event"="prefix_table",
                "entries"=table.len(),
                "coded_bits"=table.coded_bits(&frequencies),
                "payload_bytes"=payload.len()
            );
            (CoderDescriptor::Prefix(table), payload)
        }
        CoderChoice::GolombRice(config) => {
            let (blocks, payload) =
                rice::encode_tokens(&tokens, runs.as_ref(), config.k, config.block_size)?;
            for (i, block) in blocks.iter().enumerate() {
                log_metric!(
                    "event"="rice_block",
                    "index"=i,
                    "k"=block.k,
                    "units"=block.unit_count,
                    "bytes"=block.byte_len
                );
            }
            let k_mode = match config.k {
                RiceParameter::Adaptive => RiceKMode::Adaptive,
                RiceParameter::Fixed { .. } => RiceKMode::Fixed,
            };
            (CoderDescriptor::GolombRice { k_mode, blocks }, payload)
        }
    };

    Ok(EncodedStream {
        first_value: samples.first().copied().unwrap_or(0),
        transform: plan.transform.clone(),
        run_folding,
        coder,
        payload,
    })
}

//==================================================================================
// 3. Decode
//==================================================================================

pub fn execute_decode(grid: &CompressedGrid) -> Result<Vec<i32>, CodecError> {
    let total = grid.total_samples as usize;
    grid.layout.check_total(total)?;
    let expected_symbols = total.saturating_sub(1);
    let runs = grid.run_folding.as_ref().map(RunFoldDescriptor::coding);

    let tokens = match &grid.coder {
        CoderDescriptor::Prefix(table) => {
            if expected_symbols == 0 && !grid.payload.is_empty() {
                return Err(CodecError::FormatError(
                    "payload present but no symbols were declared".to_string(),
                ));
            }
            prefix::decode_tokens(&grid.payload, table, runs.as_ref(), expected_symbols)?
        }
        CoderDescriptor::GolombRice { blocks, .. } => {
            rice::decode_tokens(&grid.payload, blocks, runs.as_ref(), expected_symbols)?
        }
    };

    if let Some(folding) = &grid.run_folding {
        let decoded_runs = rle::run_count(&tokens);
        if decoded_runs != folding.run_count {
            return Err(CodecError::ConsistencyError(format!(
                "header declares {} runs but the payload holds {}",
                folding.run_count, decoded_runs
            )));
        }
    }

    let symbols = rle::expand(&tokens, expected_symbols)?;
    let residuals = zigzag::decode(&symbols);
    reconstruct_samples(grid.first_value, &residuals, &grid.layout, &grid.transform)
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
