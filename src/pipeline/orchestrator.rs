// In: src/pipeline/orchestrator.rs

//! The pure, I/O-free entry points of the pipeline.
//!
//! `compress_grid` coordinates planner, executor and artifact; `decompress_grid`
//! runs the inverse using nothing but the container bytes.

use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::pipeline::artifact::CompressedGrid;
use crate::pipeline::{executor, planner};
use crate::types::RowLayout;

//==================================================================================
// 1. Public Orchestration API
//==================================================================================

/// Compresses a flattened grid into a self-describing container.
pub fn compress_grid(
    samples: &[i32],
    layout: &RowLayout,
    config: &CodecConfig,
) -> Result<Vec<u8>, CodecError> {
    let total_samples = u32::try_from(samples.len()).map_err(|_| {
        CodecError::InvalidParameterError(format!(
            "{} samples exceed the container limit of {}",
            samples.len(),
            u32::MAX
        ))
    })?;

    // 1. Make every data-only decision.
    let plan = planner::plan_grid(samples, layout, config)?;

    // 2. Run the kernels in plan order.
    let stream = executor::execute_encode(samples, layout, &plan)?;

    // 3. Assemble and serialize the container.
    let artifact = CompressedGrid {
        total_samples,
        first_value: stream.first_value,
        layout: layout.clone(),
        transform: stream.transform,
        run_folding: stream.run_folding,
        coder: stream.coder,
        payload: stream.payload,
    };
    let bytes = artifact.to_bytes()?;

    log_metric!(
        "event"="compress",
        "samples"=total_samples,
        "rows"=layout.row_count(),
        "payload_bytes"=artifact.payload.len(),
        "container_bytes"=bytes.len()
    );
    Ok(bytes)
}

/// Restores the samples and row layout recorded in a container.
pub fn decompress_grid(bytes: &[u8]) -> Result<(Vec<i32>, RowLayout), CodecError> {
    let artifact = CompressedGrid::from_bytes(bytes)?;
    let samples = executor::execute_decode(&artifact)?;

    if samples.len() != artifact.total_samples as usize {
        return Err(CodecError::InternalError(format!(
            "decoded {} samples, header declares {}",
            samples.len(),
            artifact.total_samples
        )));
    }

    log::debug!(
        "Decoded {} samples in {} rows from {} bytes",
        samples.len(),
        artifact.layout.row_count(),
        bytes.len()
    );
    Ok((samples, artifact.layout))
}
