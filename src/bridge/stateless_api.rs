// In: src/bridge/stateless_api.rs

use crate::bridge::format::{CompressionStats, GridFormat};
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::pipeline;
use crate::pipeline::artifact::CompressedGrid;
use crate::types::{RowLayout, SampleGrid};

/// Compresses a flattened grid and its row layout into container bytes.
pub fn compress(
    samples: &[i32],
    layout: &RowLayout,
    config: &CodecConfig,
) -> Result<Vec<u8>, CodecError> {
    pipeline::compress_grid(samples, layout, config)
}

/// Restores the samples and row layout from container bytes.
pub fn decompress(bytes: &[u8]) -> Result<(Vec<i32>, RowLayout), CodecError> {
    pipeline::decompress_grid(bytes)
}

/// Convenience wrapper over `compress` for a `SampleGrid`.
pub fn compress_grid(grid: &SampleGrid, config: &CodecConfig) -> Result<Vec<u8>, CodecError> {
    compress(grid.samples(), grid.layout(), config)
}

/// Convenience wrapper over `decompress` returning a `SampleGrid`.
pub fn decompress_grid(bytes: &[u8]) -> Result<SampleGrid, CodecError> {
    let (samples, layout) = decompress(bytes)?;
    SampleGrid::new(samples, layout)
}

/// Analyzes a container without decoding its payload.
/// This function acts as a simple facade over `peek_info`.
pub fn analyze(bytes: &[u8]) -> Result<CompressionStats, CodecError> {
    let info = CompressedGrid::peek_info(bytes)?;

    Ok(CompressionStats {
        format: info.format,
        header_size: info.header_size,
        payload_size: info.payload_size,
        total_size: bytes.len(),
        sample_count: info.total_samples,
        row_count: info.row_count,
        plan_json: info.plan_json,
    })
}

/// Returns the container variant if `bytes` start with a known magic.
pub fn detect_format(bytes: &[u8]) -> Option<GridFormat> {
    crate::bridge::format::detect_format(bytes)
}
