// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing API of the gridcodec library. It wraps the
// pure `pipeline` engine and the plain-text grid form used by the CLI.
//
// Data Flow (Compression):
//
//   1. [Text (parse_rows)]            -> Receives lines of integers
//         |
//         `-> returns a `SampleGrid` (flattened samples + `RowLayout`)
//
//   2. [Stateless API (compress)]     -> Receives `&[i32]` + `&RowLayout` + `&CodecConfig`
//         |
//         `-> calls `pipeline::compress_grid`
//
//   3. [Pipeline Engine]              -> Returns `Result<Vec<u8>>` (a container)
//
//
// Data Flow (Decompression):
//
//   1. [Stateless API (decompress)]   -> Receives `&[u8]`
//         |
//         `-> calls `pipeline::decompress_grid`, returns samples + layout
//
//   2. [Text (write_rows)]            -> Emits one line per row
//
// `analyze` and `detect_format` only ever read the header.
//
// ====================================================================================
pub mod format;
pub mod stateless_api;
pub mod text;

// --- Stateless API ---
pub use stateless_api::{
    analyze, compress, compress_grid, decompress, decompress_grid, detect_format,
};

// --- Format Constants and Structs ---
pub use format::{CompressionStats, GridFormat, PREFIX_MAGIC, RICE_MAGIC};

// --- Text Form ---
pub use text::{format_rows, parse_rows, parse_str, write_rows};

#[cfg(test)]
mod tests;
