// In: src/error.rs

//! This module defines the single, unified error type for the entire gridcodec library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every variant is fatal for the current compress/decompress call. Nothing is
//! retried internally and no partially reconstructed output is ever returned.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    // =========================================================================
    // === Codec Taxonomy (Specific to our container and pipeline)
    // =========================================================================
    /// Magic mismatch, unknown format tag or mode byte, malformed header framing.
    #[error("Container format error: {0}")]
    FormatError(String),

    /// A bit stream or header ran out before the declared counts were reached.
    #[error("Truncated input: {0}")]
    TruncationError(String),

    /// Declared structure disagrees with the decoded data (layout sums, run
    /// overruns, bit paths that match no code).
    #[error("Consistency check failed: {0}")]
    ConsistencyError(String),

    /// A configuration or side-table value that the codec cannot honour.
    #[error("Invalid parameter: {0}")]
    InvalidParameterError(String),

    /// The text collaborator found something that is not an integer.
    #[error("Text parse error on line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a config
    /// or rendering the plan for `analyze`.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl CodecError {
    /// Shorthand used by every bit/byte reader when input runs dry.
    pub(crate) fn end_of_stream(context: &str) -> Self {
        CodecError::TruncationError(format!("unexpected end of stream while reading {}", context))
    }
}
