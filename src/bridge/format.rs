// In: src/bridge/format.rs

//! Defines the on-disk identifiers of the gridcodec container and the
//! public-facing analysis struct. The full byte layout is owned by
//! `pipeline::artifact`; this module only names the variants.

use serde::Serialize;
use std::fmt;

use crate::config::EntropyCoderKind;
use crate::error::CodecError;

//==================================================================================
// I. Container Variants
//==================================================================================

/// The magic number of a container whose payload is Golomb-Rice coded.
pub const RICE_MAGIC: &[u8; 4] = b"GRDR";
/// The magic number of a container whose payload is prefix coded.
pub const PREFIX_MAGIC: &[u8; 4] = b"GRDP";

/// The variant tag carried by a container's magic.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GridFormat {
    GolombRice,
    Prefix,
}

impl GridFormat {
    pub fn magic(self) -> &'static [u8; 4] {
        match self {
            Self::GolombRice => RICE_MAGIC,
            Self::Prefix => PREFIX_MAGIC,
        }
    }

    pub fn from_magic(magic: &[u8]) -> Result<Self, CodecError> {
        if magic == RICE_MAGIC {
            Ok(Self::GolombRice)
        } else if magic == PREFIX_MAGIC {
            Ok(Self::Prefix)
        } else {
            Err(CodecError::FormatError(format!(
                "invalid container magic {:?}",
                String::from_utf8_lossy(magic)
            )))
        }
    }

    pub fn coder_kind(self) -> EntropyCoderKind {
        match self {
            Self::GolombRice => EntropyCoderKind::GolombRice,
            Self::Prefix => EntropyCoderKind::Prefix,
        }
    }
}

impl fmt::Display for GridFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GolombRice => write!(f, "golomb-rice"),
            Self::Prefix => write!(f, "prefix"),
        }
    }
}

/// Identifies a container by its first four bytes. `None` for anything else,
/// which is how the CLI tells a text grid from a compressed one.
pub fn detect_format(bytes: &[u8]) -> Option<GridFormat> {
    bytes.get(..4).and_then(|m| GridFormat::from_magic(m).ok())
}

//==================================================================================
// II. Analysis Results
//==================================================================================

/// The public-facing struct for compression analysis results, returned by `analyze`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CompressionStats {
    pub format: GridFormat,
    pub header_size: usize,
    pub payload_size: usize,
    pub total_size: usize,
    pub sample_count: u32,
    pub row_count: usize,
    /// JSON digest of the transform, run folding and coder recorded in the header.
    pub plan_json: String,
}
