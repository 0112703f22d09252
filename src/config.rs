// In: src/config.rs

//! The single source of truth for all gridcodec compression configuration.
//!
//! `CodecConfig` is created once at the application boundary (from a JSON file,
//! a named profile, or CLI flags) and passed by reference into the pipeline.
//! Every strategy is a closed enum, so the planner can match on it exhaustively.
//! Decompression never reads a config: the container describes itself.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CodecError;
pub use crate::kernels::prefix::PrefixConstruction;
pub use crate::kernels::rice::RiceParameter;
pub use crate::kernels::rle::{EscapePolicy, RunLengthCode, RunScope};

//==================================================================================
// I. Strategy Enums
//==================================================================================

/// How raw samples are turned into residuals.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictorMode {
    /// `x[i] - x[i-1]` over the flattened stream.
    FirstOrderDelta,
    /// **Default:** the first-order differences differenced once more.
    #[default]
    SecondOrderDelta,
    /// One of LEFT/UP/PAETH/MEDIAN per row, chosen by minimum residual sum.
    #[serde(rename = "neighbor_2d")]
    Neighbor2d,
}

/// Which entropy coder produces the payload bits.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntropyCoderKind {
    /// Per-block adaptive Golomb-Rice.
    GolombRice,
    /// **Default:** a prefix code built from observed frequencies.
    #[default]
    Prefix,
}

//==================================================================================
// II. Stage Configuration
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RunFoldingConfig {
    /// Minimum run length that is folded into a run token.
    #[serde(default = "default_run_threshold")]
    pub threshold: u32,
    #[serde(default)]
    pub scope: RunScope,
    #[serde(default)]
    pub length_code: RunLengthCode,
    #[serde(default)]
    pub escape: EscapePolicy,
}

impl Default for RunFoldingConfig {
    fn default() -> Self {
        Self {
            threshold: default_run_threshold(),
            scope: RunScope::default(),
            length_code: RunLengthCode::default(),
            escape: EscapePolicy::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RiceConfig {
    #[serde(default)]
    pub k: RiceParameter,
    /// Coded units per block. `0` keeps the whole stream in a single block.
    #[serde(default = "default_rice_block_size")]
    pub block_size: usize,
}

impl Default for RiceConfig {
    fn default() -> Self {
        Self {
            k: RiceParameter::default(),
            block_size: default_rice_block_size(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PrefixConfig {
    #[serde(default)]
    pub construction: PrefixConstruction,
}

//==================================================================================
// III. The Unified CodecConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    #[serde(default)]
    pub predictor: PredictorMode,

    #[serde(default)]
    pub coder: EntropyCoderKind,

    /// `None` (JSON `null`) disables run folding entirely.
    #[serde(default = "default_run_folding")]
    pub run_folding: Option<RunFoldingConfig>,

    /// Only consulted when `coder` is `golomb_rice`.
    #[serde(default)]
    pub rice: RiceConfig,

    /// Only consulted when `coder` is `prefix`.
    #[serde(default)]
    pub prefix: PrefixConfig,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            predictor: PredictorMode::default(),
            coder: EntropyCoderKind::default(),
            run_folding: default_run_folding(),
            rice: RiceConfig::default(),
            prefix: PrefixConfig::default(),
        }
    }
}

impl CodecConfig {
    pub fn from_json_str(json: &str) -> Result<Self, CodecError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CodecError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects settings no container could describe.
    pub fn validate(&self) -> Result<(), CodecError> {
        if let Some(folding) = &self.run_folding {
            if folding.threshold == 0 {
                return Err(CodecError::InvalidParameterError(
                    "run_folding.threshold must be at least 1".to_string(),
                ));
            }
            folding.length_code.validate()?;
            let max_length = folding.length_code.max_length();
            if folding.threshold > max_length {
                return Err(CodecError::InvalidParameterError(format!(
                    "run_folding.threshold {} exceeds the longest encodable run {}",
                    folding.threshold, max_length
                )));
            }
        }
        self.rice.k.validate()?;
        Ok(())
    }

    // --- Named profiles ---

    /// Every name accepted by `profile`.
    pub const PROFILE_NAMES: [&'static str; 5] = [
        "golomb_rice_basic",
        "golomb_rice_enhanced",
        "optimal_prefix",
        "canonical_prefix",
        "neighbor_prefix",
    ];

    /// Plain first-order delta with a single adaptive Rice block and no folding.
    pub fn golomb_rice_basic() -> Self {
        Self {
            predictor: PredictorMode::FirstOrderDelta,
            coder: EntropyCoderKind::GolombRice,
            run_folding: None,
            rice: RiceConfig {
                k: RiceParameter::Adaptive,
                block_size: 0,
            },
            prefix: PrefixConfig::default(),
        }
    }

    /// Blocked Rice with zero runs flagged out-of-band and 16-bit run lengths.
    pub fn golomb_rice_enhanced() -> Self {
        Self {
            predictor: PredictorMode::FirstOrderDelta,
            coder: EntropyCoderKind::GolombRice,
            run_folding: Some(RunFoldingConfig {
                threshold: default_run_threshold(),
                scope: RunScope::ZerosOnly,
                length_code: RunLengthCode::Fixed { width: 16 },
                escape: EscapePolicy::FlagBit,
            }),
            rice: RiceConfig::default(),
            prefix: PrefixConfig::default(),
        }
    }

    /// Second-order delta, any-symbol folding and a heap-built code.
    pub fn optimal_prefix() -> Self {
        Self {
            predictor: PredictorMode::SecondOrderDelta,
            coder: EntropyCoderKind::Prefix,
            run_folding: Some(RunFoldingConfig::default()),
            rice: RiceConfig::default(),
            prefix: PrefixConfig {
                construction: PrefixConstruction::Heap,
            },
        }
    }

    /// Second-order delta, zero-run folding with gamma lengths, canonical code.
    pub fn canonical_prefix() -> Self {
        Self {
            predictor: PredictorMode::SecondOrderDelta,
            coder: EntropyCoderKind::Prefix,
            run_folding: Some(RunFoldingConfig {
                threshold: default_run_threshold(),
                scope: RunScope::ZerosOnly,
                length_code: RunLengthCode::Gamma,
                escape: EscapePolicy::MaxPlusOne,
            }),
            rice: RiceConfig::default(),
            prefix: PrefixConfig {
                construction: PrefixConstruction::Canonical,
            },
        }
    }

    /// Per-row 2D prediction feeding the heap-built code.
    pub fn neighbor_prefix() -> Self {
        Self {
            predictor: PredictorMode::Neighbor2d,
            ..Self::optimal_prefix()
        }
    }

    /// Looks up a profile by its snake_case name.
    pub fn profile(name: &str) -> Result<Self, CodecError> {
        match name {
            "golomb_rice_basic" => Ok(Self::golomb_rice_basic()),
            "golomb_rice_enhanced" => Ok(Self::golomb_rice_enhanced()),
            "optimal_prefix" => Ok(Self::optimal_prefix()),
            "canonical_prefix" => Ok(Self::canonical_prefix()),
            "neighbor_prefix" => Ok(Self::neighbor_prefix()),
            other => Err(CodecError::InvalidParameterError(format!(
                "unknown profile '{}'",
                other
            ))),
        }
    }
}

/// Provides the default fold threshold for serde.
fn default_run_threshold() -> u32 {
    4
}

fn default_rice_block_size() -> usize {
    1024
}

/// Run folding is on unless a config explicitly turns it off.
fn default_run_folding() -> Option<RunFoldingConfig> {
    Some(RunFoldingConfig::default())
}

//==================================================================================
// IV. Unit Tests
//==================================================================================
