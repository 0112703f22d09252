// In: src/pipeline/models.rs

//! The in-memory descriptions of every decision recorded in a container header.
//!
//! The planner produces a `GridPlan` (decisions that only need the raw data),
//! the executor turns it into descriptors (decisions that need the folded
//! token stream, such as the escape symbol and the code table), and the
//! artifact serializes those descriptors. `PlanSummary` is the JSON-friendly
//! view used for diagnostics.

use serde::Serialize;

use crate::config::{EntropyCoderKind, PrefixConstruction, RiceConfig, RunFoldingConfig};
use crate::error::CodecError;
use crate::kernels::neighbor::Predictor2d;
use crate::kernels::prefix::CodeTable;
use crate::kernels::rice::RiceBlock;
use crate::kernels::rle::{Escape, EscapePolicy, RunCoding, RunLengthCode, RunScope};

//==================================================================================
// 1. Plan (decided before any bits are produced)
//==================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformDescriptor {
    Delta { passes: u8 },
    Neighbor { predictors: Vec<Predictor2d> },
}

impl TransformDescriptor {
    pub fn mode_id(&self) -> u8 {
        match self {
            Self::Delta { passes } => passes.saturating_sub(1),
            Self::Neighbor { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoderChoice {
    GolombRice(RiceConfig),
    Prefix(PrefixConstruction),
}

impl CoderChoice {
    pub fn kind(&self) -> EntropyCoderKind {
        match self {
            Self::GolombRice(_) => EntropyCoderKind::GolombRice,
            Self::Prefix(_) => EntropyCoderKind::Prefix,
        }
    }
}

/// Everything the executor needs to encode one grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlan {
    pub transform: TransformDescriptor,
    pub run_folding: Option<RunFoldingConfig>,
    pub coder: CoderChoice,
}

//==================================================================================
// 2. Descriptors (what the container header records)
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunFoldDescriptor {
    pub threshold: u32,
    pub scope: RunScope,
    pub length_code: RunLengthCode,
    pub escape_policy: EscapePolicy,
    pub escape: Escape,
    pub run_count: usize,
}

impl RunFoldDescriptor {
    pub fn coding(&self) -> RunCoding {
        RunCoding {
            escape: self.escape,
            length_code: self.length_code,
        }
    }
}

/// Whether Rice parameters were derived from the data or fixed by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiceKMode {
    Adaptive,
    Fixed,
}

impl RiceKMode {
    pub fn id(self) -> u8 {
        match self {
            Self::Adaptive => 0,
            Self::Fixed => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, CodecError> {
        match id {
            0 => Ok(Self::Adaptive),
            1 => Ok(Self::Fixed),
            _ => Err(CodecError::FormatError(format!("unknown Rice k mode {}", id))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoderDescriptor {
    GolombRice {
        k_mode: RiceKMode,
        blocks: Vec<RiceBlock>,
    },
    Prefix(CodeTable),
}

//==================================================================================
// 3. Diagnostics View
//==================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictorUsage {
    pub left: usize,
    pub up: usize,
    pub paeth: usize,
    pub median: usize,
}

impl PredictorUsage {
    pub fn count(predictors: &[Predictor2d]) -> Self {
        let mut usage = Self {
            left: 0,
            up: 0,
            paeth: 0,
            median: 0,
        };
        for p in predictors {
            match p {
                Predictor2d::Left => usage.left += 1,
                Predictor2d::Up => usage.up += 1,
                Predictor2d::Paeth => usage.paeth += 1,
                Predictor2d::Median => usage.median += 1,
            }
        }
        usage
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSummary {
    FirstOrderDelta,
    SecondOrderDelta,
    Neighbor2d { predictor_usage: PredictorUsage },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFoldSummary {
    pub threshold: u32,
    pub scope: RunScope,
    pub length_code: RunLengthCode,
    pub escape_policy: EscapePolicy,
    pub escape_symbol: Option<u32>,
    pub run_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoderSummary {
    GolombRice {
        k_mode: RiceKMode,
        block_count: usize,
        k_per_block: Vec<u8>,
    },
    Prefix {
        construction: PrefixConstruction,
        table_entries: usize,
        longest_code: u8,
    },
}

/// A serializable digest of a container header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub transform: TransformSummary,
    pub run_folding: Option<RunFoldSummary>,
    pub coder: CoderSummary,
}

impl PlanSummary {
    pub fn describe(
        transform: &TransformDescriptor,
        run_folding: Option<&RunFoldDescriptor>,
        coder: &CoderDescriptor,
    ) -> Self {
        let transform = match transform {
            TransformDescriptor::Delta { passes } if *passes <= 1 => {
                TransformSummary::FirstOrderDelta
            }
            TransformDescriptor::Delta { .. } => TransformSummary::SecondOrderDelta,
            TransformDescriptor::Neighbor { predictors } => TransformSummary::Neighbor2d {
                predictor_usage: PredictorUsage::count(predictors),
            },
        };
        let run_folding = run_folding.map(|r| RunFoldSummary {
            threshold: r.threshold,
            scope: r.scope,
            length_code: r.length_code,
            escape_policy: r.escape_policy,
            escape_symbol: match r.escape {
                Escape::Symbol(s) => Some(s),
                Escape::FlagBit => None,
            },
            run_count: r.run_count,
        });
        let coder = match coder {
            CoderDescriptor::GolombRice { k_mode, blocks } => CoderSummary::GolombRice {
                k_mode: *k_mode,
                block_count: blocks.len(),
                k_per_block: blocks.iter().map(|b| b.k).collect(),
            },
            CoderDescriptor::Prefix(table) => CoderSummary::Prefix {
                construction: table.construction,
                table_entries: table.len(),
                longest_code: table.iter().map(|(_, c)| c.len).max().unwrap_or(0),
            },
        };
        Self {
            transform,
            run_folding,
            coder,
        }
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }
}
