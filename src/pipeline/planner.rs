// In: src/pipeline/planner.rs

//! The grid planner.
//!
//! Planning happens in two phases. `plan_grid` makes every decision that only
//! needs the raw samples: the transform (including the per-row 2D predictor
//! choice) and the coder. `finalize_run_folding` runs after the token stream
//! exists and fixes the escape marker, which depends on the symbols actually
//! present. Neither phase produces any payload bits.

use crate::config::{CodecConfig, EntropyCoderKind, PredictorMode, RunFoldingConfig};
use crate::error::CodecError;
use crate::kernels::neighbor;
use crate::kernels::rle::{self, Escape, Token};
use crate::pipeline::models::{
    CoderChoice, GridPlan, PredictorUsage, RunFoldDescriptor, TransformDescriptor,
};
use crate::types::RowLayout;

//==================================================================================
// 1. Phase One: data-only decisions
//==================================================================================

fn plan_transform(
    samples: &[i32],
    layout: &RowLayout,
    mode: PredictorMode,
) -> TransformDescriptor {
    match mode {
        PredictorMode::FirstOrderDelta => TransformDescriptor::Delta { passes: 1 },
        PredictorMode::SecondOrderDelta => TransformDescriptor::Delta { passes: 2 },
        PredictorMode::Neighbor2d => {
            let predictors = neighbor::choose_predictors(samples, layout.lengths());
            let usage = PredictorUsage::count(&predictors);
            log::info!(
                "Row predictors over {} rows: LEFT={} UP={} PAETH={} MEDIAN={}",
                predictors.len(),
                usage.left,
                usage.up,
                usage.paeth,
                usage.median
            );
            TransformDescriptor::Neighbor { predictors }
        }
    }
}

/// Decides the transform and coder for one grid.
pub fn plan_grid(
    samples: &[i32],
    layout: &RowLayout,
    config: &CodecConfig,
) -> Result<GridPlan, CodecError> {
    config.validate()?;
    layout.check_total(samples.len())?;

    if samples.is_empty() {
        log::warn!(
            "Planning an empty grid ({} rows); the container will be header-only",
            layout.row_count()
        );
    }

    let transform = plan_transform(samples, layout, config.predictor);
    let coder = match config.coder {
        EntropyCoderKind::GolombRice => CoderChoice::GolombRice(config.rice),
        EntropyCoderKind::Prefix => CoderChoice::Prefix(config.prefix.construction),
    };

    log::info!(
        "Planned grid: {} samples, {} rows, transform mode {}, coder {:?}, run folding {}",
        samples.len(),
        layout.row_count(),
        transform.mode_id(),
        coder.kind(),
        if config.run_folding.is_some() { "on" } else { "off" }
    );

    Ok(GridPlan {
        transform,
        run_folding: config.run_folding,
        coder,
    })
}

//==================================================================================
// 2. Phase Two: decisions that need the folded token stream
//==================================================================================

/// Fixes the escape for `tokens`. Returns `None` when folding found no runs, so
/// the container records folding as off and no escape has to be reserved.
pub fn finalize_run_folding(
    config: &RunFoldingConfig,
    tokens: &[Token],
) -> Result<Option<RunFoldDescriptor>, CodecError> {
    let run_count = rle::run_count(tokens);
    if run_count == 0 {
        log::debug!("Run folding found no runs; recording folding as off");
        return Ok(None);
    }

    let escape = rle::resolve_escape(config.escape, tokens)?;
    match escape {
        Escape::Symbol(symbol) => log::info!(
            "Run folding: {} runs, escape symbol {} ({:?})",
            run_count,
            symbol,
            config.escape
        ),
        Escape::FlagBit => log::info!("Run folding: {} runs, flag-bit escape", run_count),
    }

    Ok(Some(RunFoldDescriptor {
        threshold: config.threshold,
        scope: config.scope,
        length_code: config.length_code,
        escape_policy: config.escape,
        escape,
        run_count,
    }))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
