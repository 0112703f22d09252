// In: src/pipeline/mod.rs

//! The grid compression pipeline: planner, executor and container artifact.
//!
//! ```text
//! samples + layout ──> planner ──> GridPlan
//!                                    │
//!                                executor (transform, zigzag, fold, code)
//!                                    │
//!                                artifact ──> container bytes
//! ```

pub mod artifact;
pub mod executor;
pub mod models;
pub mod orchestrator;
pub mod planner;

pub use orchestrator::{compress_grid, decompress_grid};
