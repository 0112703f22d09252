//! This file is the root of the `gridcodec` Rust crate.
//!
//! `gridcodec` is a lossless codec for row-structured grids of `i32` samples.
//! A grid is predicted into residuals, zigzag mapped, run folded and entropy
//! coded (Golomb-Rice or a prefix code) into a self-describing container.
//!
//! Its responsibilities here are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`pipeline`, `kernels`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Re-exporting the small public surface most callers need.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod bridge;
pub mod config;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod traits;
pub mod types;

#[doc(hidden)]
pub use log;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use bridge::{analyze, compress, decompress, detect_format, CompressionStats, GridFormat};
pub use config::CodecConfig;
pub use error::CodecError;
pub use types::{RowLayout, SampleGrid};
