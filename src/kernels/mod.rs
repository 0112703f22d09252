//! This module collects all pure, stateless codec kernels.
//!
//! Each kernel owns one reversible stage of the grid pipeline and knows nothing
//! about the container or the configuration layer. The `pipeline::executor` is
//! the only module that chains them together.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Layer 0: Bit-level plumbing shared by every entropy coder.
pub mod bitio;

/// Layer 1: Value Reduction (prediction into residuals)
pub mod delta;
pub mod neighbor;

/// Layer 2: Signed-to-unsigned mapping
pub mod zigzag;

/// Layer 3: Sparsity Exploitation
pub mod rle;

/// Byte-level varints for the container header
pub mod leb128;

/// Final Stage: Entropy Coding
pub mod prefix;
pub mod rice;
