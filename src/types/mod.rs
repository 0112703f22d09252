//! This module defines the core, strongly-typed data representations shared by
//! the pipeline, the container and the text collaborators.
//!
//! It currently includes the `RowLayout` (row lengths of one grid), its
//! on-disk `LayoutDescriptor`, and the `SampleGrid` convenience wrapper.

pub mod row_layout;

// Re-export the main type(s) for easier access.
pub use row_layout::{LayoutDescriptor, RowLayout, SampleGrid};
