//! voxkern-core: Core types for voxel-kernel construction.
//!
//! This crate provides the foundational types shared by the streaming
//! decoder, the accumulation engine, and the command-line driver: the
//! columnar record batch, the voxel grid with its binning convention,
//! and the configuration error taxonomy.
//!

pub mod error;
pub mod grid;
pub mod record;

pub use error::{Error, Result};
pub use grid::{GridBounds, GridSpec, VoxelGrid};
pub use record::RecordBatch;
