//! voxkern-phsp: Byte-exact record layouts and sidecar headers.
//!
//! This crate knows the on-disk shape of the two supported record
//! formats and nothing about files: decoding operates on byte slices,
//! and the plain-text header sidecar is parsed from a string.
//!
//! # Key Components
//!
//! - [`RecordLayout`] - Trait tying a fixed record width to its decoder
//! - [`ParticleLayout`] / [`DoseLayout`] - The two production layouts
//! - [`SidecarHeader`] - `key: value` header sidecar with layout checks

mod error;
mod header;
mod layout;

pub use error::{Error, Result};
pub use header::SidecarHeader;
pub use layout::{DoseLayout, ParticleLayout, RecordLayout};

// Re-export the batch type decoders fill, for convenience.
pub use voxkern_core::record::RecordBatch;
