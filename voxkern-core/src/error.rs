//! Error types for voxkern-core.

use thiserror::Error;

/// Result type alias for voxkern operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors shared across the voxkern crates.
///
/// All variants are fatal: a run aborts before any output is written.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry bounds are unusable for grid construction.
    #[error("invalid bounds on {axis} axis: [{min}, {max}] must be finite with min <= max")]
    InvalidBounds { axis: char, min: f64, max: f64 },

    /// Voxel size clamp range is empty or non-positive.
    #[error("invalid voxel size range [{min}, {max}]: must be positive with min <= max")]
    InvalidVoxelSize { min: f64, max: f64 },

    /// Target bin count for the largest axis must be at least one.
    #[error("target bin count must be at least 1")]
    InvalidTargetBins,

    /// Edge interpolation collapsed two consecutive edges.
    #[error("edge sequence is not strictly increasing on {axis} axis")]
    DegenerateEdges { axis: char },

    /// Primaries count must be positive to normalize a kernel.
    #[error("number of primaries must be positive")]
    InvalidPrimaries,

    /// No primaries count available from metadata, header, or the caller.
    #[error("primaries count not found; provide run metadata, a header sidecar, or an explicit value")]
    MissingPrimaries,

    /// An explicitly supplied primaries count contradicts run metadata.
    #[error("explicit primaries count {declared} contradicts run metadata value {metadata}")]
    PrimariesMismatch { declared: u64, metadata: u64 },

    /// Medium density for dose conversion must be positive.
    #[error("density must be positive, got {0} g/cm^3")]
    InvalidDensity(f64),
}
