//! Kernel error types.

use thiserror::Error;

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kernel error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Core configuration error.
    #[error("config error: {0}")]
    Core(#[from] voxkern_core::Error),

    /// Two accumulation states with different grid shapes cannot combine.
    #[error("array shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },
}
