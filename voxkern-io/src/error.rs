//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record format error.
    #[error("format error: {0}")]
    Format(#[from] voxkern_phsp::Error),

    /// Core configuration error.
    #[error("config error: {0}")]
    Core(#[from] voxkern_core::Error),

    /// Run metadata record count contradicts the file length.
    #[error("run metadata record count {metadata} does not match file record count {file}")]
    RecordCountMismatch { metadata: u64, file: u64 },

    /// Malformed run metadata sidecar.
    #[error("malformed run metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Invalid stream sizing configuration.
    #[error("invalid stream configuration: {0}")]
    InvalidStreamConfig(String),
}
