//! Format error types.

use thiserror::Error;

/// Result type for record-format operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Record-format error types. All fatal.
#[derive(Error, Debug)]
pub enum Error {
    /// File length is not an exact multiple of the record width.
    #[error("file size {size} is not a multiple of record width {width}")]
    TruncatedFile { size: u64, width: usize },

    /// Header sidecar declares a format version this crate cannot decode.
    #[error("unsupported format version {0}; only version 2 is supported")]
    UnsupportedVersion(u32),

    /// Header sidecar declares a record width contradicting the layout.
    #[error("header record width {header} does not match layout width {layout}")]
    WidthMismatch { header: usize, layout: usize },

    /// I/O error while reading a sidecar.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
