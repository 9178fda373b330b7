//! voxkern-io: Memory-mapped record streams and sidecar I/O.
//!
//! This crate provides efficient record-file reading via memmap2,
//! restartable chunked batch streams with memory-bounded sizing, the
//! JSON run-metadata sidecar, and the kernel output writers.
//!

mod chunking;
mod error;
mod reader;
mod sidecar;
mod writer;

pub use chunking::{StreamConfig, DEFAULT_CHUNK_RECORDS};
pub use error::{Error, Result};
pub use reader::{MappedFileReader, RecordBatches, RecordFile};
pub use sidecar::{resolve_primaries, RunMetadata};
pub use writer::KernelWriter;
