//! Memory-mapped record file readers.
//!

use crate::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use voxkern_core::record::RecordBatch;
use voxkern_phsp::RecordLayout;

/// A memory-mapped file reader.
///
/// Uses memmap2 to efficiently access file contents without
/// loading the entire file into memory.
pub struct MappedFileReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path the reader was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A record file with a fixed binary layout.
///
/// Opening validates that the file length is an exact multiple of the
/// layout's record width, so every stream derived from the file decodes
/// whole records. Streams are lazy, finite, and restartable: each call
/// to [`Self::batches`] starts a fresh pass from the first record, which
/// is what the event-level uncertainty pass relies on.
pub struct RecordFile<L> {
    reader: MappedFileReader,
    _layout: PhantomData<L>,
}

impl<L: RecordLayout> RecordFile<L> {
    /// Opens a record file and validates its length.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or mapped, or if its
    /// length is not a multiple of the record width.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        L::validate_size(reader.len() as u64).map_err(Error::Format)?;
        Ok(Self {
            reader,
            _layout: PhantomData,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Total record count (file length / record width).
    ///
    /// Used for progress reporting and for cross-checks against run
    /// metadata.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.reader.len() / L::RECORD_BYTES
    }

    /// Returns the path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Returns a fresh pass over the file as decoded batches of up to
    /// `chunk_records` records. Chunk size is a pure performance
    /// parameter; it never changes what a full pass yields.
    #[must_use]
    pub fn batches(&self, chunk_records: usize) -> RecordBatches<L> {
        RecordBatches {
            mmap: Arc::clone(&self.reader.mmap),
            offset: 0,
            chunk_bytes: chunk_records.max(1) * L::RECORD_BYTES,
            _layout: PhantomData,
        }
    }
}

/// Lazy iterator of decoded record batches over a mapped file.
///
/// Owns the underlying mapping, so it can outlive the [`RecordFile`]
/// that created it.
pub struct RecordBatches<L> {
    mmap: Arc<Mmap>,
    offset: usize,
    chunk_bytes: usize,
    _layout: PhantomData<L>,
}

impl<L: RecordLayout> Iterator for RecordBatches<L> {
    type Item = RecordBatch;

    fn next(&mut self) -> Option<Self::Item> {
        let data = &self.mmap[..];
        if self.offset >= data.len() {
            return None;
        }
        let end = (self.offset + self.chunk_bytes).min(data.len());
        let mut batch = RecordBatch::with_capacity((end - self.offset) / L::RECORD_BYTES);
        L::decode_into(&data[self.offset..end], &mut batch);
        self.offset = end;
        Some(batch)
    }
}
