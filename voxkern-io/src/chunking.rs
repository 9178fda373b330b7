//! Stream sizing: records per chunk from an explicit memory budget.

use crate::{Error, Result};
use sysinfo::System;
use voxkern_core::record::RecordBatch;

/// Allocator and bookkeeping overhead over the raw column bytes.
const MEMORY_OVERHEAD_FACTOR: f64 = 1.2;

/// Default records per decoded chunk.
pub const DEFAULT_CHUNK_RECORDS: usize = 1_000_000;

/// Configuration for chunked record streaming.
///
/// Either a fixed records-per-chunk value, or a memory budget the chunk
/// size is derived from. The budget bounds the decoded batch, which is
/// the only O(chunk) allocation a pass makes.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Fixed records per chunk. If set, the memory budget is ignored.
    pub chunk_records: Option<usize>,
    /// Fraction of available system memory to target (0.0 < fraction <= 1.0).
    pub memory_fraction: f64,
    /// Explicit memory budget override (bytes).
    pub memory_budget_bytes: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_records: Some(DEFAULT_CHUNK_RECORDS),
            memory_fraction: 0.5,
            memory_budget_bytes: None,
        }
    }
}

impl StreamConfig {
    /// Set a fixed records-per-chunk value. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_chunk_records(mut self, records: usize) -> Self {
        self.chunk_records = Some(records.max(1));
        self
    }

    /// Derive the chunk size from a fraction of available system memory.
    #[must_use]
    pub fn with_memory_fraction(mut self, fraction: f64) -> Self {
        self.chunk_records = None;
        self.memory_fraction = fraction;
        self
    }

    /// Derive the chunk size from an explicit memory budget in bytes.
    #[must_use]
    pub fn with_memory_budget_bytes(mut self, bytes: usize) -> Self {
        self.chunk_records = None;
        self.memory_budget_bytes = Some(bytes);
        self
    }

    /// Resolve the records-per-chunk value for a pass.
    ///
    /// # Errors
    /// Returns an error if the memory fraction is invalid or system
    /// memory cannot be queried.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn resolve_chunk_records(&self) -> Result<usize> {
        if let Some(records) = self.chunk_records {
            return Ok(records.max(1));
        }
        let budget = self.resolve_budget_bytes()?;
        let per_record =
            (RecordBatch::DECODED_RECORD_BYTES as f64 * MEMORY_OVERHEAD_FACTOR).ceil() as usize;
        Ok((budget / per_record.max(1)).max(1))
    }

    fn resolve_budget_bytes(&self) -> Result<usize> {
        if let Some(bytes) = self.memory_budget_bytes {
            return Ok(bytes);
        }
        if !(0.0 < self.memory_fraction && self.memory_fraction <= 1.0) {
            return Err(Error::InvalidStreamConfig(
                "memory_fraction must be in (0.0, 1.0]".to_string(),
            ));
        }
        let mut system = System::new();
        system.refresh_memory();
        let available = system.available_memory();
        if available == 0 {
            return Err(Error::InvalidStreamConfig(
                "available system memory reported as 0".to_string(),
            ));
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let budget = (available as f64 * self.memory_fraction).floor() as u64;
        Ok(usize::try_from(budget).unwrap_or(usize::MAX))
    }
}
