//! Fixed-width binary record layouts.
//!
//! Both layouts are little-endian with no padding. Decoders fill an SoA
//! [`RecordBatch`] from a byte slice whose length is a multiple of the
//! record width; enforcing that multiple is the stream's job.

use crate::{Error, Result};
use voxkern_core::record::RecordBatch;

/// A fixed-width binary record layout.
///
/// Implementors tie a record byte width to the decoder that extracts the
/// position, second vector, energy, and identifier fields into a batch.
pub trait RecordLayout {
    /// On-disk record width in bytes.
    const RECORD_BYTES: usize;

    /// Decodes `bytes` (a whole number of records) into `batch`.
    ///
    /// Trailing bytes shorter than one record are ignored; callers are
    /// expected to hand in exact multiples of [`Self::RECORD_BYTES`].
    fn decode_into(bytes: &[u8], batch: &mut RecordBatch);

    /// Validates a total byte length against the record width.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedFile`] when `size` is not an exact
    /// multiple of the record width.
    fn validate_size(size: u64) -> Result<()> {
        if size % (Self::RECORD_BYTES as u64) != 0 {
            return Err(Error::TruncatedFile {
                size,
                width: Self::RECORD_BYTES,
            });
        }
        Ok(())
    }
}

/// Particle (phase-space) records: 60 bytes.
///
/// Field order: f32x3 source position, f32x3 source direction, f32x3
/// detection position, f32x3 detection direction, f32 energy, u32 event
/// id, i32 track id. The production kernel bins emission points, so the
/// batch carries the source block; the detection block is decoded past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleLayout;

impl RecordLayout for ParticleLayout {
    const RECORD_BYTES: usize = 60;

    fn decode_into(bytes: &[u8], batch: &mut RecordBatch) {
        for rec in bytes.chunks_exact(Self::RECORD_BYTES) {
            batch.push(
                [f32_le(rec, 0), f32_le(rec, 4), f32_le(rec, 8)],
                [f32_le(rec, 12), f32_le(rec, 16), f32_le(rec, 20)],
                f32_le(rec, 48),
                u32_le(rec, 52),
                i32_le(rec, 56),
            );
        }
    }
}

/// Dose (energy-deposition) records: 36 bytes.
///
/// Field order: f32x3 deposition position, f32x3 displacement from the
/// primary vertex, f32 deposited energy, u32 event id, i32 particle-type
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoseLayout;

impl RecordLayout for DoseLayout {
    const RECORD_BYTES: usize = 36;

    fn decode_into(bytes: &[u8], batch: &mut RecordBatch) {
        for rec in bytes.chunks_exact(Self::RECORD_BYTES) {
            batch.push(
                [f32_le(rec, 0), f32_le(rec, 4), f32_le(rec, 8)],
                [f32_le(rec, 12), f32_le(rec, 16), f32_le(rec, 20)],
                f32_le(rec, 24),
                u32_le(rec, 28),
                i32_le(rec, 32),
            );
        }
    }
}

// Field readers. The slice arithmetic is in bounds for every call site
// because offsets stay below RECORD_BYTES - 4 and records come from
// chunks_exact(RECORD_BYTES).
fn f32_le(rec: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(rec[offset..offset + 4].try_into().unwrap())
}

fn u32_le(rec: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(rec[offset..offset + 4].try_into().unwrap())
}

fn i32_le(rec: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(rec[offset..offset + 4].try_into().unwrap())
}
