//! Structure of Arrays (`SoA`) record batches.
//!
//! Decoded event records are stored in parallel vectors rather than an
//! array of structs. This layout works better with modern CPU caches and
//! keeps the per-record footprint identical for every supported layout.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A batch of decoded records in Structure of Arrays (`SoA`) format.
///
/// `x/y/z` is the record position; `rx/ry/rz` is the record's second
/// vector (direction at the source point, or displacement from the
/// primary vertex, depending on the layout). Batches are immutable once
/// a decoding pass hands them out.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordBatch {
    /// Columnar storage for X positions.
    pub x: Vec<f32>,
    /// Columnar storage for Y positions.
    pub y: Vec<f32>,
    /// Columnar storage for Z positions.
    pub z: Vec<f32>,
    /// Columnar storage for the second vector, X component.
    pub rx: Vec<f32>,
    /// Columnar storage for the second vector, Y component.
    pub ry: Vec<f32>,
    /// Columnar storage for the second vector, Z component.
    pub rz: Vec<f32>,
    /// Columnar storage for the scalar energy/weight field.
    pub energy: Vec<f32>,
    /// Columnar storage for event identifiers.
    pub event_id: Vec<u32>,
    /// Columnar storage for secondary identifiers (track or type code).
    pub secondary_id: Vec<i32>,
}

impl RecordBatch {
    /// In-memory footprint of one decoded record across all columns.
    pub const DECODED_RECORD_BYTES: usize =
        std::mem::size_of::<f32>() * 7 + std::mem::size_of::<u32>() + std::mem::size_of::<i32>();

    /// Creates a new empty batch with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            rx: Vec::with_capacity(capacity),
            ry: Vec::with_capacity(capacity),
            rz: Vec::with_capacity(capacity),
            energy: Vec::with_capacity(capacity),
            event_id: Vec::with_capacity(capacity),
            secondary_id: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Clears all columns, keeping their capacity.
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.z.clear();
        self.rx.clear();
        self.ry.clear();
        self.rz.clear();
        self.energy.clear();
        self.event_id.clear();
        self.secondary_id.clear();
    }

    /// Appends all records from another batch to this one.
    pub fn append(&mut self, other: &RecordBatch) {
        self.x.extend_from_slice(&other.x);
        self.y.extend_from_slice(&other.y);
        self.z.extend_from_slice(&other.z);
        self.rx.extend_from_slice(&other.rx);
        self.ry.extend_from_slice(&other.ry);
        self.rz.extend_from_slice(&other.rz);
        self.energy.extend_from_slice(&other.energy);
        self.event_id.extend_from_slice(&other.event_id);
        self.secondary_id.extend_from_slice(&other.secondary_id);
    }

    /// Pushes a single record into the batch.
    pub fn push(
        &mut self,
        position: [f32; 3],
        second: [f32; 3],
        energy: f32,
        event_id: u32,
        secondary_id: i32,
    ) {
        self.x.push(position[0]);
        self.y.push(position[1]);
        self.z.push(position[2]);
        self.rx.push(second[0]);
        self.ry.push(second[1]);
        self.rz.push(second[2]);
        self.energy.push(energy);
        self.event_id.push(event_id);
        self.secondary_id.push(secondary_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_batch_operations() {
        let mut batch = RecordBatch::with_capacity(4);
        assert!(batch.is_empty());

        batch.push([1.0, 2.0, 3.0], [0.0, 0.0, 1.0], 0.5, 7, -1);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.x[0], 1.0);
        assert_eq!(batch.event_id[0], 7);
        assert_eq!(batch.secondary_id[0], -1);

        batch.push([4.0, 5.0, 6.0], [1.0, 0.0, 0.0], 1.5, 8, 22);
        assert_eq!(batch.len(), 2);

        let mut merged = RecordBatch::default();
        merged.append(&batch);
        assert_eq!(merged, batch);

        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_decoded_record_bytes() {
        // 7 f32 columns + u32 + i32
        assert_eq!(RecordBatch::DECODED_RECORD_BYTES, 36);
    }
}
