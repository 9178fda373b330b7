//! Single-pass weighted 3D histogram accumulation.
//!
//! One O(N) pass over the stream; extra memory is O(voxel count),
//! independent of file size. The reduction over chunks is commutative
//! and associative, which is what makes chunk size a pure performance
//! parameter (see [`AccumulatorState::merge`]).

use crate::{Error, Result};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use voxkern_core::grid::VoxelGrid;
use voxkern_core::record::RecordBatch;

/// Per-record weight entering the histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    /// Unit weight per record (production-count kernels).
    Count,
    /// The record's energy field (deposition kernels).
    Energy,
}

/// Which decoded vector is binned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinningField {
    /// World-coordinate position (`x/y/z` columns).
    Position,
    /// Second vector: displacement from the primary vertex (`rx/ry/rz`).
    Displacement,
}

impl BinningField {
    /// Selected coordinates of record `i` in `batch`, widened to f64.
    #[inline]
    #[must_use]
    pub fn coords(self, batch: &RecordBatch, i: usize) -> [f64; 3] {
        match self {
            Self::Position => [
                f64::from(batch.x[i]),
                f64::from(batch.y[i]),
                f64::from(batch.z[i]),
            ],
            Self::Displacement => [
                f64::from(batch.rx[i]),
                f64::from(batch.ry[i]),
                f64::from(batch.rz[i]),
            ],
        }
    }
}

impl WeightMode {
    /// Weight of record `i` in `batch`.
    #[inline]
    #[must_use]
    pub fn weight(self, batch: &RecordBatch, i: usize) -> f64 {
        match self {
            Self::Count => 1.0,
            Self::Energy => f64::from(batch.energy[i]),
        }
    }
}

/// Streaming weighted-histogram accumulator.
///
/// Feed it every batch of exactly one pass, then take the state with
/// [`Self::into_state`]. Records outside the grid are excluded from the
/// arrays and tallied separately.
pub struct Accumulator {
    grid: VoxelGrid,
    weight: WeightMode,
    field: BinningField,
    sum_w: Array3<f64>,
    sum_w2: Array3<f64>,
    count: Array3<u64>,
    weight_read: f64,
    weight_outside: f64,
    records_read: u64,
    records_outside: u64,
}

impl Accumulator {
    /// Creates an accumulator over `grid`.
    #[must_use]
    pub fn new(grid: VoxelGrid, weight: WeightMode, field: BinningField) -> Self {
        let shape = grid.shape();
        let dim = (shape.0, shape.1, shape.2);
        Self {
            grid,
            weight,
            field,
            sum_w: Array3::zeros(dim),
            sum_w2: Array3::zeros(dim),
            count: Array3::zeros(dim),
            weight_read: 0.0,
            weight_outside: 0.0,
            records_read: 0,
            records_outside: 0,
        }
    }

    /// Accumulates one decoded batch.
    ///
    /// Bin lookup is a binary search per axis against the sorted edge
    /// arrays; the binning convention (right-open, final bin closed)
    /// lives on [`VoxelGrid::find_bin`].
    pub fn accumulate(&mut self, batch: &RecordBatch) {
        for i in 0..batch.len() {
            let w = self.weight.weight(batch, i);
            self.weight_read += w;
            self.records_read += 1;
            match self.grid.find_bin(self.field.coords(batch, i)) {
                Some((ix, iy, iz)) => {
                    self.sum_w[[ix, iy, iz]] += w;
                    self.sum_w2[[ix, iy, iz]] += w * w;
                    self.count[[ix, iy, iz]] += 1;
                }
                None => {
                    self.weight_outside += w;
                    self.records_outside += 1;
                }
            }
        }
    }

    /// Finishes the pass. The returned state is read-only from here on.
    #[must_use]
    pub fn into_state(self) -> AccumulatorState {
        AccumulatorState {
            grid: self.grid,
            sum_w: self.sum_w,
            sum_w2: self.sum_w2,
            count: self.count,
            weight_read: self.weight_read,
            weight_outside: self.weight_outside,
            records_read: self.records_read,
            records_outside: self.records_outside,
        }
    }
}

/// Completed accumulation state of exactly one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorState {
    /// The grid the arrays are shaped by.
    pub grid: VoxelGrid,
    /// Per-voxel weight sums.
    pub sum_w: Array3<f64>,
    /// Per-voxel squared-weight sums.
    pub sum_w2: Array3<f64>,
    /// Per-voxel record counts.
    pub count: Array3<u64>,
    /// Total weight of every record read, inside the grid or not.
    pub weight_read: f64,
    /// Weight tallied for records outside every bin range.
    pub weight_outside: f64,
    /// Records read.
    pub records_read: u64,
    /// Records tallied outside the grid.
    pub records_outside: u64,
}

impl AccumulatorState {
    /// Weight captured by the grid (sum over all voxels).
    #[must_use]
    pub fn weight_in_grid(&self) -> f64 {
        self.sum_w.sum()
    }

    /// Records captured by the grid.
    #[must_use]
    pub fn records_in_grid(&self) -> u64 {
        self.count.sum()
    }

    /// Folds another pass fragment into this one.
    ///
    /// The reduction is commutative and associative, so any chunking of
    /// the input stream merges to the same state. Single-threaded by
    /// design; a parallel caller would only need to serialize this step.
    ///
    /// # Errors
    /// Returns an error when the two fragments have different shapes.
    pub fn merge(&mut self, other: &AccumulatorState) -> Result<()> {
        if self.sum_w.dim() != other.sum_w.dim() {
            return Err(Error::ShapeMismatch {
                left: self.sum_w.dim(),
                right: other.sum_w.dim(),
            });
        }
        self.sum_w += &other.sum_w;
        self.sum_w2 += &other.sum_w2;
        self.count += &other.count;
        self.weight_read += other.weight_read;
        self.weight_outside += other.weight_outside;
        self.records_read += other.records_read;
        self.records_outside += other.records_outside;
        Ok(())
    }
}
