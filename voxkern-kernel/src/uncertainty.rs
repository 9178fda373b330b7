//! Per-voxel statistical uncertainty.
//!
//! Two estimators with different cost and fidelity:
//!
//! - **fast**: `sigma = sqrt(sum_w2) / N_primaries`, computable from the
//!   accumulation pass alone. Treats every record as an independent
//!   sample, ignoring that records of one primary are correlated.
//! - **event-level**: a dedicated second pass that histograms each event
//!   separately and folds it into a running per-voxel Welford aggregate,
//!   yielding the standard error of the per-event mean.

use crate::accumulate::{AccumulatorState, BinningField, WeightMode};
use ndarray::{azip, Array3};
use voxkern_core::grid::VoxelGrid;
use voxkern_core::record::RecordBatch;

/// Fast approximate uncertainty from the accumulation pass.
///
/// Documented approximation: intra-event spatial correlation is ignored,
/// so voxels fed by multi-record events are underestimated. `primaries`
/// must already be validated positive by the caller.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fast_sigma(state: &AccumulatorState, primaries: u64) -> Array3<f64> {
    let n = primaries as f64;
    state.sum_w2.mapv(|w2| w2.max(0.0).sqrt() / n)
}

/// Result of the event-level pass.
#[derive(Debug, Clone)]
pub struct EventLevelResult {
    /// Standard error of the per-event mean, per voxel.
    pub sigma: Array3<f64>,
    /// Events observed (identifier-boundary groups in stream order).
    pub events: u64,
}

/// Event-level Welford estimator over a replayed stream.
///
/// Precondition (strict caller contract, not verified here): the stream
/// is grouped by event identifier, i.e. all records of one event arrive
/// contiguously. Ungrouped input silently splits events into multiple
/// samples; the pipeline flags the cheap detectable symptom (more groups
/// than distinct identifiers) as a consistency warning.
///
/// Records accumulate directly into one reusable grid-shaped scratch
/// histogram; the fold that consumes it also zeroes it, so no per-event
/// allocation happens.
pub struct EventLevelEstimator {
    grid: VoxelGrid,
    weight: WeightMode,
    field: BinningField,
    scratch: Array3<f64>,
    mean: Array3<f64>,
    m2: Array3<f64>,
    events: u64,
    current: Option<u32>,
}

impl EventLevelEstimator {
    /// Creates an estimator over `grid` with the same weighting and
    /// coordinate selection as the accumulation pass.
    #[must_use]
    pub fn new(grid: VoxelGrid, weight: WeightMode, field: BinningField) -> Self {
        let shape = grid.shape();
        let dim = (shape.0, shape.1, shape.2);
        Self {
            grid,
            weight,
            field,
            scratch: Array3::zeros(dim),
            mean: Array3::zeros(dim),
            m2: Array3::zeros(dim),
            events: 0,
            current: None,
        }
    }

    /// Processes one batch of the replayed stream, in file order.
    pub fn process_batch(&mut self, batch: &RecordBatch) {
        for i in 0..batch.len() {
            let id = batch.event_id[i];
            if self.current.is_some_and(|current| current != id) {
                self.flush_event();
            }
            self.current = Some(id);
            if let Some((ix, iy, iz)) = self.grid.find_bin(self.field.coords(batch, i)) {
                self.scratch[[ix, iy, iz]] += self.weight.weight(batch, i);
            }
            // Outside-grid records still belong to the event; they just
            // contribute nothing to its histogram.
        }
    }

    /// Folds the completed event histogram into the Welford aggregate
    /// and clears the scratch in the same traversal.
    #[allow(clippy::cast_precision_loss)]
    fn flush_event(&mut self) {
        self.events += 1;
        let n = self.events as f64;
        azip!((h in &mut self.scratch, mean in &mut self.mean, m2 in &mut self.m2) {
            let delta = *h - *mean;
            *mean += delta / n;
            *m2 += delta * (*h - *mean);
            *h = 0.0;
        });
    }

    /// Flushes the final event and produces the uncertainty array.
    ///
    /// `variance = M2 / (n - 1)` when `n > 1`, else zero;
    /// `sigma = sqrt(variance / n)` (standard error of the per-event
    /// mean). With no events at all the array is all zeros.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finalize(mut self) -> EventLevelResult {
        if self.current.is_some() {
            self.flush_event();
        }
        let events = self.events;
        let sigma = if events > 1 {
            let n = events as f64;
            let mut sigma = self.m2;
            sigma.mapv_inplace(|m2| (m2.max(0.0) / ((n - 1.0) * n)).sqrt());
            sigma
        } else {
            Array3::zeros(self.mean.dim())
        };
        EventLevelResult { sigma, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulate::Accumulator;
    use approx::assert_relative_eq;
    use voxkern_core::grid::{GridBounds, GridSpec};

    fn small_grid() -> VoxelGrid {
        GridSpec::default()
            .build(&GridBounds::new(-2.0, 2.0, -2.0, 2.0, -2.0, 2.0))
            .unwrap()
    }

    fn one_record_batch(position: [f32; 3], energy: f32, event: u32) -> RecordBatch {
        let mut batch = RecordBatch::default();
        batch.push(position, [0.0; 3], energy, event, 1);
        batch
    }

    #[test]
    fn fast_sigma_is_sqrt_sum_w2_over_primaries() {
        let mut acc = Accumulator::new(small_grid(), WeightMode::Energy, BinningField::Position);
        acc.accumulate(&one_record_batch([0.0, 0.0, 0.0], 0.3, 0));
        acc.accumulate(&one_record_batch([0.0, 0.0, 0.0], 0.4, 1));
        let state = acc.into_state();

        let sigma = fast_sigma(&state, 5);
        let bin = state.grid.find_bin([0.0, 0.0, 0.0]).unwrap();
        let expected = (0.3_f64 * 0.3 + 0.4 * 0.4).sqrt() / 5.0;
        assert_relative_eq!(sigma[[bin.0, bin.1, bin.2]], expected, epsilon = 1e-7);
    }

    #[test]
    fn welford_matches_two_pass_variance() {
        // Three events hitting one voxel with weights 1, 2, 3.
        let grid = small_grid();
        let mut est = EventLevelEstimator::new(grid.clone(), WeightMode::Energy, BinningField::Position);
        for (event, w) in [(0_u32, 1.0_f32), (1, 2.0), (2, 3.0)] {
            est.process_batch(&one_record_batch([0.0, 0.0, 0.0], w, event));
        }
        let result = est.finalize();
        assert_eq!(result.events, 3);

        // Sample variance of {1,2,3} is 1; standard error = sqrt(1/3).
        let bin = grid.find_bin([0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(
            result.sigma[[bin.0, bin.1, bin.2]],
            (1.0_f64 / 3.0).sqrt(),
            epsilon = 1e-12
        );

        // A voxel no event touched has zero mean and zero sigma: the
        // samples there are {0,0,0}.
        assert_relative_eq!(result.sigma[[0, 0, 0]], 0.0);
    }

    #[test]
    fn event_boundaries_split_on_identifier_change() {
        // Two records of event 4, then one of event 9, inside one batch.
        let grid = small_grid();
        let mut batch = RecordBatch::default();
        batch.push([0.0, 0.0, 0.0], [0.0; 3], 1.0, 4, 1);
        batch.push([0.0, 0.0, 0.0], [0.0; 3], 1.0, 4, 2);
        batch.push([0.0, 0.0, 0.0], [0.0; 3], 1.0, 9, 1);

        let mut est = EventLevelEstimator::new(grid.clone(), WeightMode::Count, BinningField::Position);
        est.process_batch(&batch);
        let result = est.finalize();
        assert_eq!(result.events, 2);

        // Samples {2, 1}: variance 0.5, standard error sqrt(0.5/2) = 0.5.
        let bin = grid.find_bin([0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(result.sigma[[bin.0, bin.1, bin.2]], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn single_event_has_zero_sigma() {
        let mut est =
            EventLevelEstimator::new(small_grid(), WeightMode::Count, BinningField::Position);
        est.process_batch(&one_record_batch([0.0, 0.0, 0.0], 1.0, 0));
        let result = est.finalize();
        assert_eq!(result.events, 1);
        assert!(result.sigma.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn empty_stream_yields_zero_events_and_sigma() {
        let est = EventLevelEstimator::new(small_grid(), WeightMode::Count, BinningField::Position);
        let result = est.finalize();
        assert_eq!(result.events, 0);
        assert!(result.sigma.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn degenerate_one_record_events_match_fast_sigma() {
        // One record per event, each in its own voxel: both estimators
        // agree exactly. In general they do not.
        let grid = small_grid();
        let positions: Vec<[f32; 3]> = vec![
            [-1.5, 0.0, 0.0],
            [0.0, 1.5, 0.0],
            [0.0, 0.0, -1.5],
            [1.5, 1.5, 1.5],
        ];
        let primaries = positions.len() as u64;

        let mut acc = Accumulator::new(grid.clone(), WeightMode::Count, BinningField::Position);
        let mut est = EventLevelEstimator::new(grid, WeightMode::Count, BinningField::Position);
        for (event, &p) in positions.iter().enumerate() {
            let batch = one_record_batch(p, 1.0, u32::try_from(event).unwrap());
            acc.accumulate(&batch);
            est.process_batch(&batch);
        }
        let fast = fast_sigma(&acc.into_state(), primaries);
        let event_level = est.finalize();
        assert_eq!(event_level.events, primaries);

        azip!((f in &fast, e in &event_level.sigma) {
            assert_relative_eq!(*f, *e, epsilon = 1e-12);
        });
    }

    #[test]
    fn estimators_differ_for_multi_record_events() {
        // One event drops two records in the same voxel: fast mode sees
        // two independent samples, event-level sees one sample of 2.
        let grid = small_grid();
        let mut batch = RecordBatch::default();
        batch.push([0.0, 0.0, 0.0], [0.0; 3], 1.0, 0, 1);
        batch.push([0.0, 0.0, 0.0], [0.0; 3], 1.0, 0, 2);
        batch.push([1.0, 1.0, 1.0], [0.0; 3], 1.0, 1, 1);

        let mut acc = Accumulator::new(grid.clone(), WeightMode::Count, BinningField::Position);
        let mut est = EventLevelEstimator::new(grid.clone(), WeightMode::Count, BinningField::Position);
        acc.accumulate(&batch);
        est.process_batch(&batch);

        let fast = fast_sigma(&acc.into_state(), 2);
        let event_level = est.finalize().sigma;
        let bin = grid.find_bin([0.0, 0.0, 0.0]).unwrap();
        let f = fast[[bin.0, bin.1, bin.2]];
        let e = event_level[[bin.0, bin.1, bin.2]];
        assert!((f - e).abs() > 1e-6, "fast {f} vs event-level {e}");
    }
}
