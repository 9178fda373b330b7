//! Two-pass kernel construction over a restartable batch source.
//!
//! Run shape: Idle -> Accumulating (pass 1) -> optional EventLevelPass
//! (pass 2) -> Normalizing -> Done. Each pass reads the source start to
//! finish; any failure aborts the run with nothing produced. All
//! mutable state is owned by the run; nothing persists across runs.

use crate::accumulate::{Accumulator, BinningField, WeightMode};
use crate::event_index::EventIndexBuilder;
use crate::normalize::{normalize, KernelOutput, Warning};
use crate::uncertainty::{fast_sigma, EventLevelEstimator};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use voxkern_core::grid::{GridBounds, GridSpec};
use voxkern_core::record::RecordBatch;

/// Uncertainty estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyMode {
    /// `sqrt(sum_w2) / N_primaries` from pass 1 alone (approximate).
    Fast,
    /// Per-event Welford variance over a dedicated second pass.
    EventLevel,
}

/// Full configuration of one kernel run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConfig {
    /// Geometry bounds per axis.
    pub bounds: GridBounds,
    /// Voxel sizing policy.
    pub grid: GridSpec,
    /// Per-record weight entering the histogram.
    pub weight: WeightMode,
    /// Which decoded vector is binned.
    pub field: BinningField,
    /// Uncertainty strategy.
    pub uncertainty: UncertaintyMode,
    /// Declared primaries count (positive).
    pub primaries: u64,
}

/// Builds a kernel from a restartable record-batch source.
///
/// `source` is called once per pass and must yield the same finite
/// sequence of batches each time (a fresh pass over the same file). The
/// event-level mode additionally requires the stream to be grouped by
/// event identifier; see [`EventLevelEstimator`].
///
/// # Errors
/// Returns a configuration error for invalid bounds, grid sizing, or a
/// zero primaries count. Nothing is produced on error.
pub fn build_kernel<S, I>(mut source: S, config: &KernelConfig) -> Result<KernelOutput>
where
    S: FnMut() -> I,
    I: IntoIterator<Item = RecordBatch>,
{
    if config.primaries == 0 {
        return Err(Error::Core(voxkern_core::Error::InvalidPrimaries));
    }
    let grid = config.grid.build(&config.bounds)?;

    // Pass 1: weighted histogram plus the distinct-event index.
    let mut accumulator = Accumulator::new(grid.clone(), config.weight, config.field);
    let mut index = EventIndexBuilder::new();
    for batch in source() {
        index.observe(&batch.event_id);
        accumulator.accumulate(&batch);
    }
    let state = accumulator.into_state();
    let distinct_events = index.build().len() as u64;

    // Optional pass 2: event-level Welford uncertainty.
    let mut warnings = Vec::new();
    let sigma = match config.uncertainty {
        UncertaintyMode::Fast => fast_sigma(&state, config.primaries),
        UncertaintyMode::EventLevel => {
            let mut estimator = EventLevelEstimator::new(grid, config.weight, config.field);
            for batch in source() {
                estimator.process_batch(&batch);
            }
            let result = estimator.finalize();
            if result.events > distinct_events {
                warnings.push(Warning::UngroupedEventStream {
                    groups: result.events,
                    distinct: distinct_events,
                });
            }
            result.sigma
        }
    };

    normalize(
        state,
        sigma,
        config.primaries,
        Some(distinct_events),
        warnings,
    )
}
