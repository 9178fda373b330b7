//! Kernel normalization and the run statistics record.

use crate::accumulate::AccumulatorState;
use crate::{Error, Result};
use ndarray::Array3;
use serde::Serialize;
use thiserror::Error as ThisError;
use voxkern_core::grid::VoxelGrid;

/// Non-fatal findings surfaced alongside a successful run.
///
/// Warnings are recorded in [`KernelStats::warnings`] and never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, ThisError)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Observed distinct event count differs from the declared primaries
    /// count; the statistical reading of `K = sum_w / N_primaries`
    /// changes when the two disagree.
    #[error("observed {observed} distinct events but {declared} declared primaries")]
    EventCountMismatch { observed: u64, declared: u64 },

    /// Derived outside-grid weight was a small negative cancellation
    /// residue and was clamped to zero.
    #[error("outside-grid weight {weight:e} was negative from cancellation; clamped to zero")]
    NegativeOutsideClamped { weight: f64 },

    /// The event-level pass saw more identifier-boundary groups than
    /// distinct identifiers: the stream was not grouped by event and the
    /// event-level uncertainty is unreliable.
    #[error("event-level pass saw {groups} identifier groups over {distinct} distinct events; input is not grouped by event")]
    UngroupedEventStream { groups: u64, distinct: u64 },
}

/// Statistics record accompanying every kernel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelStats {
    /// Records read from the file.
    pub records_read: u64,
    /// Records binned into the grid.
    pub records_in_grid: u64,
    /// Records tallied outside the grid.
    pub records_outside: u64,
    /// Total weight read (count or energy, per the weight mode).
    pub weight_read: f64,
    /// Weight captured by the grid.
    pub weight_in_grid: f64,
    /// Weight outside the grid (derived, clamped at zero).
    pub weight_outside: f64,
    /// True when the derived outside weight was clamped.
    pub outside_clamped: bool,
    /// Declared primaries count used for normalization.
    pub primaries: u64,
    /// Distinct event identifiers observed, when a pass tracked them.
    pub distinct_events: Option<u64>,
    /// Total weight per primary, over the whole file.
    pub mean_per_primary_file: f64,
    /// Total weight per primary, grid-captured records only.
    pub mean_per_primary_in_grid: f64,
    /// Non-fatal findings of the run.
    pub warnings: Vec<Warning>,
}

/// A finished kernel: normalized array, uncertainty, grid, raw
/// accumulation state, and statistics.
#[derive(Debug, Clone)]
pub struct KernelOutput {
    /// Raw accumulation state of pass 1 (read-only).
    pub state: AccumulatorState,
    /// Normalized kernel `K = sum_w / N_primaries`.
    pub kernel: Array3<f64>,
    /// Per-voxel uncertainty.
    pub sigma: Array3<f64>,
    /// Run statistics.
    pub stats: KernelStats,
}

impl KernelOutput {
    /// The grid the arrays are shaped by.
    #[must_use]
    pub fn grid(&self) -> &VoxelGrid {
        &self.state.grid
    }
}

/// Normalizes a completed accumulation into a kernel.
///
/// Derives the weight bookkeeping (read / in grid / outside) and
/// reconciles it: the derived outside value must equal read minus
/// in-grid within floating tolerance, and a small negative residue from
/// cancellation is clamped to zero with a warning rather than treated as
/// an error. The distinct-event count, when supplied, is cross-checked
/// against the declared primaries and a mismatch is a warning, not
/// fatal.
///
/// # Errors
/// Returns a configuration error when `primaries` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn normalize(
    state: AccumulatorState,
    sigma: Array3<f64>,
    primaries: u64,
    distinct_events: Option<u64>,
    mut warnings: Vec<Warning>,
) -> Result<KernelOutput> {
    if primaries == 0 {
        return Err(Error::Core(voxkern_core::Error::InvalidPrimaries));
    }
    if sigma.dim() != state.sum_w.dim() {
        return Err(Error::ShapeMismatch {
            left: sigma.dim(),
            right: state.sum_w.dim(),
        });
    }

    let n = primaries as f64;
    let kernel = &state.sum_w / n;

    let weight_in_grid = state.weight_in_grid();
    let mut weight_outside = state.weight_read - weight_in_grid;
    let mut outside_clamped = false;
    if weight_outside < 0.0 {
        warnings.push(Warning::NegativeOutsideClamped {
            weight: weight_outside,
        });
        weight_outside = 0.0;
        outside_clamped = true;
    }

    if let Some(observed) = distinct_events {
        if observed != primaries {
            warnings.push(Warning::EventCountMismatch {
                observed,
                declared: primaries,
            });
        }
    }

    let stats = KernelStats {
        records_read: state.records_read,
        records_in_grid: state.records_in_grid(),
        records_outside: state.records_outside,
        weight_read: state.weight_read,
        weight_in_grid,
        weight_outside,
        outside_clamped,
        primaries,
        distinct_events,
        mean_per_primary_file: state.weight_read / n,
        mean_per_primary_in_grid: weight_in_grid / n,
        warnings,
    };

    Ok(KernelOutput {
        state,
        kernel,
        sigma,
        stats,
    })
}
