//! voxkern-kernel: Kernel accumulation and statistics.
//!
//! This crate turns decoded record batches into normalized voxel
//! kernels. The fast path is a single weighted-histogram pass; the
//! event-level uncertainty mode replays the stream once more and folds
//! per-event histograms into a running Welford aggregate.
//!
//! # Key Components
//!
//! - [`Accumulator`] - Single-pass weighted 3D histogram (`sum_w`, `sum_w2`)
//! - [`EventIndexMap`] - Sparse/dense event-identifier compaction
//! - [`EventLevelEstimator`] - Per-event Welford variance pass
//! - [`normalize`] - Kernel normalization and the statistics record
//! - [`build_kernel`] - Two-pass orchestration over a restartable source

pub mod accumulate;
pub mod dose;
mod error;
pub mod event_index;
pub mod normalize;
pub mod pipeline;
pub mod uncertainty;

pub use accumulate::{Accumulator, AccumulatorState, BinningField, WeightMode};
pub use error::{Error, Result};
pub use event_index::{EventIndexBuilder, EventIndexMap};
pub use normalize::{normalize, KernelOutput, KernelStats, Warning};
pub use pipeline::{build_kernel, KernelConfig, UncertaintyMode};
pub use uncertainty::{fast_sigma, EventLevelEstimator, EventLevelResult};
