//! End-to-end properties of the kernel pipeline on synthetic streams.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use approx::assert_relative_eq;
use voxkern_core::grid::{GridBounds, GridSpec};
use voxkern_core::record::RecordBatch;
use voxkern_kernel::{
    build_kernel, BinningField, KernelConfig, UncertaintyMode, WeightMode,
};

/// Small deterministic generator so the synthetic streams are stable.
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u32
    }

    fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        let unit = self.next_u32() as f32 / u32::MAX as f32;
        lo + (hi - lo) * unit
    }
}

fn chunked(batch: &RecordBatch, chunk: usize) -> Vec<RecordBatch> {
    let mut batches = Vec::new();
    let mut current = RecordBatch::default();
    for i in 0..batch.len() {
        current.push(
            [batch.x[i], batch.y[i], batch.z[i]],
            [batch.rx[i], batch.ry[i], batch.rz[i]],
            batch.energy[i],
            batch.event_id[i],
            batch.secondary_id[i],
        );
        if current.len() == chunk {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// 200 production records uniform in a 10x10x10 cm geometry over 10
/// primaries: the clamp forces dv = 0.3 cm (33 bins, 34 edges per axis)
/// and the kernel integrates to 200/10 = 20 per primary.
#[test]
fn particle_kernel_end_to_end() {
    let n_records = 200_u32;
    let primaries = 10_u64;
    let mut rng = Lcg(42);

    let mut stream = RecordBatch::with_capacity(n_records as usize);
    for i in 0..n_records {
        let position = [
            rng.uniform(-5.0, 5.0),
            rng.uniform(-5.0, 5.0),
            rng.uniform(25.0, 35.0),
        ];
        stream.push(position, [0.0, 0.0, 1.0], 2.0, i % 10, 1);
    }

    let config = KernelConfig {
        bounds: GridBounds::new(-5.0, 5.0, -5.0, 5.0, 25.0, 35.0),
        grid: GridSpec::default(),
        weight: WeightMode::Count,
        field: BinningField::Position,
        uncertainty: UncertaintyMode::Fast,
        primaries,
    };
    let batches = chunked(&stream, 50);
    let output = build_kernel(|| batches.clone(), &config).unwrap();

    let grid = output.grid();
    assert_relative_eq!(grid.nominal_voxel_size(), 0.3);
    assert_eq!(grid.shape(), (33, 33, 33));
    for edges in [grid.x_edges(), grid.y_edges(), grid.z_edges()] {
        assert_eq!(edges.len(), 34);
    }

    assert_eq!(output.stats.records_read, 200);
    assert_eq!(output.stats.records_outside, 0);
    assert_eq!(output.stats.distinct_events, Some(10));
    let total: f64 = output.kernel.sum();
    assert_relative_eq!(total, 20.0, max_relative = 0.01);
    assert!(output.stats.warnings.is_empty());
}

/// 40 deposition records of 0.1 MeV over 4 primaries: the energy kernel
/// integrates to 1.0 MeV per primary and the fast-mode sigma is not the
/// kernel itself.
#[test]
fn dose_kernel_end_to_end() {
    let primaries = 4_u64;
    let mut rng = Lcg(7);

    let mut stream = RecordBatch::with_capacity(40);
    let mut previous = [0.0_f32; 3];
    for i in 0..40_u32 {
        // Every fourth record repeats the previous position, so some
        // voxels hold more than one record.
        let position = if i % 4 == 1 {
            previous
        } else {
            [
                rng.uniform(-2.0, 2.0),
                rng.uniform(-2.0, 2.0),
                rng.uniform(-1.0, 1.0),
            ]
        };
        previous = position;
        stream.push(position, position, 0.1, i % 4, 22);
    }

    let config = KernelConfig {
        bounds: GridBounds::new(-2.0, 2.0, -2.0, 2.0, -1.0, 1.0),
        grid: GridSpec::default(),
        weight: WeightMode::Energy,
        field: BinningField::Position,
        uncertainty: UncertaintyMode::Fast,
        primaries,
    };
    let batches = chunked(&stream, 10);
    let output = build_kernel(|| batches.clone(), &config).unwrap();

    assert_eq!(output.stats.records_outside, 0);
    assert_relative_eq!(output.kernel.sum(), 1.0, max_relative = 0.01);

    // Non-degenerate weighting: sigma must differ from K somewhere.
    let differs = output
        .kernel
        .iter()
        .zip(output.sigma.iter())
        .any(|(k, s)| (k - s).abs() > 1e-12 && *k > 0.0);
    assert!(differs);
}

/// Chunk size is a pure performance parameter: one record per batch and
/// the whole stream in one batch produce bit-identical accumulation.
#[test]
fn chunk_size_does_not_change_the_kernel() {
    let mut rng = Lcg(1234);
    let mut stream = RecordBatch::default();
    for i in 0..150_u32 {
        let position = [
            rng.uniform(-6.0, 6.0), // some records land outside
            rng.uniform(-6.0, 6.0),
            rng.uniform(-6.0, 6.0),
        ];
        stream.push(position, [0.0; 3], rng.uniform(0.05, 0.2), i % 15, 1);
    }

    let config = KernelConfig {
        bounds: GridBounds::new(-5.0, 5.0, -5.0, 5.0, -5.0, 5.0),
        grid: GridSpec::default(),
        weight: WeightMode::Energy,
        field: BinningField::Position,
        uncertainty: UncertaintyMode::Fast,
        primaries: 15,
    };

    let fine = chunked(&stream, 1);
    let coarse = chunked(&stream, stream.len());
    let a = build_kernel(|| fine.clone(), &config).unwrap();
    let b = build_kernel(|| coarse.clone(), &config).unwrap();

    assert_eq!(a.state.sum_w, b.state.sum_w);
    assert_eq!(a.state.sum_w2, b.state.sum_w2);
    assert_eq!(a.state.count, b.state.count);
    assert_eq!(a.kernel, b.kernel);

    // Conservation: grid weight plus outside weight is the file total.
    let total: f64 = stream.energy.iter().map(|&e| f64::from(e)).sum();
    assert!(a.stats.records_outside > 0);
    assert_relative_eq!(
        a.stats.weight_in_grid + a.stats.weight_outside,
        total,
        max_relative = 1e-9
    );
}

/// Event-level and fast uncertainties agree on a grouped stream where
/// every event contributes exactly one record in its own voxel.
#[test]
fn event_level_mode_on_grouped_stream() {
    let mut stream = RecordBatch::default();
    for event in 0..8_u32 {
        let offset = -3.5 + event as f32;
        stream.push([offset, 0.0, 0.0], [0.0; 3], 1.0, event, 1);
    }

    let config = KernelConfig {
        bounds: GridBounds::new(-5.0, 5.0, -5.0, 5.0, -5.0, 5.0),
        grid: GridSpec::default(),
        weight: WeightMode::Count,
        field: BinningField::Position,
        uncertainty: UncertaintyMode::EventLevel,
        primaries: 8,
    };
    let batches = chunked(&stream, 3);
    let event_level = build_kernel(|| batches.clone(), &config).unwrap();

    let fast_config = KernelConfig {
        uncertainty: UncertaintyMode::Fast,
        ..config
    };
    let fast = build_kernel(|| batches.clone(), &fast_config).unwrap();

    assert!(event_level.stats.warnings.is_empty());
    for (e, f) in event_level.sigma.iter().zip(fast.sigma.iter()) {
        assert_relative_eq!(*e, *f, epsilon = 1e-12);
    }
}
