//!
//! Command-line driver: builds voxel kernels from binary record files.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};

use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use voxkern_core::grid::{GridBounds, GridSpec};
use voxkern_io::{KernelWriter, RecordFile, RunMetadata, StreamConfig};
use voxkern_kernel::dose::dose_gy_per_primary;
use voxkern_kernel::{
    build_kernel, BinningField, KernelConfig, UncertaintyMode, WeightMode,
};
use voxkern_phsp::{DoseLayout, ParticleLayout, RecordLayout, SidecarHeader};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    VoxkernIo(#[from] voxkern_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] voxkern_core::Error),

    #[error("Format error: {0}")]
    Format(#[from] voxkern_phsp::Error),

    #[error("Kernel error: {0}")]
    Kernel(#[from] voxkern_kernel::Error),
}

/// Uncertainty estimation strategy.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Uncertainty {
    /// sqrt(sum_w2) / N_primaries from the accumulation pass (approximate)
    Fast,
    /// Per-event Welford variance over a dedicated second pass
    Event,
}

impl From<Uncertainty> for UncertaintyMode {
    fn from(value: Uncertainty) -> Self {
        match value {
            Uncertainty::Fast => UncertaintyMode::Fast,
            Uncertainty::Event => UncertaintyMode::EventLevel,
        }
    }
}

/// Record layout selection for `info`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    /// 60-byte particle (phase-space) records
    Particle,
    /// 36-byte dose records
    Dose,
}

/// Streaming voxel-kernel builder for binary physics-event records.
#[derive(Parser)]
#[command(name = "voxkern")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Input binary record file
    input: PathBuf,

    /// Output directory for arrays and statistics
    #[arg(short, long)]
    output: PathBuf,

    /// Geometry bounds: x_min x_max y_min y_max z_min z_max (cm)
    #[arg(long, num_args = 6, required = true, allow_hyphen_values = true, value_names = ["X_MIN", "X_MAX", "Y_MIN", "Y_MAX", "Z_MIN", "Z_MAX"])]
    bounds: Vec<f64>,

    /// Primaries count; cross-checked against run metadata when both exist
    #[arg(long)]
    n_primaries: Option<u64>,

    /// Records per decoded chunk (performance only)
    #[arg(long)]
    chunk_records: Option<usize>,

    /// Target bin count across the largest axis
    #[arg(long, default_value = "100")]
    target_bins: usize,

    /// Uncertainty estimation mode
    #[arg(long, value_enum, default_value = "fast")]
    uncertainty: Uncertainty,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a production-count kernel from 60-byte particle records
    Particle {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Build an energy-deposition kernel from 36-byte dose records
    Dose {
        #[command(flatten)]
        common: CommonArgs,

        /// Bin by displacement from the primary vertex instead of position
        #[arg(long)]
        by_displacement: bool,

        /// Also write dose in Gy per primary for this medium density
        #[arg(long)]
        density_g_cm3: Option<f64>,
    },

    /// Show information about a record file
    Info {
        /// Input binary record file
        input: PathBuf,

        /// Record layout of the file
        #[arg(long, value_enum, default_value = "particle")]
        layout: Layout,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Particle { common } => {
            let records = RecordFile::<ParticleLayout>::open(&common.input)?;
            run_build(
                &records,
                &common,
                WeightMode::Count,
                BinningField::Position,
                None,
            )
        }
        Commands::Dose {
            common,
            by_displacement,
            density_g_cm3,
        } => {
            let records = RecordFile::<DoseLayout>::open(&common.input)?;
            let field = if by_displacement {
                BinningField::Displacement
            } else {
                BinningField::Position
            };
            run_build(&records, &common, WeightMode::Energy, field, density_g_cm3)
        }
        Commands::Info { input, layout } => match layout {
            Layout::Particle => info::<ParticleLayout>(&input),
            Layout::Dose => info::<DoseLayout>(&input),
        },
    }
}

fn parse_bounds(values: &[f64]) -> GridBounds {
    GridBounds::new(
        values[0], values[1], values[2], values[3], values[4], values[5],
    )
}

fn header_path<L: RecordLayout>(data_path: &Path) -> PathBuf {
    // Particle runs write `<base>.header`; dose runs `<base>.dose.header`.
    if L::RECORD_BYTES == DoseLayout::RECORD_BYTES {
        data_path.with_extension("dose.header")
    } else {
        data_path.with_extension("header")
    }
}

fn run_build<L: RecordLayout>(
    records: &RecordFile<L>,
    common: &CommonArgs,
    weight: WeightMode,
    field: BinningField,
    density_g_cm3: Option<f64>,
) -> Result<()> {
    let start = Instant::now();

    // Sidecars: run metadata and text header, both optional.
    let meta = RunMetadata::load_for(records.path())?;
    let header = SidecarHeader::load(header_path::<L>(records.path()))?;
    if let Some(header) = &header {
        header.validate_layout(L::RECORD_BYTES)?;
    }
    if let Some(meta) = &meta {
        meta.validate_record_count(records.record_count() as u64)?;
    }
    let primaries =
        voxkern_io::resolve_primaries(meta.as_ref(), header.as_ref(), common.n_primaries)?;

    let mut stream_config = StreamConfig::default();
    if let Some(chunk) = common.chunk_records {
        stream_config = stream_config.with_chunk_records(chunk);
    }
    let chunk_records = stream_config.resolve_chunk_records()?;

    let config = KernelConfig {
        bounds: parse_bounds(&common.bounds),
        grid: GridSpec {
            target_bins: common.target_bins,
            ..GridSpec::default()
        },
        weight,
        field,
        uncertainty: common.uncertainty.into(),
        primaries,
    };

    if common.verbose {
        eprintln!("Input: {}", records.path().display());
        eprintln!("Records: {}", records.record_count());
        eprintln!("Primaries: {}", primaries);
        eprintln!("Chunk: {} records", chunk_records);
    }

    let output = build_kernel(|| records.batches(chunk_records), &config)?;

    let writer = KernelWriter::create(&common.output)?;
    writer.write_output(&output)?;
    if let Some(density) = density_g_cm3 {
        let dose = dose_gy_per_primary(&output.kernel, output.grid(), density)?;
        writer.write_array("kernel_dose_gy.bin", &dose)?;
    }

    let elapsed = start.elapsed();
    let (nx, ny, nz) = output.grid().shape();
    println!(
        "Processed {} records in {:.2}s",
        output.stats.records_read,
        elapsed.as_secs_f64()
    );
    println!(
        "Grid: {} x {} x {} voxels ({:.4} cm nominal)",
        nx,
        ny,
        nz,
        output.grid().nominal_voxel_size()
    );
    println!(
        "Weight in grid: {:.6e} (outside: {:.6e})",
        output.stats.weight_in_grid, output.stats.weight_outside
    );
    println!(
        "Mean per primary (in grid): {:.6e}",
        output.stats.mean_per_primary_in_grid
    );
    for warning in &output.stats.warnings {
        eprintln!("WARNING: {}", warning);
    }
    println!("Outputs in: {}", writer.dir().display());

    Ok(())
}

fn info<L: RecordLayout>(input: &Path) -> Result<()> {
    let records = RecordFile::<L>::open(input)?;
    println!("File: {}", input.display());
    println!(
        "Size: {} bytes ({:.2} MB)",
        records.file_size(),
        records.file_size() as f64 / 1_000_000.0
    );
    println!("Record width: {} bytes", L::RECORD_BYTES);
    println!("Records: {}", records.record_count());

    if let Some(meta) = RunMetadata::load_for(input)? {
        if let Some(events) = meta.events {
            println!("Metadata events: {}", events);
        }
        if let Some(total) = meta.declared_total() {
            println!("Metadata records: {}", total);
        }
    }
    if let Some(header) = SidecarHeader::load(header_path::<L>(input))? {
        if let Some(version) = header.format_version {
            println!("Header format version: {}", version);
        }
        if let Some(primaries) = header.primaries {
            println!("Header primaries: {}", primaries);
        }
    }
    Ok(())
}
