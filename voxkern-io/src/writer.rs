//! Kernel output writers.
//!
//! Arrays go out as raw little-endian binaries with a minimal shape
//! prefix; edges and statistics go out as JSON. Nothing here is written
//! until a run has fully succeeded.

use crate::Result;
use ndarray::Array3;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use voxkern_core::grid::VoxelGrid;
use voxkern_kernel::{KernelOutput, KernelStats};

#[derive(Serialize)]
struct EdgesDoc<'a> {
    x_edges: &'a [f64],
    y_edges: &'a [f64],
    z_edges: &'a [f64],
    nominal_voxel_size_cm: f64,
}

/// Writes the arrays and records of a finished kernel run into one
/// output directory.
pub struct KernelWriter {
    dir: PathBuf,
}

impl KernelWriter {
    /// Creates the output directory (and parents) if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a 3D array as raw binary.
    ///
    /// Format: three u64 little-endian dimensions, then the f64
    /// little-endian elements in row-major (x, y, z) order.
    /// Total: 24 + 8 * nx * ny * nz bytes.
    ///
    /// # Errors
    /// Returns an error on any write failure.
    pub fn write_array(&self, name: &str, array: &Array3<f64>) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        let (nx, ny, nz) = array.dim();
        for dim in [nx, ny, nz] {
            writer.write_all(&(dim as u64).to_le_bytes())?;
        }
        for value in array.iter() {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Writes the voxel edges as JSON.
    ///
    /// # Errors
    /// Returns an error on any write failure.
    pub fn write_edges(&self, name: &str, grid: &VoxelGrid) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(
            writer,
            &EdgesDoc {
                x_edges: grid.x_edges(),
                y_edges: grid.y_edges(),
                z_edges: grid.z_edges(),
                nominal_voxel_size_cm: grid.nominal_voxel_size(),
            },
        )?;
        Ok(path)
    }

    /// Writes the statistics record as pretty JSON.
    ///
    /// # Errors
    /// Returns an error on any write failure.
    pub fn write_stats(&self, name: &str, stats: &KernelStats) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, stats)?;
        Ok(path)
    }

    /// Writes the standard output set of a kernel run: raw sums,
    /// normalized kernel, uncertainty, edges, and statistics.
    ///
    /// # Errors
    /// Returns an error on any write failure.
    pub fn write_output(&self, output: &KernelOutput) -> Result<()> {
        self.write_array("kernel_raw_sum.bin", &output.state.sum_w)?;
        self.write_array("kernel_normalized.bin", &output.kernel)?;
        self.write_array("kernel_uncertainty.bin", &output.sigma)?;
        self.write_edges("voxel_edges.json", output.grid())?;
        self.write_stats("kernel_stats.json", &output.stats)?;
        Ok(())
    }
}
