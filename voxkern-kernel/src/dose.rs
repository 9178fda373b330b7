//! Physical dose conversion.
//!
//! Kernels are accumulated in MeV per primary per voxel; converting to
//! absorbed dose divides by the voxel mass under an assumed uniform
//! medium density. The conversion is strictly linear in `1/density`.

use crate::{Error, Result};
use ndarray::Array3;
use voxkern_core::grid::VoxelGrid;

/// Joules per MeV (CODATA).
pub const J_PER_MEV: f64 = 1.602_176_634e-10;

/// Converts an energy kernel (MeV/primary/voxel) to dose (Gy/primary).
///
/// `D = K * J_PER_MEV / mass_kg` with
/// `mass_kg = density_g_cm3 * voxel_volume_cm3 * 1e-3`. Uses the grid's
/// nominal voxel volume.
///
/// # Errors
/// Returns a configuration error for a non-positive density.
pub fn dose_gy_per_primary(
    kernel_mev: &Array3<f64>,
    grid: &VoxelGrid,
    density_g_cm3: f64,
) -> Result<Array3<f64>> {
    if !(density_g_cm3 > 0.0) {
        return Err(Error::Core(voxkern_core::Error::InvalidDensity(
            density_g_cm3,
        )));
    }
    let mass_kg = density_g_cm3 * grid.nominal_voxel_volume() * 1e-3;
    Ok(kernel_mev.mapv(|k| k * J_PER_MEV / mass_kg))
}
