//! JSON run-metadata sidecars and primaries resolution.
//!
//! Simulation runs write `<basename>.run_meta.json` next to the binary
//! data. The metadata is authoritative for the primaries count and for
//! the total record count; the engine cross-checks it instead of
//! recomputing anything.

use crate::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use voxkern_phsp::SidecarHeader;

/// Run metadata written by the simulation alongside the data file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunMetadata {
    /// Simulated primaries (one event per primary).
    #[serde(default)]
    pub events: Option<u64>,
    /// Total records written, particle naming.
    #[serde(default)]
    pub total_photons: Option<u64>,
    /// Total records written, generic naming.
    #[serde(default)]
    pub total_records: Option<u64>,
}

impl RunMetadata {
    /// Sidecar path for a data file: same directory, same basename,
    /// `.run_meta.json` extension.
    #[must_use]
    pub fn sidecar_path(data_path: &Path) -> PathBuf {
        data_path.with_extension("run_meta.json")
    }

    /// Loads the sidecar next to `data_path`, or `None` when absent.
    ///
    /// # Errors
    /// Returns an error when the sidecar exists but cannot be read or
    /// parsed.
    pub fn load_for<P: AsRef<Path>>(data_path: P) -> Result<Option<Self>> {
        let path = Self::sidecar_path(data_path.as_ref());
        if !path.is_file() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    /// Declared total record count under either naming.
    #[must_use]
    pub fn declared_total(&self) -> Option<u64> {
        self.total_records.or(self.total_photons)
    }

    /// Cross-checks the declared total against the file's record count.
    ///
    /// # Errors
    /// Returns [`Error::RecordCountMismatch`] when the metadata declares
    /// a total that differs from what the file length implies.
    pub fn validate_record_count(&self, file_records: u64) -> Result<()> {
        if let Some(declared) = self.declared_total() {
            if declared != file_records {
                return Err(Error::RecordCountMismatch {
                    metadata: declared,
                    file: file_records,
                });
            }
        }
        Ok(())
    }
}

/// Resolves the primaries count from metadata, header, and the caller.
///
/// Priority: run metadata `events`, then the header sidecar, then the
/// explicit value. An explicit value that contradicts a metadata-derived
/// one is a configuration error (cross-check, not an override); an
/// explicit value matching it, or supplied when metadata is silent, is
/// accepted.
///
/// # Errors
/// Returns a configuration error when no source yields a count, when the
/// count is zero, or on a cross-check mismatch.
pub fn resolve_primaries(
    meta: Option<&RunMetadata>,
    header: Option<&SidecarHeader>,
    explicit: Option<u64>,
) -> Result<u64> {
    let from_metadata = meta
        .and_then(|m| m.events)
        .or_else(|| header.and_then(|h| h.primaries));
    if let (Some(declared), Some(metadata)) = (explicit, from_metadata) {
        if declared != metadata {
            return Err(voxkern_core::Error::PrimariesMismatch { declared, metadata }.into());
        }
    }
    let primaries = from_metadata
        .or(explicit)
        .ok_or(voxkern_core::Error::MissingPrimaries)?;
    if primaries == 0 {
        return Err(voxkern_core::Error::InvalidPrimaries.into());
    }
    Ok(primaries)
}
