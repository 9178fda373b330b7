//! Plain-text header sidecars.
//!
//! Production runs write a small `key: value` (or `key = value`) text
//! file next to the binary data carrying the format version, the record
//! width, and sometimes the primaries count. Numbers may be written as
//! floats ("2.0"), so values are parsed as f64 and truncated.

use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Parsed contents of a header sidecar.
///
/// Every field is optional: headers in the wild carry different subsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarHeader {
    /// Declared binary format version.
    pub format_version: Option<u32>,
    /// Declared record width in bytes.
    pub bytes_per_record: Option<usize>,
    /// Declared primaries count.
    pub primaries: Option<u64>,
}

impl SidecarHeader {
    /// Parses header text. Unknown keys and malformed values are skipped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn parse(text: &str) -> Self {
        let mut header = Self::default();
        for line in text.lines() {
            let line = line.trim();
            let Some((key, value)) = line
                .split_once(':')
                .or_else(|| line.split_once('='))
            else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let Ok(value) = value.trim().parse::<f64>() else {
                continue;
            };
            if value < 0.0 {
                continue;
            }
            if key == "format_version" {
                header.format_version = Some(value as u32);
            } else if key == "bytes_per_photon" || key == "bytes_per_record" {
                header.bytes_per_record = Some(value as usize);
            } else if key.contains("primar") || key == "events" {
                header.primaries = Some(value as u64);
            }
        }
        header
    }

    /// Loads and parses the header at `path`, or `None` when absent.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(Self::parse(&text)))
    }

    /// Checks the declared version and width against a layout width.
    ///
    /// Absent fields pass: a header that says nothing contradicts nothing.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedVersion`] for any version other than 2,
    /// or [`Error::WidthMismatch`] when the declared width differs from
    /// `record_bytes`.
    pub fn validate_layout(&self, record_bytes: usize) -> Result<()> {
        if let Some(version) = self.format_version {
            if version != 2 {
                return Err(Error::UnsupportedVersion(version));
            }
        }
        if let Some(width) = self.bytes_per_record {
            if width != record_bytes {
                return Err(Error::WidthMismatch {
                    header: width,
                    layout: record_bytes,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_colon_and_equals() {
        let header = SidecarHeader::parse(
            "format_version: 2\nbytes_per_photon = 60\nNum_Primaries: 52302569\nnoise\n",
        );
        assert_eq!(header.format_version, Some(2));
        assert_eq!(header.bytes_per_record, Some(60));
        assert_eq!(header.primaries, Some(52_302_569));
    }

    #[test]
    fn test_parse_float_values() {
        let header = SidecarHeader::parse("format_version: 2.0\nevents = 1e4\n");
        assert_eq!(header.format_version, Some(2));
        assert_eq!(header.primaries, Some(10_000));
    }

    #[test]
    fn test_validate_layout() {
        let header = SidecarHeader {
            format_version: Some(2),
            bytes_per_record: Some(60),
            primaries: None,
        };
        assert!(header.validate_layout(60).is_ok());
        assert!(matches!(
            header.validate_layout(36),
            Err(Error::WidthMismatch { header: 60, layout: 36 })
        ));

        let v1 = SidecarHeader {
            format_version: Some(1),
            ..SidecarHeader::default()
        };
        assert!(matches!(
            v1.validate_layout(60),
            Err(Error::UnsupportedVersion(1))
        ));

        // A header with nothing declared contradicts nothing.
        assert!(SidecarHeader::default().validate_layout(60).is_ok());
    }

    #[test]
    fn test_load_missing_and_present() {
        assert_eq!(
            SidecarHeader::load("/nonexistent/path.header").unwrap(),
            None
        );

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "format_version: 2").unwrap();
        file.flush().unwrap();
        let header = SidecarHeader::load(file.path()).unwrap().unwrap();
        assert_eq!(header.format_version, Some(2));
    }
}
