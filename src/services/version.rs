//! Executable version inspection.
//!
//! Windows executables carry a `VS_VERSIONINFO` resource whose fixed part,
//! `VS_FIXEDFILEINFO`, starts with the signature `0xFEEF04BD`:
//!
//! ```text
//! offset  field
//! 0       dwSignature        0xFEEF04BD
//! 4       dwStrucVersion     0x00010000
//! 8       dwFileVersionMS    major << 16 | minor
//! 12      dwFileVersionLS    build << 16 | revision
//! ```
//!
//! [`PeVersionInspector`] locates that block by scanning the file, which avoids walking
//! the PE resource directory and works the same on every host platform.

use crate::models::GameVersion;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

const FIXED_FILE_INFO_SIGNATURE: [u8; 4] = 0xFEEF_04BDu32.to_le_bytes();
const FIXED_FILE_INFO_STRUC_VERSION: [u8; 4] = 0x0001_0000u32.to_le_bytes();
const FIXED_FILE_INFO_HEADER_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} has no file version information")]
    MissingVersionInfo(Utf8PathBuf),
}

/// Reads the file version embedded in an executable.
#[cfg_attr(test, mockall::automock)]
pub trait VersionInspector {
    /// # Errors
    /// Fails if the file cannot be read or carries no version information.
    /// Callers must not substitute a default version.
    fn read_version(&self, executable: &Utf8Path) -> Result<GameVersion, VersionError>;
}

/// [`VersionInspector`] for PE executables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeVersionInspector;

impl PeVersionInspector {
    pub fn new() -> Self {
        Self
    }
}

impl VersionInspector for PeVersionInspector {
    fn read_version(&self, executable: &Utf8Path) -> Result<GameVersion, VersionError> {
        let bytes = fs::read(executable).map_err(|source| VersionError::Io {
            path: executable.to_path_buf(),
            source,
        })?;

        let version = find_fixed_file_version(&bytes)
            .ok_or_else(|| VersionError::MissingVersionInfo(executable.to_path_buf()))?;

        tracing::debug!("{} has file version {}", executable, version);
        Ok(version)
    }
}

/// Find the first `VS_FIXEDFILEINFO` block in `bytes` and decode its file version.
pub fn find_fixed_file_version(bytes: &[u8]) -> Option<GameVersion> {
    bytes
        .windows(FIXED_FILE_INFO_HEADER_LEN)
        .find(|window| {
            window[..4] == FIXED_FILE_INFO_SIGNATURE && window[4..8] == FIXED_FILE_INFO_STRUC_VERSION
        })
        .map(|header| {
            let ms = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
            let ls = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);
            GameVersion::from_packed(ms, ls)
        })
}
