//! Persistence for the `config.cfg` install marker and the launcher's own settings.
//!
//! - [`ConfigStore`]: reads/writes `config.cfg`, whose presence means "a portable install lives here"
//! - [`LauncherSettings`]: optional `launcher.yaml` plus `SVPORTABLE_*` environment overrides

pub mod settings;

pub use settings::{LauncherSettings, SETTINGS_FILE_NAME};

use crate::models::{InstallConfig, ModPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// File name of the install marker inside the launcher directory.
pub const CONFIG_FILE_NAME: &str = "config.cfg";

/// Errors raised while reading or writing `config.cfg`
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {path} (line {line}): {reason}")]
    Parse {
        path: Utf8PathBuf,
        line: usize,
        reason: String,
    },
}

/// Reads and writes the two-line `config.cfg` marker.
///
/// Format:
/// ```text
/// C:\Program Files (x86)\Steam\steamapps\common\Stardew Valley
/// True
/// ```
/// Line 1 is the canonical install path, line 2 the mod flag as a boolean literal.
/// The path is written verbatim, so it cannot contain a newline.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: Utf8PathBuf,
}

impl ConfigStore {
    /// Create a store for the marker inside `dir`. Nothing is touched on disk.
    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Self {
        Self {
            config_path: dir.as_ref().join(CONFIG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Whether a portable install marker exists.
    pub fn exists(&self) -> bool {
        self.config_path.is_file()
    }

    /// Load the marker.
    ///
    /// # Returns
    /// `Ok(None)` if there is no marker, the parsed config otherwise.
    ///
    /// # Errors
    /// A second line that is not a boolean literal is a [`ConfigError::Parse`];
    /// it is never coerced to a default.
    pub fn load(&self) -> Result<Option<InstallConfig>, ConfigError> {
        if !self.exists() {
            tracing::debug!("No install marker at {}", self.config_path);
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })?;

        let config = self.parse(&contents)?;
        tracing::info!(
            "Loaded install marker from {} (source: {}, mods: {})",
            self.config_path,
            config.source_path,
            config.mod_policy
        );
        Ok(Some(config))
    }

    /// Write the marker, replacing any existing one.
    ///
    /// An unresolved [`ModPolicy::Unknown`] is written as `False`.
    pub fn save(&self, config: &InstallConfig) -> Result<(), ConfigError> {
        let flag = if config.mod_policy.includes_mods() {
            "True"
        } else {
            "False"
        };
        let contents = format!("{}\n{}\n", config.source_path, flag);

        fs::write(&self.config_path, contents).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })?;

        tracing::info!("Saved install marker to {}", self.config_path);
        Ok(())
    }

    fn parse(&self, contents: &str) -> Result<InstallConfig, ConfigError> {
        let mut lines = contents.lines();

        let source_path = lines.next().map(str::trim).unwrap_or_default();
        if source_path.is_empty() {
            return Err(self.parse_error(1, "missing source path"));
        }

        let flag = lines
            .next()
            .ok_or_else(|| self.parse_error(2, "missing mod flag"))?;
        let modded = parse_bool_literal(flag)
            .ok_or_else(|| self.parse_error(2, format!("'{}' is not a boolean", flag.trim())))?;

        Ok(InstallConfig::new(source_path, ModPolicy::from_answer(modded)))
    }

    fn parse_error(&self, line: usize, reason: impl Into<String>) -> ConfigError {
        ConfigError::Parse {
            path: self.config_path.clone(),
            line,
            reason: reason.into(),
        }
    }
}

/// Accepts `true`/`false` in any letter case, ignoring surrounding whitespace.
fn parse_bool_literal(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
