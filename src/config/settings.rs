use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;

/// Optional settings file looked up next to the launcher executable.
pub const SETTINGS_FILE_NAME: &str = "launcher.yaml";

/// Prefix for environment overrides, e.g. `SVPORTABLE_DEBUG_LOGGING=true`.
pub const ENV_PREFIX: &str = "SVPORTABLE";

#[cfg(windows)]
const DEFAULT_STEAM_COMMON: &str = r"C:\Program Files (x86)\Steam\steamapps\common";

/// XNA 4.0 runtime assemblies the game needs on machines without the XNA redistributable.
#[cfg(windows)]
const XNA_ASSEMBLIES: &[&str] = &[
    r"C:\Windows\Microsoft.NET\assembly\GAC_32\Microsoft.Xna.Framework\v4.0_4.0.0.0__842d8a4d8dbe5b2f\Microsoft.Xna.Framework.dll",
    r"C:\Windows\Microsoft.NET\assembly\GAC_32\Microsoft.Xna.Framework.Game\v4.0_4.0.0.0__842d8a4d8dbe5b2f\Microsoft.Xna.Framework.Game.dll",
    r"C:\Windows\Microsoft.NET\assembly\GAC_32\Microsoft.Xna.Framework.Graphics\v4.0_4.0.0.0__842d8a4d8dbe5b2f\Microsoft.Xna.Framework.Graphics.dll",
    r"C:\Windows\Microsoft.NET\assembly\GAC_32\Microsoft.Xna.Framework.Xact\v4.0_4.0.0.0__842d8a4d8dbe5b2f\Microsoft.Xna.Framework.Xact.dll",
];

/// Launcher settings.
///
/// Every field has a default, so the launcher works without a settings file. Values are
/// layered: built-in defaults, then `launcher.yaml`, then `SVPORTABLE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Game executable, looked up in the Steam folder and the launcher folder.
    pub game_executable: String,

    /// SMAPI executable; launched instead of the game when present locally.
    pub modding_api_executable: String,

    /// Steam install folder checked before asking the user.
    pub default_source_path: Utf8PathBuf,

    /// Name of the save folder, both under `save_root` and in the launcher folder.
    pub save_folder_name: String,

    /// Parent of the game's save folder. `None` means the roaming application-data folder.
    pub save_root: Option<Utf8PathBuf>,

    /// Support files copied into the launcher folder after a first install.
    pub auxiliary_files: Vec<Utf8PathBuf>,

    /// Log directory, relative to the launcher folder unless absolute.
    pub log_dir: Utf8PathBuf,

    pub debug_logging: bool,

    pub console_logging: bool,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            game_executable: "Stardew Valley.exe".to_string(),
            modding_api_executable: "StardewModdingAPI.exe".to_string(),
            default_source_path: default_steam_common().join("Stardew Valley"),
            save_folder_name: "StardewValley".to_string(),
            save_root: None,
            auxiliary_files: default_auxiliary_files(),
            log_dir: Utf8PathBuf::from("logs"),
            debug_logging: false,
            console_logging: false,
        }
    }
}

impl LauncherSettings {
    /// Load settings for a launcher living in `launcher_dir`.
    ///
    /// A missing `launcher.yaml` is fine; a malformed one is an error.
    pub fn load(launcher_dir: &Utf8Path) -> Result<Self> {
        let settings_path = launcher_dir.join(SETTINGS_FILE_NAME);
        let defaults =
            Config::try_from(&Self::default()).context("Failed to build default settings")?;

        let layered = Config::builder()
            .add_source(defaults)
            .add_source(
                File::new(settings_path.as_str(), FileFormat::Yaml).required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings: {}", settings_path))?;

        let settings: Self = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", settings_path))?;

        if settings_path.exists() {
            tracing::info!("Loaded launcher settings from {}", settings_path);
        } else {
            tracing::debug!("No {} found, using defaults", settings_path);
        }
        Ok(settings)
    }

    /// Write the settings as `launcher.yaml` into `launcher_dir`.
    pub fn save(&self, launcher_dir: &Utf8Path) -> Result<()> {
        let settings_path = launcher_dir.join(SETTINGS_FILE_NAME);
        let yaml_string =
            serde_yaml_ng::to_string(self).context("Failed to serialize settings to YAML")?;

        fs::write(&settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", settings_path))?;

        tracing::info!("Saved launcher settings to {}", settings_path);
        Ok(())
    }

    /// The game's real save folder, e.g. `%APPDATA%\StardewValley`.
    pub fn canonical_save_dir(&self) -> Result<Utf8PathBuf> {
        let root = match &self.save_root {
            Some(root) => root.clone(),
            None => {
                let base = BaseDirs::new().context("Could not determine the user's home directory")?;
                Utf8PathBuf::try_from(base.config_dir().to_path_buf())
                    .context("Application data directory is not valid UTF-8")?
            }
        };
        Ok(root.join(&self.save_folder_name))
    }

    /// The redirect target inside the launcher folder.
    pub fn local_save_dir(&self, launcher_dir: &Utf8Path) -> Utf8PathBuf {
        launcher_dir.join(&self.save_folder_name)
    }

    pub fn log_dir(&self, launcher_dir: &Utf8Path) -> Utf8PathBuf {
        if self.log_dir.is_absolute() {
            self.log_dir.clone()
        } else {
            launcher_dir.join(&self.log_dir)
        }
    }
}

#[cfg(windows)]
fn default_steam_common() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STEAM_COMMON)
}

#[cfg(not(windows))]
fn default_steam_common() -> Utf8PathBuf {
    BaseDirs::new()
        .and_then(|base| Utf8PathBuf::try_from(base.data_dir().to_path_buf()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from(".local/share"))
        .join("Steam")
        .join("steamapps")
        .join("common")
}

#[cfg(windows)]
fn default_auxiliary_files() -> Vec<Utf8PathBuf> {
    XNA_ASSEMBLIES.iter().map(Utf8PathBuf::from).collect()
}

#[cfg(not(windows))]
fn default_auxiliary_files() -> Vec<Utf8PathBuf> {
    Vec::new()
}
