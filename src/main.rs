//! svportable - Portable launcher for Stardew Valley
//!
//! Main entry point.
//!
//! # Overview
//!
//! Place the launcher on a portable drive. On first start it copies the Steam installation
//! next to itself; on later starts it offers to update the copy when the Steam version is
//! newer, then runs the game with its save folder redirected to the drive.
//!
//! # Execution Flow
//!
//! 1. Resolve the launcher folder from the executable path
//! 2. Load `launcher.yaml` / `SVPORTABLE_*` settings
//! 3. Initialize logging → `<launcher folder>/logs/svportable.<date>`
//! 4. Run the launch state machine with native dialogs, PE version reading and tokio
//!    process execution
//! 5. Show fatal errors, settings failures included, in a message box and exit non-zero

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use svportable::services::{PeVersionInspector, TokioProcessRunner};
use svportable::ui::{DialogPrompt, report_fatal};
use svportable::{APP_NAME, LaunchOutcome, Launcher, LauncherSettings, Layout, VERSION};

fn main() -> Result<()> {
    let (launcher_dir, settings) = match load_settings() {
        Ok(loaded) => loaded,
        // Logging is not up yet
        Err(e) => return Err(report_fatal(&DialogPrompt::new(), APP_NAME, e)),
    };

    let _guard = svportable::logging::setup_logging_with_console(
        &settings.log_dir(&launcher_dir),
        APP_NAME,
        settings.debug_logging,
        settings.console_logging,
    )?;

    tracing::info!("Starting {} v{} in {}", APP_NAME, VERSION, launcher_dir);

    let layout = Layout::from_settings(&settings, &launcher_dir)?;
    tracing::info!(
        "Save folder {} will be redirected to {}",
        layout.canonical_save_dir,
        layout.local_save_dir
    );

    let launcher = Launcher::new(
        settings,
        layout,
        DialogPrompt::new(),
        PeVersionInspector::new(),
        TokioProcessRunner::new()?,
    );

    match launcher.run() {
        Ok(LaunchOutcome::Launched {
            executable,
            exit_code,
        }) => {
            tracing::info!("{} finished with exit code {:?}", executable, exit_code);
            Ok(())
        }
        Ok(LaunchOutcome::Aborted) => Ok(()),
        Err(e) => Err(report_fatal(&DialogPrompt::new(), APP_NAME, e.into())),
    }
}

fn load_settings() -> Result<(Utf8PathBuf, LauncherSettings)> {
    let launcher_dir = launcher_dir()?;
    let settings = LauncherSettings::load(&launcher_dir)?;
    Ok((launcher_dir, settings))
}

/// Folder containing the running executable.
fn launcher_dir() -> Result<Utf8PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the launcher executable")?;
    let exe = Utf8PathBuf::try_from(exe).context("Launcher path is not valid UTF-8")?;
    exe.parent()
        .map(|dir| dir.to_path_buf())
        .context("Launcher executable has no parent folder")
}
