//! The launch state machine.
//!
//! ```text
//!                      ┌──────────────────────┐  install ok   ┌───────┐
//!   no config.cfg ───► │ NoPortableInstall    │ ────────────► │       │
//!                      └──────────────────────┘               │       │
//!   source missing ──► PortableInstalledAway ───────────────► │ Ready │ ──► redirect, run, restore
//!   installed ≤ local ► PortableInstalledHomeOlderOrSame ───► │       │
//!   installed > local ► PortableInstalledHomeNewer ─ No/Yes ► │       │
//!                                  │                          └───────┘
//!                                  └─ Cancel / failed sync ─► Aborted ──► "Launch aborted."
//! ```

use crate::config::{ConfigError, ConfigStore, LauncherSettings};
use crate::models::{LaunchOutcome, LaunchState, ModPolicy};
use crate::services::process::ProcessRunner;
use crate::services::redirect::{RedirectError, RedirectHealth, SaveRedirector};
use crate::services::sync::{FileSynchronizer, SyncError, copy_auxiliary_files};
use crate::services::version::{VersionError, VersionInspector};
use crate::ui::{Answer, Prompt};
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

pub const DIALOG_TITLE: &str = "Stardew Valley Portable";
const SELECT_FOLDER_MESSAGE: &str = "Please select the game's local installation folder.";
const SELECT_FOLDER_TITLE: &str = "Select the Stardew Valley installation folder";
const UPDATE_TITLE: &str = "Update?";
const UPDATE_QUESTION: &str = "Your Steam version is newer than your portable version, do you want to update your portable version?";
const REPAIR_TITLE: &str = "Restore saves?";
const REPAIR_QUESTION: &str = "A previous session did not put your save folder back. Restore it now before launching?";
pub const ABORTED_MESSAGE: &str = "Launch aborted.";

/// Fatal launcher errors. Synchronization failures are not in this list:
/// they end the run in [`LaunchState::Aborted`] instead.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Redirect(#[from] RedirectError),

    #[error("Failed to launch {executable}: {source}")]
    Process {
        executable: Utf8PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Where things live for one launcher run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Folder holding the launcher, `config.cfg` and the portable game files.
    pub launcher_dir: Utf8PathBuf,
    /// The game's real save folder.
    pub canonical_save_dir: Utf8PathBuf,
    /// The redirect target inside `launcher_dir`.
    pub local_save_dir: Utf8PathBuf,
}

impl Layout {
    pub fn from_settings(settings: &LauncherSettings, launcher_dir: &Utf8Path) -> anyhow::Result<Self> {
        Ok(Self {
            launcher_dir: launcher_dir.to_path_buf(),
            canonical_save_dir: settings.canonical_save_dir()?,
            local_save_dir: settings.local_save_dir(launcher_dir),
        })
    }
}

/// Decides whether to install, update or just run, then runs the game.
///
/// All user interaction goes through `P`, version reads through `V` and the child
/// process through `R`, which keeps the decision logic deterministic under test.
pub struct Launcher<P, V, R> {
    settings: LauncherSettings,
    layout: Layout,
    prompt: P,
    versions: V,
    runner: R,
    synchronizer: FileSynchronizer,
}

impl<P: Prompt, V: VersionInspector, R: ProcessRunner> Launcher<P, V, R> {
    pub fn new(settings: LauncherSettings, layout: Layout, prompt: P, versions: V, runner: R) -> Self {
        Self {
            settings,
            layout,
            prompt,
            versions,
            runner,
            synchronizer: FileSynchronizer::new(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Run the whole state machine: decide, then launch or abort.
    pub fn run(&self) -> Result<LaunchOutcome, LaunchError> {
        let initial = self.detect()?;
        tracing::info!("Launcher state: {}", initial);

        let decision = self.advance(initial)?;
        tracing::info!("Launcher decision: {}", decision);

        let outcome = match decision {
            LaunchState::Ready => self.launch()?,
            _ => LaunchOutcome::Aborted,
        };

        if outcome == LaunchOutcome::Aborted {
            tracing::warn!("Launch aborted");
            self.prompt.notify(DIALOG_TITLE, ABORTED_MESSAGE);
        }
        Ok(outcome)
    }

    /// Work out the entry state from `config.cfg` and, at home, the two game versions.
    ///
    /// # Errors
    /// A malformed `config.cfg` or an unreadable executable version is fatal.
    pub fn detect(&self) -> Result<LaunchState, LaunchError> {
        let Some(config) = ConfigStore::new(&self.layout.launcher_dir).load()? else {
            return Ok(LaunchState::NoPortableInstall);
        };

        if !config.source_path.is_dir() {
            tracing::info!("{} is not reachable, running portable copy", config.source_path);
            return Ok(LaunchState::PortableInstalledAway);
        }

        let installed = self
            .versions
            .read_version(&self.installed_executable(&config.source_path))?;
        let portable = self.versions.read_version(&self.portable_executable())?;
        tracing::info!("Installed version {}, portable version {}", installed, portable);

        if installed > portable {
            Ok(LaunchState::PortableInstalledHomeNewer {
                config,
                installed,
                portable,
            })
        } else {
            if portable > installed {
                tracing::warn!(
                    "Portable copy ({}) is newer than the Steam copy ({}); leaving both as they are",
                    portable,
                    installed
                );
            }
            Ok(LaunchState::PortableInstalledHomeOlderOrSame)
        }
    }

    /// Move from an entry state to [`LaunchState::Ready`] or [`LaunchState::Aborted`].
    ///
    /// Installing and updating happen here. Terminal states are returned unchanged.
    pub fn advance(&self, state: LaunchState) -> Result<LaunchState, LaunchError> {
        let next = match state {
            LaunchState::NoPortableInstall => self.install(),
            LaunchState::PortableInstalledHomeNewer { config, .. } => {
                match self.prompt.confirm_or_cancel(UPDATE_TITLE, UPDATE_QUESTION) {
                    Answer::Yes => self.synchronize(&config.source_path, config.mod_policy),
                    Answer::No => LaunchState::Ready,
                    Answer::Cancel => LaunchState::Aborted,
                }
            }
            LaunchState::PortableInstalledHomeOlderOrSame | LaunchState::PortableInstalledAway => {
                LaunchState::Ready
            }
            terminal @ (LaunchState::Ready | LaunchState::Aborted) => terminal,
        };
        Ok(next)
    }

    /// Redirect the save folder, run the game and restore the save folder.
    ///
    /// Returns [`LaunchOutcome::Aborted`] if the user declines to repair a save folder
    /// left redirected by an earlier session.
    pub fn launch(&self) -> Result<LaunchOutcome, LaunchError> {
        let redirector =
            SaveRedirector::new(&self.layout.canonical_save_dir, &self.layout.local_save_dir);

        match redirector.inspect() {
            RedirectHealth::Clean => {}
            health @ (RedirectHealth::StaleLink | RedirectHealth::StaleTemp) => {
                tracing::warn!(
                    "Save folder {} was left redirected by an interrupted session ({:?})",
                    redirector.canonical(),
                    health
                );
                if !self.prompt.confirm(REPAIR_TITLE, REPAIR_QUESTION) {
                    return Ok(LaunchOutcome::Aborted);
                }
                redirector.repair()?;
            }
            RedirectHealth::Conflict => {
                return Err(RedirectError::Conflict {
                    canonical: redirector.canonical().to_path_buf(),
                    parked: redirector.parked_path(),
                }
                .into());
            }
        }

        let handle = redirector.begin()?;
        let executable = self.launch_target();
        let result = self.runner.run(&executable, &self.layout.launcher_dir);
        let restored = redirector.end(handle);

        match (result, restored) {
            (Ok(exit_code), Ok(())) => Ok(LaunchOutcome::Launched {
                executable,
                exit_code,
            }),
            (Err(e), Ok(())) => Err(LaunchError::Process {
                executable,
                source: e.into(),
            }),
            (result, Err(e)) => {
                if let Err(run_err) = result {
                    tracing::error!("Game failed to start: {:#}", run_err);
                }
                Err(e.into())
            }
        }
    }

    /// SMAPI when it is present in the portable folder, the game otherwise.
    pub fn launch_target(&self) -> Utf8PathBuf {
        let smapi = self
            .layout
            .launcher_dir
            .join(&self.settings.modding_api_executable);
        if smapi.is_file() {
            smapi
        } else {
            self.portable_executable()
        }
    }

    fn install(&self) -> LaunchState {
        let Some(source) = self.locate_source() else {
            tracing::info!("No installation folder selected");
            return LaunchState::Aborted;
        };

        if !self.installed_executable(&source).is_file() {
            tracing::warn!(
                "{} not found in {}",
                self.settings.game_executable,
                source
            );
            return LaunchState::Aborted;
        }

        if self.synchronize(&source, ModPolicy::Unknown) == LaunchState::Aborted {
            return LaunchState::Aborted;
        }

        match copy_auxiliary_files(&self.settings.auxiliary_files, &self.layout.launcher_dir) {
            Ok(_) => LaunchState::Ready,
            Err(e) => {
                tracing::error!("Failed to copy support files: {}", e);
                LaunchState::Aborted
            }
        }
    }

    fn locate_source(&self) -> Option<Utf8PathBuf> {
        let default = &self.settings.default_source_path;
        if self.installed_executable(default).is_file() {
            tracing::info!("Found game at default location {}", default);
            return Some(default.clone());
        }

        self.prompt.notify(DIALOG_TITLE, SELECT_FOLDER_MESSAGE);
        self.prompt.pick_folder(SELECT_FOLDER_TITLE)
    }

    fn synchronize(&self, source: &Utf8Path, policy: ModPolicy) -> LaunchState {
        match self
            .synchronizer
            .synchronize(source, &self.layout.launcher_dir, policy, &self.prompt)
        {
            Ok(_) => LaunchState::Ready,
            Err(e) => {
                log_sync_failure(&e);
                LaunchState::Aborted
            }
        }
    }

    fn installed_executable(&self, source: &Utf8Path) -> Utf8PathBuf {
        source.join(&self.settings.game_executable)
    }

    fn portable_executable(&self) -> Utf8PathBuf {
        self.layout.launcher_dir.join(&self.settings.game_executable)
    }
}

fn log_sync_failure(error: &SyncError) {
    match error {
        SyncError::Config(e) => tracing::error!("Synchronized, but could not write marker: {}", e),
        other => tracing::error!("Synchronization failed: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameVersion, InstallConfig};
    use crate::services::process::MockProcessRunner;
    use crate::services::version::MockVersionInspector;
    use crate::ui::prompt::MockPrompt;
    use std::fs;
    use tempfile::TempDir;

    struct Env {
        _temp_dir: TempDir,
        root: Utf8PathBuf,
        settings: LauncherSettings,
        layout: Layout,
    }

    fn env() -> Env {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let launcher_dir = root.join("usb");
        fs::create_dir_all(&launcher_dir).unwrap();

        let settings = LauncherSettings {
            default_source_path: root.join("steam"),
            save_root: Some(root.join("appdata")),
            auxiliary_files: Vec::new(),
            ..LauncherSettings::default()
        };
        let layout = Layout::from_settings(&settings, &launcher_dir).unwrap();
        Env {
            _temp_dir: temp_dir,
            root,
            settings,
            layout,
        }
    }

    fn launcher(
        env: &Env,
        prompt: MockPrompt,
        versions: MockVersionInspector,
        runner: MockProcessRunner,
    ) -> Launcher<MockPrompt, MockVersionInspector, MockProcessRunner> {
        Launcher::new(env.settings.clone(), env.layout.clone(), prompt, versions, runner)
    }

    fn write_marker(env: &Env, source: &Utf8Path) {
        ConfigStore::new(&env.layout.launcher_dir)
            .save(&InstallConfig::new(source, ModPolicy::Exclude))
            .unwrap();
    }

    fn versions(env: &Env, installed: GameVersion, portable: GameVersion) -> MockVersionInspector {
        let steam = env.root.join("steam");
        let mut versions = MockVersionInspector::new();
        versions.expect_read_version().returning(move |path| {
            if path.starts_with(&steam) {
                Ok(installed)
            } else {
                Ok(portable)
            }
        });
        versions
    }

    #[test]
    fn test_detect_no_marker() {
        let env = env();
        let l = launcher(&env, MockPrompt::new(), MockVersionInspector::new(), MockProcessRunner::new());
        assert_eq!(l.detect().unwrap(), LaunchState::NoPortableInstall);
    }

    #[test]
    fn test_detect_away_reads_no_versions() {
        let env = env();
        write_marker(&env, &env.root.join("gone"));
        let mut versions = MockVersionInspector::new();
        versions.expect_read_version().never();

        let l = launcher(&env, MockPrompt::new(), versions, MockProcessRunner::new());
        assert_eq!(l.detect().unwrap(), LaunchState::PortableInstalledAway);
    }

    #[test]
    fn test_detect_home_same_version() {
        let env = env();
        let steam = env.root.join("steam");
        fs::create_dir_all(&steam).unwrap();
        write_marker(&env, &steam);

        let v = GameVersion::new(1, 5, 6, 0);
        let l = launcher(&env, MockPrompt::new(), versions(&env, v, v), MockProcessRunner::new());
        assert_eq!(
            l.detect().unwrap(),
            LaunchState::PortableInstalledHomeOlderOrSame
        );
    }

    #[test]
    fn test_detect_home_newer() {
        let env = env();
        let steam = env.root.join("steam");
        fs::create_dir_all(&steam).unwrap();
        write_marker(&env, &steam);

        let l = launcher(
            &env,
            MockPrompt::new(),
            versions(&env, GameVersion::new(1, 6, 0, 0), GameVersion::new(1, 5, 6, 0)),
            MockProcessRunner::new(),
        );
        assert!(matches!(
            l.detect().unwrap(),
            LaunchState::PortableInstalledHomeNewer { .. }
        ));
    }

    #[test]
    fn test_detect_version_error_is_fatal() {
        let env = env();
        let steam = env.root.join("steam");
        fs::create_dir_all(&steam).unwrap();
        write_marker(&env, &steam);

        let mut versions = MockVersionInspector::new();
        versions
            .expect_read_version()
            .returning(|path| Err(VersionError::MissingVersionInfo(path.to_path_buf())));

        let l = launcher(&env, MockPrompt::new(), versions, MockProcessRunner::new());
        assert!(matches!(l.detect(), Err(LaunchError::Version(_))));
    }

    #[test]
    fn test_detect_bad_marker_is_fatal() {
        let env = env();
        fs::write(env.layout.launcher_dir.join("config.cfg"), "/x\nnot-a-bool\n").unwrap();

        let l = launcher(&env, MockPrompt::new(), MockVersionInspector::new(), MockProcessRunner::new());
        assert!(matches!(l.detect(), Err(LaunchError::Config(_))));
    }

    #[test]
    fn test_update_cancel_aborts() {
        let env = env();
        let mut prompt = MockPrompt::new();
        prompt
            .expect_confirm_or_cancel()
            .times(1)
            .return_const(Answer::Cancel);

        let l = launcher(&env, prompt, MockVersionInspector::new(), MockProcessRunner::new());
        let state = LaunchState::PortableInstalledHomeNewer {
            config: InstallConfig::new(env.root.join("steam"), ModPolicy::Exclude),
            installed: GameVersion::new(1, 6, 0, 0),
            portable: GameVersion::new(1, 5, 0, 0),
        };
        assert_eq!(l.advance(state).unwrap(), LaunchState::Aborted);
    }

    #[test]
    fn test_update_yes_with_failed_sync_aborts() {
        let env = env();
        let mut prompt = MockPrompt::new();
        prompt
            .expect_confirm_or_cancel()
            .return_const(Answer::Yes);

        let l = launcher(&env, prompt, MockVersionInspector::new(), MockProcessRunner::new());
        // The source folder does not exist, so synchronization fails
        let state = LaunchState::PortableInstalledHomeNewer {
            config: InstallConfig::new(env.root.join("steam"), ModPolicy::Exclude),
            installed: GameVersion::new(1, 6, 0, 0),
            portable: GameVersion::new(1, 5, 0, 0),
        };
        assert_eq!(l.advance(state).unwrap(), LaunchState::Aborted);
    }

    #[test]
    fn test_terminal_states_unchanged() {
        let env = env();
        let l = launcher(&env, MockPrompt::new(), MockVersionInspector::new(), MockProcessRunner::new());
        assert_eq!(l.advance(LaunchState::Ready).unwrap(), LaunchState::Ready);
        assert_eq!(l.advance(LaunchState::Aborted).unwrap(), LaunchState::Aborted);
    }

    #[test]
    fn test_install_folder_picker_cancelled() {
        let env = env();
        let mut prompt = MockPrompt::new();
        prompt.expect_notify().times(1).return_const(());
        prompt.expect_pick_folder().times(1).return_const(None::<Utf8PathBuf>);

        let l = launcher(&env, prompt, MockVersionInspector::new(), MockProcessRunner::new());
        assert_eq!(
            l.advance(LaunchState::NoPortableInstall).unwrap(),
            LaunchState::Aborted
        );
    }

    #[test]
    fn test_install_picked_folder_without_game_aborts() {
        let env = env();
        let empty = env.root.join("empty");
        fs::create_dir_all(&empty).unwrap();

        let mut prompt = MockPrompt::new();
        prompt.expect_notify().return_const(());
        prompt.expect_pick_folder().return_const(Some(empty));

        let l = launcher(&env, prompt, MockVersionInspector::new(), MockProcessRunner::new());
        assert_eq!(
            l.advance(LaunchState::NoPortableInstall).unwrap(),
            LaunchState::Aborted
        );
        assert!(!ConfigStore::new(&env.layout.launcher_dir).exists());
    }

    #[test]
    fn test_launch_target_prefers_smapi() {
        let env = env();
        let l = launcher(&env, MockPrompt::new(), MockVersionInspector::new(), MockProcessRunner::new());
        assert!(l.launch_target().as_str().ends_with("Stardew Valley.exe"));

        fs::write(env.layout.launcher_dir.join("StardewModdingAPI.exe"), "smapi").unwrap();
        assert!(l.launch_target().as_str().ends_with("StardewModdingAPI.exe"));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_restores_saves_even_if_process_fails() {
        let env = env();
        let canonical = &env.layout.canonical_save_dir;
        fs::create_dir_all(canonical).unwrap();
        fs::write(canonical.join("startup_preferences"), "real").unwrap();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("spawn failed")));

        let l = launcher(&env, MockPrompt::new(), MockVersionInspector::new(), runner);
        assert!(matches!(l.launch(), Err(LaunchError::Process { .. })));
        assert_eq!(
            fs::read_to_string(canonical.join("startup_preferences")).unwrap(),
            "real"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_declined_repair_aborts() {
        let env = env();
        let redirector =
            SaveRedirector::new(&env.layout.canonical_save_dir, &env.layout.local_save_dir);
        fs::create_dir_all(redirector.parked_path()).unwrap();

        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().times(1).return_const(false);
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();

        let l = launcher(&env, prompt, MockVersionInspector::new(), runner);
        assert_eq!(l.launch().unwrap(), LaunchOutcome::Aborted);
        assert!(redirector.parked_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_declined_link_repair_aborts() {
        let env = env();
        let redirector =
            SaveRedirector::new(&env.layout.canonical_save_dir, &env.layout.local_save_dir);
        std::mem::forget(redirector.begin().unwrap());
        assert_eq!(redirector.inspect(), RedirectHealth::StaleLink);

        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().times(1).return_const(false);
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();

        let l = launcher(&env, prompt, MockVersionInspector::new(), runner);
        assert_eq!(l.launch().unwrap(), LaunchOutcome::Aborted);
        assert_eq!(redirector.inspect(), RedirectHealth::StaleLink);
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_accepted_link_repair_runs_game() {
        let env = env();
        let redirector =
            SaveRedirector::new(&env.layout.canonical_save_dir, &env.layout.local_save_dir);
        std::mem::forget(redirector.begin().unwrap());

        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().times(1).return_const(true);
        let mut runner = MockProcessRunner::new();
        runner.expect_run().times(1).returning(|_, _| Ok(Some(0)));

        let l = launcher(&env, prompt, MockVersionInspector::new(), runner);
        assert!(matches!(l.launch().unwrap(), LaunchOutcome::Launched { .. }));
        assert_eq!(redirector.inspect(), RedirectHealth::Clean);
        assert!(fs::symlink_metadata(&env.layout.canonical_save_dir).is_err());
    }
}
