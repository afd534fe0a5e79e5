use crate::models::{GameVersion, InstallConfig};
use camino::Utf8PathBuf;
use std::fmt;

/// States of the launch state machine.
///
/// The first four are entry states produced by
/// [`Launcher::detect`](crate::services::launcher::Launcher::detect); `Ready` and `Aborted`
/// are the terminal decisions produced by
/// [`Launcher::advance`](crate::services::launcher::Launcher::advance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchState {
    /// No `config.cfg` in the launcher directory.
    NoPortableInstall,

    /// The canonical install is reachable and carries a newer game version.
    PortableInstalledHomeNewer {
        config: InstallConfig,
        installed: GameVersion,
        portable: GameVersion,
    },

    /// The canonical install is reachable and is not newer than the portable copy.
    PortableInstalledHomeOlderOrSame,

    /// The recorded canonical install path does not exist on this machine.
    PortableInstalledAway,

    /// Run the portable copy.
    Ready,

    /// Stop without launching.
    Aborted,
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoPortableInstall => "no portable install",
            Self::PortableInstalledHomeNewer { .. } => "at home, Steam copy newer",
            Self::PortableInstalledHomeOlderOrSame => "at home, portable copy up to date",
            Self::PortableInstalledAway => "away from home",
            Self::Ready => "ready",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Final result of a launcher run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The game (or SMAPI) ran and exited. The exit code is informational only.
    Launched {
        executable: Utf8PathBuf,
        exit_code: Option<i32>,
    },
    Aborted,
}
