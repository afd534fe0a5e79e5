use camino::Utf8PathBuf;
use std::fmt;

/// Whether mod-related files are synchronized along with the game.
///
/// Starts as [`ModPolicy::Unknown`] on a first install and is resolved the first time a
/// mod-related file is encountered. Once resolved it stays fixed for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModPolicy {
    #[default]
    Unknown,
    Include,
    Exclude,
}

impl ModPolicy {
    /// Build a resolved policy from a yes/no answer.
    pub fn from_answer(include: bool) -> Self {
        if include { Self::Include } else { Self::Exclude }
    }

    pub fn is_resolved(self) -> bool {
        self != Self::Unknown
    }

    /// Value written to `config.cfg`. An unresolved policy is persisted as "no mods".
    pub fn includes_mods(self) -> bool {
        self == Self::Include
    }
}

impl fmt::Display for ModPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Include => "include mods",
            Self::Exclude => "exclude mods",
        };
        f.write_str(label)
    }
}

/// Contents of `config.cfg`, the marker that a portable install exists in a directory.
///
/// `source_path` points at the canonical (Steam) installation the portable copy was made from.
/// The directory may be gone on another machine; that is the "away from home" case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub source_path: Utf8PathBuf,
    pub mod_policy: ModPolicy,
}

impl InstallConfig {
    pub fn new(source_path: impl Into<Utf8PathBuf>, mod_policy: ModPolicy) -> Self {
        Self {
            source_path: source_path.into(),
            mod_policy,
        }
    }
}
