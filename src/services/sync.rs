use crate::config::{ConfigError, ConfigStore};
use crate::models::{InstallConfig, ModPolicy};
use crate::ui::Prompt;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use walkdir::WalkDir;

const MOD_QUESTION_TITLE: &str = "Modding";
const MOD_QUESTION: &str = "The game is modded, do you want to install it along with the mods?";

/// Errors that abort a synchronization run.
///
/// Files copied before the failure stay in place; a run is not transactional.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Source folder not found: {0}")]
    SourceMissing(Utf8PathBuf),

    #[error("Destination {dest} lies inside source {source_dir}")]
    DestinationInsideSource {
        source_dir: Utf8PathBuf,
        dest: Utf8PathBuf,
    },

    #[error("Failed to enumerate {path}: {source}")]
    Walk {
        path: Utf8PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Failed to create folder {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Classification of a file relative to the game root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Core,
    ModRelated,
}

/// Decides which files belong to mods or the SMAPI loader.
///
/// A relative path is mod-related when it starts with `mods`, `smapi` or
/// `StardewModdingAPI`, ignoring case. This is a plain prefix test, so
/// `Mods/ContentPatcher/manifest.json`, `smapi-internal/SMAPI.config.json`
/// and `StardewModdingAPI.exe` all match.
#[derive(Debug, Clone)]
pub struct ModClassifier {
    pattern: Regex,
}

impl ModClassifier {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)^(mods|smapi|stardewmoddingapi)")
                .expect("Invalid mod prefix regex"),
        }
    }

    pub fn classify(&self, relative_path: &Utf8Path) -> FileClass {
        if self.pattern.is_match(relative_path.as_str()) {
            FileClass::ModRelated
        } else {
            FileClass::Core
        }
    }
}

impl Default for ModClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from a synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub mod_files_skipped: usize,
    /// Mod policy in force at the end of the run. Still `Unknown` if no mod file was seen.
    pub policy: ModPolicy,
}

impl SyncReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} files copied ({} bytes)",
            self.files_copied, self.bytes_copied
        );
        if self.mod_files_skipped > 0 {
            summary.push_str(&format!(", {} mod files skipped", self.mod_files_skipped));
        }
        summary
    }
}

/// Merges a game installation into the portable folder.
#[derive(Debug, Clone, Default)]
pub struct FileSynchronizer {
    classifier: ModClassifier,
}

impl FileSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every file under `source` into `dest`, honouring the mod policy.
    ///
    /// When `hint` is [`ModPolicy::Unknown`], the user is asked once, at the first
    /// mod-related file, whether mods should be copied too. The answer holds for the
    /// rest of the run and is returned in [`SyncReport::policy`].
    ///
    /// Existing files in `dest` are overwritten; files that only exist in `dest`
    /// are left alone. On success a `config.cfg` marker is written to `dest` if
    /// there is none yet.
    ///
    /// # Errors
    /// Any I/O failure stops the run. Files already copied are not rolled back.
    pub fn synchronize<P: Prompt + ?Sized>(
        &self,
        source: &Utf8Path,
        dest: &Utf8Path,
        hint: ModPolicy,
        prompt: &P,
    ) -> Result<SyncReport, SyncError> {
        self.check_roots(source, dest)?;
        tracing::info!("Synchronizing {} -> {} (mods: {})", source, dest, hint);

        let mut report = SyncReport {
            policy: hint,
            ..SyncReport::default()
        };

        for entry in WalkDir::new(source)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source_err| SyncError::Walk {
                path: source.to_path_buf(),
                source: source_err,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let from = Utf8Path::from_path(entry.path())
                .ok_or_else(|| SyncError::NonUtf8Path(entry.path().to_path_buf()))?;
            let relative = from
                .strip_prefix(source)
                .map_err(|_| SyncError::NonUtf8Path(entry.path().to_path_buf()))?;

            if self.classifier.classify(relative) == FileClass::ModRelated {
                if !report.policy.is_resolved() {
                    let include = prompt.confirm(MOD_QUESTION_TITLE, MOD_QUESTION);
                    report.policy = ModPolicy::from_answer(include);
                    tracing::info!("Mod policy resolved: {}", report.policy);
                }
                if !report.policy.includes_mods() {
                    tracing::trace!("Skipping mod file {}", relative);
                    report.mod_files_skipped += 1;
                    continue;
                }
            }

            let to = dest.join(relative);
            report.bytes_copied += copy_file(from, &to)?;
            report.files_copied += 1;
            tracing::debug!("Copied {}", relative);
        }

        let store = ConfigStore::new(dest);
        if !store.exists() {
            store.save(&InstallConfig::new(source, report.policy))?;
        }

        tracing::info!("Synchronization finished: {}", report.summary());
        Ok(report)
    }

    fn check_roots(&self, source: &Utf8Path, dest: &Utf8Path) -> Result<(), SyncError> {
        let source_canonical = source
            .canonicalize_utf8()
            .map_err(|_| SyncError::SourceMissing(source.to_path_buf()))?;

        // A destination that does not exist yet cannot be inside the source
        if let Ok(dest_canonical) = dest.canonicalize_utf8() {
            if dest_canonical.starts_with(&source_canonical) {
                return Err(SyncError::DestinationInsideSource {
                    source_dir: source.to_path_buf(),
                    dest: dest.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

/// Copy support files into `dest`, keeping only their file names.
///
/// # Returns
/// The number of files copied
pub fn copy_auxiliary_files(files: &[Utf8PathBuf], dest: &Utf8Path) -> Result<usize, SyncError> {
    let mut copied = 0;
    for file in files {
        let Some(name) = file.file_name() else {
            tracing::warn!("Ignoring auxiliary entry without a file name: {}", file);
            continue;
        };
        copy_file(file, &dest.join(name))?;
        tracing::debug!("Copied support file {}", name);
        copied += 1;
    }

    tracing::info!("Copied {} support files into {}", copied, dest);
    Ok(copied)
}

fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<u64, SyncError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| SyncError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::copy(from, to).map_err(|source| SyncError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::prompt::MockPrompt;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        source: Utf8PathBuf,
        dest: Utf8PathBuf,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let source = root.join("steam");
        let dest = root.join("portable");
        fs::create_dir_all(&dest).unwrap();
        for (path, contents) in files {
            let full = source.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, contents).unwrap();
        }
        Fixture {
            _temp_dir: temp_dir,
            source,
            dest,
        }
    }

    #[test]
    fn test_classifier() {
        let classifier = ModClassifier::new();
        assert_eq!(
            classifier.classify(Utf8Path::new("Mods/ContentPatcher/manifest.json")),
            FileClass::ModRelated
        );
        assert_eq!(
            classifier.classify(Utf8Path::new("smapi-internal/SMAPI.config.json")),
            FileClass::ModRelated
        );
        assert_eq!(
            classifier.classify(Utf8Path::new("StardewModdingAPI.exe")),
            FileClass::ModRelated
        );
        assert_eq!(
            classifier.classify(Utf8Path::new("Content/Maps/Farm.xnb")),
            FileClass::Core
        );
        assert_eq!(
            classifier.classify(Utf8Path::new("Stardew Valley.exe")),
            FileClass::Core
        );
    }

    #[test]
    fn test_core_only_tree_never_prompts() {
        let fx = fixture(&[("Stardew Valley.exe", "exe"), ("Content/a.xnb", "a")]);
        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().never();

        let report = FileSynchronizer::new()
            .synchronize(&fx.source, &fx.dest, ModPolicy::Unknown, &prompt)
            .unwrap();

        assert_eq!(report.files_copied, 2);
        assert_eq!(report.policy, ModPolicy::Unknown);
        assert_eq!(fs::read_to_string(fx.dest.join("Content/a.xnb")).unwrap(), "a");
    }

    #[test]
    fn test_mod_prompt_asked_once() {
        let fx = fixture(&[
            ("Mods/A/manifest.json", "a"),
            ("Mods/B/manifest.json", "b"),
            ("smapi-internal/x.dll", "x"),
            ("Stardew Valley.exe", "exe"),
        ]);
        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().times(1).return_const(true);

        let report = FileSynchronizer::new()
            .synchronize(&fx.source, &fx.dest, ModPolicy::Unknown, &prompt)
            .unwrap();

        assert_eq!(report.policy, ModPolicy::Include);
        assert_eq!(report.files_copied, 4);
        assert!(fx.dest.join("Mods/B/manifest.json").exists());
    }

    #[test]
    fn test_declined_mods_are_skipped() {
        let fx = fixture(&[
            ("Mods/A/manifest.json", "a"),
            ("StardewModdingAPI.exe", "smapi"),
            ("Stardew Valley.exe", "exe"),
        ]);
        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().times(1).return_const(false);

        let report = FileSynchronizer::new()
            .synchronize(&fx.source, &fx.dest, ModPolicy::Unknown, &prompt)
            .unwrap();

        assert_eq!(report.policy, ModPolicy::Exclude);
        assert_eq!(report.files_copied, 1);
        assert_eq!(report.mod_files_skipped, 2);
        assert!(!fx.dest.join("Mods").exists());
        assert!(!fx.dest.join("StardewModdingAPI.exe").exists());
    }

    #[test]
    fn test_marker_written_once() {
        let fx = fixture(&[("Stardew Valley.exe", "exe")]);
        let prompt = MockPrompt::new();
        let sync = FileSynchronizer::new();

        sync.synchronize(&fx.source, &fx.dest, ModPolicy::Include, &prompt)
            .unwrap();
        let store = ConfigStore::new(&fx.dest);
        let first = store.load().unwrap().unwrap();
        assert_eq!(first.source_path, fx.source);
        assert_eq!(first.mod_policy, ModPolicy::Include);

        // An existing marker is left as it is
        sync.synchronize(&fx.source, &fx.dest, ModPolicy::Exclude, &prompt)
            .unwrap();
        assert_eq!(store.load().unwrap().unwrap(), first);
    }

    #[test]
    fn test_overwrites_existing_files() {
        let fx = fixture(&[("Content/a.xnb", "new")]);
        fs::create_dir_all(fx.dest.join("Content")).unwrap();
        fs::write(fx.dest.join("Content/a.xnb"), "old").unwrap();
        fs::write(fx.dest.join("local-only.txt"), "keep").unwrap();

        FileSynchronizer::new()
            .synchronize(&fx.source, &fx.dest, ModPolicy::Exclude, &MockPrompt::new())
            .unwrap();

        assert_eq!(fs::read_to_string(fx.dest.join("Content/a.xnb")).unwrap(), "new");
        assert_eq!(fs::read_to_string(fx.dest.join("local-only.txt")).unwrap(), "keep");
    }

    #[test]
    fn test_missing_source() {
        let fx = fixture(&[]);
        let result = FileSynchronizer::new().synchronize(
            &fx.source.join("nope"),
            &fx.dest,
            ModPolicy::Exclude,
            &MockPrompt::new(),
        );
        assert!(matches!(result, Err(SyncError::SourceMissing(_))));
        assert!(!ConfigStore::new(&fx.dest).exists());
    }

    #[test]
    fn test_destination_inside_source_rejected() {
        let fx = fixture(&[("Stardew Valley.exe", "exe")]);
        let nested = fx.source.join("portable");
        fs::create_dir_all(&nested).unwrap();

        let result = FileSynchronizer::new().synchronize(
            &fx.source,
            &nested,
            ModPolicy::Exclude,
            &MockPrompt::new(),
        );
        assert!(matches!(
            result,
            Err(SyncError::DestinationInsideSource { .. })
        ));
    }

    #[test]
    fn test_copy_auxiliary_files() {
        let fx = fixture(&[("xna/Microsoft.Xna.Framework.dll", "dll")]);
        let files = vec![fx.source.join("xna/Microsoft.Xna.Framework.dll")];

        let copied = copy_auxiliary_files(&files, &fx.dest).unwrap();
        assert_eq!(copied, 1);
        assert!(fx.dest.join("Microsoft.Xna.Framework.dll").exists());
    }

    #[test]
    fn test_copy_auxiliary_counts_only_copied_files() {
        let fx = fixture(&[("xna/Microsoft.Xna.Framework.dll", "dll")]);
        let files = vec![
            fx.source.join("xna/Microsoft.Xna.Framework.dll"),
            Utf8PathBuf::from("/"),
        ];

        assert_eq!(copy_auxiliary_files(&files, &fx.dest).unwrap(), 1);
    }

    #[test]
    fn test_copy_auxiliary_missing_file_fails() {
        let fx = fixture(&[]);
        let files = vec![fx.source.join("missing.dll")];
        assert!(matches!(
            copy_auxiliary_files(&files, &fx.dest),
            Err(SyncError::Copy { .. })
        ));
    }

    #[test]
    fn test_report_summary() {
        let report = SyncReport {
            files_copied: 3,
            bytes_copied: 42,
            mod_files_skipped: 2,
            policy: ModPolicy::Exclude,
        };
        let summary = report.summary();
        assert!(summary.contains("3 files copied"));
        assert!(summary.contains("2 mod files skipped"));
    }
}
