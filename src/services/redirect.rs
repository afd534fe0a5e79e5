use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use thiserror::Error;

/// Suffix of the sibling folder the real saves are parked in while the game runs.
pub const PARKED_SUFFIX: &str = "Temp";

#[derive(Error, Debug)]
pub enum RedirectError {
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not link {link} to {target}: {source}")]
    LinkFailed {
        link: Utf8PathBuf,
        target: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} already exists; a previous session was not restored")]
    TempExists(Utf8PathBuf),

    #[error("{0} is not the portable save link")]
    NotALink(Utf8PathBuf),

    #[error("Both {canonical} and {parked} hold save data; resolve this by hand")]
    Conflict {
        canonical: Utf8PathBuf,
        parked: Utf8PathBuf,
    },
}

/// State of the save folder before a redirect starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectHealth {
    /// No link and no parked folder.
    Clean,
    /// A link to the portable folder is left at the canonical path but nothing is parked.
    StaleLink,
    /// A parked folder survived an interrupted session; the canonical path is our link or missing.
    StaleTemp,
    /// A parked folder exists next to a real canonical folder or a foreign link.
    Conflict,
}

/// Proof of an active redirect. Pass it back to [`SaveRedirector::end`].
#[derive(Debug)]
#[must_use = "the save folder stays redirected until the handle is ended"]
pub struct RedirectHandle {
    canonical: Utf8PathBuf,
    parked: Option<Utf8PathBuf>,
}

impl RedirectHandle {
    /// Whether the real save folder was moved aside and must be put back.
    pub fn restore_owed(&self) -> bool {
        self.parked.is_some()
    }
}

type LinkFn = fn(&Utf8Path, &Utf8Path) -> io::Result<()>;

/// Points the game's save folder at the portable copy for the duration of a session.
///
/// The real folder is renamed to `<name>Temp`, a directory symbolic link takes its place,
/// and [`end`](Self::end) reverses both steps. Only a link pointing at the portable folder
/// is ever removed. The real save folder, or a link the user placed there, is renamed,
/// never deleted.
#[derive(Debug, Clone)]
pub struct SaveRedirector {
    canonical: Utf8PathBuf,
    local: Utf8PathBuf,
    link: LinkFn,
}

impl SaveRedirector {
    /// `canonical` is where the game looks for saves, `local` where they should live.
    pub fn new(canonical: impl Into<Utf8PathBuf>, local: impl Into<Utf8PathBuf>) -> Self {
        Self {
            canonical: canonical.into(),
            local: local.into(),
            link: create_dir_link,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_link_creator(mut self, link: LinkFn) -> Self {
        self.link = link;
        self
    }

    pub fn canonical(&self) -> &Utf8Path {
        &self.canonical
    }

    pub fn local(&self) -> &Utf8Path {
        &self.local
    }

    pub fn parked_path(&self) -> Utf8PathBuf {
        let name = self.canonical.file_name().unwrap_or_default();
        self.canonical
            .with_file_name(format!("{}{}", name, PARKED_SUFFIX))
    }

    /// Start the redirect.
    ///
    /// # Errors
    /// If the link cannot be created the parked folder is moved back before returning,
    /// so a failed start leaves the real saves where they were.
    pub fn begin(&self) -> Result<RedirectHandle, RedirectError> {
        if self.is_own_link(&self.canonical) {
            tracing::warn!("Removing leftover save link at {}", self.canonical);
            remove_dir_link(&self.canonical).map_err(|source| RedirectError::Io {
                action: "remove link",
                path: self.canonical.clone(),
                source,
            })?;
        }

        let parked = if is_present(&self.canonical) {
            let parked = self.parked_path();
            if is_present(&parked) {
                return Err(RedirectError::TempExists(parked));
            }
            fs::rename(&self.canonical, &parked).map_err(|source| RedirectError::Io {
                action: "move aside",
                path: self.canonical.clone(),
                source,
            })?;
            tracing::info!("Moved {} to {}", self.canonical, parked);
            Some(parked)
        } else {
            None
        };

        if let Err(e) = self.create_link() {
            self.unpark(parked.as_deref());
            return Err(e);
        }

        tracing::info!("Linked {} -> {}", self.canonical, self.local);
        Ok(RedirectHandle {
            canonical: self.canonical.clone(),
            parked,
        })
    }

    /// End the redirect: drop the link and put the real folder back if one was parked.
    pub fn end(&self, handle: RedirectHandle) -> Result<(), RedirectError> {
        if self.is_own_link(&handle.canonical) {
            remove_dir_link(&handle.canonical).map_err(|source| RedirectError::Io {
                action: "remove link",
                path: handle.canonical.clone(),
                source,
            })?;
            tracing::debug!("Removed save link {}", handle.canonical);
        } else if is_present(&handle.canonical) && handle.restore_owed() {
            return Err(RedirectError::NotALink(handle.canonical));
        }

        if let Some(parked) = handle.parked {
            fs::rename(&parked, &handle.canonical).map_err(|source| RedirectError::Io {
                action: "restore",
                path: parked.clone(),
                source,
            })?;
            tracing::info!("Restored {} from {}", handle.canonical, parked);
        }
        Ok(())
    }

    /// Look for leftovers of an interrupted session.
    pub fn inspect(&self) -> RedirectHealth {
        let parked = self.parked_path();
        let parked_exists = is_present(&parked);
        let own_link = self.is_own_link(&self.canonical);
        let occupied = !own_link && is_present(&self.canonical);

        match (parked_exists, own_link, occupied) {
            (true, _, true) => RedirectHealth::Conflict,
            (true, _, false) => RedirectHealth::StaleTemp,
            (false, true, _) => RedirectHealth::StaleLink,
            (false, false, _) => RedirectHealth::Clean,
        }
    }

    /// Undo leftovers reported by [`inspect`](Self::inspect).
    ///
    /// # Errors
    /// [`RedirectHealth::Conflict`] is never repaired automatically.
    pub fn repair(&self) -> Result<RedirectHealth, RedirectError> {
        let health = self.inspect();
        match health {
            RedirectHealth::Clean => {}
            RedirectHealth::StaleLink => {
                remove_dir_link(&self.canonical).map_err(|source| RedirectError::Io {
                    action: "remove link",
                    path: self.canonical.clone(),
                    source,
                })?;
            }
            RedirectHealth::StaleTemp => {
                let parked = self.parked_path();
                self.end(RedirectHandle {
                    canonical: self.canonical.clone(),
                    parked: Some(parked),
                })?;
            }
            RedirectHealth::Conflict => {
                return Err(RedirectError::Conflict {
                    canonical: self.canonical.clone(),
                    parked: self.parked_path(),
                });
            }
        }

        tracing::info!("Repaired save folder state ({:?})", health);
        Ok(health)
    }

    fn create_link(&self) -> Result<(), RedirectError> {
        for dir in [Some(self.local.as_path()), self.canonical.parent()]
            .into_iter()
            .flatten()
        {
            fs::create_dir_all(dir).map_err(|source| RedirectError::Io {
                action: "create",
                path: dir.to_path_buf(),
                source,
            })?;
        }

        (self.link)(&self.local, &self.canonical).map_err(|source| RedirectError::LinkFailed {
            link: self.canonical.clone(),
            target: self.local.clone(),
            source,
        })
    }

    fn unpark(&self, parked: Option<&Utf8Path>) {
        let Some(parked) = parked else { return };
        match fs::rename(parked, &self.canonical) {
            Ok(()) => tracing::info!("Moved {} back to {}", parked, self.canonical),
            Err(e) => tracing::error!(
                "Could not move {} back to {}: {}. Your saves are in {}",
                parked,
                self.canonical,
                e,
                parked
            ),
        }
    }

    /// Whether `path` is a link resolving to the portable save folder.
    fn is_own_link(&self, path: &Utf8Path) -> bool {
        let Ok(target) = fs::read_link(path) else {
            return false;
        };
        if target == self.local.as_std_path() {
            return true;
        }
        // Relative or differently spelled targets
        match (fs::canonicalize(path), fs::canonicalize(&self.local)) {
            (Ok(resolved), Ok(local)) => resolved == local,
            _ => false,
        }
    }
}

/// True for anything at `path`, dangling links included.
fn is_present(path: &Utf8Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(unix)]
fn create_dir_link(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_dir_link(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn remove_dir_link(link: &Utf8Path) -> io::Result<()> {
    fs::remove_file(link)
}

#[cfg(windows)]
fn remove_dir_link(link: &Utf8Path) -> io::Result<()> {
    fs::remove_dir(link)
}
