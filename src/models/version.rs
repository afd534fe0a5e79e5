use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Four-component executable file version (`major.minor.build.revision`).
///
/// Field order matters: the derived ordering compares components left to right,
/// which is the ordering used to decide whether the Steam copy is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl GameVersion {
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Decode the packed `dwFileVersionMS` / `dwFileVersionLS` pair of a PE version resource.
    pub const fn from_packed(ms: u32, ls: u32) -> Self {
        Self::new(
            (ms >> 16) as u16,
            (ms & 0xFFFF) as u16,
            (ls >> 16) as u16,
            (ls & 0xFFFF) as u16,
        )
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("Version '{0}' must have between 2 and 4 components")]
    ComponentCount(String),

    #[error("Invalid version component '{component}' in '{version}'")]
    InvalidComponent { version: String, component: String },
}

impl FromStr for GameVersion {
    type Err = VersionParseError;

    /// Parses `a.b`, `a.b.c` or `a.b.c.d`; missing trailing components are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(VersionParseError::ComponentCount(trimmed.to_string()));
        }

        let mut components = [0u16; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| VersionParseError::InvalidComponent {
                    version: trimmed.to_string(),
                    component: (*part).to_string(),
                })?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}
