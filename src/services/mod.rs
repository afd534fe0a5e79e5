//! Services module - the launcher's business logic.
//!
//! # Components
//!
//! - [`FileSynchronizer`]: Merges the Steam installation into the portable folder, asking once
//!   whether mod files should come along
//! - [`VersionInspector`]: Reads executable file versions for the update check
//!   ([`PeVersionInspector`] parses the PE version resource)
//! - [`SaveRedirector`]: Parks the real save folder and links its path to the portable one
//!   for the duration of a session
//! - [`ProcessRunner`]: Runs the game and waits for it ([`TokioProcessRunner`])
//! - [`Launcher`]: The state machine tying everything together
//!
//! # Design Philosophy
//!
//! Everything that talks to the user, inspects binaries or starts processes sits behind a
//! trait, so the state machine can be tested with scripted answers. File operations use the
//! real filesystem and are tested against temporary folders.

pub mod launcher;
pub mod process;
pub mod redirect;
pub mod sync;
pub mod version;

pub use launcher::{LaunchError, Launcher, Layout};
pub use process::{ProcessRunner, TokioProcessRunner};
pub use redirect::{RedirectError, RedirectHandle, RedirectHealth, SaveRedirector};
pub use sync::{FileClass, FileSynchronizer, ModClassifier, SyncError, SyncReport, copy_auxiliary_files};
pub use version::{PeVersionInspector, VersionError, VersionInspector};
