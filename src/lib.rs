// svportable - Portable launcher for Stardew Valley
//
// This is the library crate containing the launcher state machine and its services.
// The binary crate (main.rs) wires it to native dialogs and a real process runner.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::{ConfigStore, LauncherSettings};
pub use models::{GameVersion, InstallConfig, LaunchOutcome, LaunchState, ModPolicy};
pub use services::{LaunchError, Launcher, Layout};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
