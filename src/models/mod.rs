//! Data models for the portable launcher.
//!
//! This module contains the core data structures shared across the crate:
//! - [`InstallConfig`]: The `config.cfg` marker recording where the portable copy came from
//! - [`ModPolicy`]: Whether mod files are carried along during synchronization
//! - [`GameVersion`]: Four-component executable file version used for update checks
//! - [`LaunchState`] / [`LaunchOutcome`]: States of the launch state machine and its final result
//!
//! # Architecture Note
//!
//! The models carry no I/O. Reading and writing them is done by
//! [`ConfigStore`](crate::config::ConfigStore) and the services layer.

pub mod install;
pub mod launch;
pub mod version;

pub use install::{InstallConfig, ModPolicy};
pub use launch::{LaunchOutcome, LaunchState};
pub use version::{GameVersion, VersionParseError};
