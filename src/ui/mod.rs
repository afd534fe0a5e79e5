// UI module - user-facing dialogs
//
// This module contains:
// - Prompt: The dialog capability the launcher logic talks to, plus fatal error reporting
// - DialogPrompt: Native message boxes and folder picker backed by rfd

pub mod dialogs;
pub mod prompt;

pub use dialogs::DialogPrompt;
pub use prompt::{Answer, Prompt, report_fatal};
