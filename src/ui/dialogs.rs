use super::prompt::{Answer, Prompt};
use camino::Utf8PathBuf;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

/// [`Prompt`] implementation using native dialogs from the `rfd` crate.
#[derive(Debug, Clone, Default)]
pub struct DialogPrompt;

impl DialogPrompt {
    pub fn new() -> Self {
        Self
    }

    fn dialog(title: &str, description: &str, buttons: MessageButtons) -> MessageDialogResult {
        MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(title)
            .set_description(description)
            .set_buttons(buttons)
            .show()
    }
}

impl Prompt for DialogPrompt {
    fn notify(&self, title: &str, message: &str) {
        tracing::debug!("Message box: {}", message);
        Self::dialog(title, message, MessageButtons::Ok);
    }

    fn confirm(&self, title: &str, question: &str) -> bool {
        let result = Self::dialog(title, question, MessageButtons::YesNo);
        tracing::debug!("Question '{}' answered {:?}", question, result);
        matches!(result, MessageDialogResult::Yes)
    }

    fn confirm_or_cancel(&self, title: &str, question: &str) -> Answer {
        let result = Self::dialog(title, question, MessageButtons::YesNoCancel);
        tracing::debug!("Question '{}' answered {:?}", question, result);
        match result {
            MessageDialogResult::Yes => Answer::Yes,
            MessageDialogResult::No => Answer::No,
            // Closing the box counts as cancel
            _ => Answer::Cancel,
        }
    }

    fn pick_folder(&self, title: &str) -> Option<Utf8PathBuf> {
        FileDialog::new().set_title(title).pick_folder().and_then(|path| {
            Utf8PathBuf::try_from(path)
                .map_err(|e| {
                    tracing::error!("Failed to convert path to UTF-8: {}", e);
                    e
                })
                .ok()
        })
    }
}
