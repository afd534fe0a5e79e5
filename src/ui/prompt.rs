use camino::Utf8PathBuf;

/// Answer to a Yes/No/Cancel question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Cancel,
}

/// Synchronous user interaction used by the launcher.
///
/// Every call blocks until the user answers. The launcher holds no other UI state,
/// so tests drive it by scripting these answers.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt {
    /// Show an informational message.
    fn notify(&self, title: &str, message: &str);

    /// Ask a Yes/No question. Returns `true` for Yes.
    fn confirm(&self, title: &str, question: &str) -> bool;

    /// Ask a Yes/No/Cancel question.
    fn confirm_or_cancel(&self, title: &str, question: &str) -> Answer;

    /// Let the user choose a folder. `None` if the dialog was dismissed.
    fn pick_folder(&self, title: &str) -> Option<Utf8PathBuf>;
}

/// Tell the user the launcher stopped, then hand the error back as the exit status.
pub fn report_fatal<P: Prompt + ?Sized>(prompt: &P, title: &str, error: anyhow::Error) -> anyhow::Error {
    tracing::error!("Launcher error: {:#}", error);
    prompt.notify(title, &format!("The launcher stopped: {:#}", error));
    error
}
