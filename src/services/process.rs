use anyhow::{Context, Result};
use camino::Utf8Path;
use std::time::Instant;
use tokio::process::Command;
use tokio::runtime::Runtime;

/// Starts an executable and waits for it to exit.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner {
    /// Run `executable` with no arguments from `working_dir`, blocking until it exits.
    ///
    /// # Returns
    /// The exit code, or `None` if the process was terminated by a signal
    fn run(&self, executable: &Utf8Path, working_dir: &Utf8Path) -> Result<Option<i32>>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// Owns a current-thread runtime; the launcher is sequential, so `run` simply
/// blocks on the child.
pub struct TokioProcessRunner {
    runtime: Runtime,
}

impl TokioProcessRunner {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name("svportable-process")
            .build()
            .context("Failed to create tokio runtime")?;

        tracing::debug!("Process runtime initialized");
        Ok(Self { runtime })
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run(&self, executable: &Utf8Path, working_dir: &Utf8Path) -> Result<Option<i32>> {
        tracing::info!("Starting {}", executable);
        let start = Instant::now();

        let status = self
            .runtime
            .block_on(async {
                Command::new(executable)
                    .current_dir(working_dir)
                    .status()
                    .await
            })
            .with_context(|| format!("Failed to run {}", executable))?;

        let exit_code = status.code();
        tracing::info!(
            "{} exited after {:.1}s with code {:?}",
            executable,
            start.elapsed().as_secs_f32(),
            exit_code
        );
        Ok(exit_code)
    }
}
