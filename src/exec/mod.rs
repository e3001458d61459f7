//! External process execution.
//!
//! Everything that shells out goes through a [`CommandRunner`]. Production code
//! uses [`ProcessRunner`]; tests substitute a scripted runner so the clone
//! logic can be exercised without a network or a `git` binary.

pub mod process;

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::ExecError;

pub use process::ProcessRunner;

/// Result of an external command execution.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ExecResult {
    /// Did the process run to completion with exit code 0?
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// A single program invocation: argv plus working directory.
///
/// Arguments are passed to the program verbatim; no shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Human-readable command line, used in logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs an [`Invocation`] to completion.
///
/// Implementations return `Err` only when the process could not be started.
/// A non-zero exit or a timeout is reported inside the [`ExecResult`]; use
/// [`run_checked`] to turn those into errors.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<ExecResult, ExecError>> + Send;

    /// Timeout applied by this runner, if any. Only used for error reporting.
    fn timeout_secs(&self) -> Option<u64> {
        None
    }
}

/// Run an invocation and treat anything other than a clean exit as an error.
pub async fn run_checked<R: CommandRunner>(
    runner: &R,
    invocation: &Invocation,
) -> Result<ExecResult, ExecError> {
    let result = runner.run(invocation).await?;

    if result.timed_out {
        return Err(ExecError::TimedOut {
            command: invocation.command_line(),
            timeout_secs: runner.timeout_secs().unwrap_or(0),
        });
    }

    if !result.success() {
        return Err(ExecError::ProcessFailed {
            command: invocation.command_line(),
            exit_code: result
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stderr: result.stderr.trim().to_string(),
        });
    }

    Ok(result)
}
