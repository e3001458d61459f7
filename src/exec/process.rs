use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::{CommandRunner, ExecResult, Invocation};
use crate::error::ExecError;

/// Runs invocations as real child processes via `tokio::process`.
///
/// Output is captured in full. With a timeout configured, an overrunning child
/// is killed (`kill_on_drop`) and reported with `timed_out = true`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout_secs: Option<u64>) -> Self {
        Self {
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExecResult, ExecError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            command = %invocation.command_line(),
            cwd = %invocation.cwd.display(),
            "Spawning process"
        );

        let child = cmd.spawn().map_err(|e| ExecError::SpawnFailed {
            command: invocation.command_line(),
            message: e.to_string(),
        })?;

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output,
                Err(_) => {
                    // Dropping the future drops the child, which kills it.
                    tracing::warn!(
                        command = %invocation.command_line(),
                        timeout_secs = limit.as_secs(),
                        "Process timed out"
                    );
                    return Ok(ExecResult {
                        stdout: String::new(),
                        stderr: String::new(),
                        exit_code: None,
                        timed_out: true,
                    });
                }
            },
            None => wait.await,
        }
        .map_err(|e| ExecError::SpawnFailed {
            command: invocation.command_line(),
            message: e.to_string(),
        })?;

        Ok(ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            timed_out: false,
        })
    }

    fn timeout_secs(&self) -> Option<u64> {
        self.timeout.map(|t| t.as_secs())
    }
}
