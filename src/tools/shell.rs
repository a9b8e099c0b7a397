//! Shell executor for TaskPilot
//!
//! Runs a literal command string through `sh -c` and reports exit status and
//! combined output. Commands are never validated or filtered here; the only
//! safety mechanism is the confirmation gate in front of the executor.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{PilotError, Result};

/// Output of a finished shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Create a new command output.
    pub fn new(stdout: String, stderr: String, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Combined stdout and stderr, as shown to the model.
    ///
    /// # Example
    /// ```
    /// use taskpilot::tools::shell::CommandOutput;
    ///
    /// let out = CommandOutput::new("ok\n".into(), "warn\n".into(), Some(0));
    /// assert_eq!(out.format(), "ok\nwarn");
    /// ```
    pub fn format(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        let mut combined = match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        };
        if !self.success() {
            let status = match self.exit_code {
                Some(code) => format!("[exit code {}]", code),
                None => "[terminated by signal]".to_string(),
            };
            if combined.is_empty() {
                combined = status;
            } else {
                combined = format!("{}\n{}", combined, status);
            }
        }
        combined
    }
}

/// Runs shell commands on behalf of the executor.
#[async_trait]
pub trait ShellExecutor: Send + Sync {
    /// Run `command` to completion. An `Err` means the process could not be
    /// started at all; a non-zero exit is reported through `CommandOutput`.
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}

/// Executes commands directly on the host with `sh -c`.
///
/// # Example
/// ```
/// use taskpilot::tools::{NativeShell, ShellExecutor};
///
/// # tokio_test::block_on(async {
/// let output = NativeShell::new().run("echo hello").await.unwrap();
/// assert!(output.success());
/// assert_eq!(output.format(), "hello");
/// # })
/// ```
#[derive(Debug, Clone, Default)]
pub struct NativeShell {
    workdir: Option<PathBuf>,
}

impl NativeShell {
    /// Create a shell that runs in the process working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands in `workdir` instead of the process working directory.
    pub fn with_workdir(mut self, workdir: PathBuf) -> Self {
        self.workdir = Some(workdir);
        self
    }
}

#[async_trait]
impl ShellExecutor for NativeShell {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(ref workdir) = self.workdir {
            cmd.current_dir(workdir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd
            .output()
            .await
            .map_err(|e| PilotError::Tool(format!("Failed to spawn shell: {}", e)))?;

        Ok(CommandOutput::new(
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code(),
        ))
    }
}
