//! Version-control collaborator for TaskPilot.
//!
//! Shells out to the system `git` binary. No libgit2 dependency. The only
//! operation the loop needs is "stage everything, then commit".

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{PilotError, Result};

/// Stage-all + commit.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Stage all working-tree changes and commit them with `message`.
    /// Returns the commit summary printed by the VCS.
    async fn commit_all(&self, message: &str) -> Result<String>;
}

/// `git` CLI implementation.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    /// Create a client operating on the repository containing `repo_dir`.
    pub fn new(repo_dir: PathBuf) -> Self {
        Self { repo_dir }
    }

    /// Run `git <args>` in the repository directory and return stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PilotError::Tool(format!("Failed to run git: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(stdout)
        } else {
            // `git commit` with nothing staged reports on stdout
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            Err(PilotError::Tool(format!("git error: {}", detail)))
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn commit_all(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PilotError::Tool(
                "Commit message must not be empty".to_string(),
            ));
        }
        self.run(&["add", "-A"]).await?;
        self.run(&["commit", "-m", message]).await
    }
}
