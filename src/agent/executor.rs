//! Action execution against the external collaborators.
//!
//! Every action ends with one assistant-role message in the context
//! describing what happened. Collaborator errors never escape: they become an
//! unsuccessful [`ActionOutcome`] whose message asks the model to try another
//! approach.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ShellConfig;
use crate::log_component;
use crate::session::Message;
use crate::tools::{CommandOutput, FileSystem, ShellExecutor, VersionControl};
use crate::utils::string::truncate_output;

use super::context::ContextStore;
use super::ledger::{TaskLedger, TaskStatus, Verification};
use super::protocol::Action;

/// Retry settings for `run` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay unit for [`linear_backoff`]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl From<&ShellConfig> for RetryPolicy {
    fn from(cfg: &ShellConfig) -> Self {
        Self {
            max_attempts: cfg.max_retries.max(1),
            base_delay: Duration::from_millis(cfg.retry_base_delay_ms),
        }
    }
}

/// Delay after failed attempt `attempt` (1-based): `attempt * base`.
///
/// ```
/// use std::time::Duration;
/// use taskpilot::agent::linear_backoff;
///
/// assert_eq!(linear_backoff(2, Duration::from_millis(500)), Duration::from_secs(1));
/// ```
pub fn linear_backoff(attempt: u32, base: Duration) -> Duration {
    base * attempt
}

/// Whether a verification command's result proves its criterion.
///
/// The command must exit zero and its output must not mention an error or a
/// missing item.
pub fn passes_verification(output: &CommandOutput) -> bool {
    if !output.success() {
        return false;
    }
    let text = output.format().to_lowercase();
    !text.contains("error") && !text.contains("not found")
}

/// Result of executing one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    /// Output as recorded in the context (possibly truncated)
    pub output: String,
    /// Collaborator calls made; more than one only for retried commands
    pub attempts: u32,
    /// Total time spent in backoff
    pub waited: Duration,
    /// The action completed the active task
    pub task_completed: bool,
}

impl ActionOutcome {
    fn new(success: bool, output: String) -> Self {
        Self {
            success,
            output,
            attempts: 1,
            waited: Duration::ZERO,
            task_completed: false,
        }
    }
}

/// Runs actions through the shell, filesystem and version control seams.
pub struct ActionExecutor {
    shell: Arc<dyn ShellExecutor>,
    fs: Arc<dyn FileSystem>,
    vcs: Arc<dyn VersionControl>,
    retry: RetryPolicy,
    max_output_bytes: usize,
}

impl ActionExecutor {
    pub fn new(
        shell: Arc<dyn ShellExecutor>,
        fs: Arc<dyn FileSystem>,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        Self {
            shell,
            fs,
            vcs,
            retry: RetryPolicy::default(),
            max_output_bytes: ShellConfig::default().max_output_bytes,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Execute `action`, record its result in `context`, and update `ledger`
    /// for criteria actions.
    pub async fn execute(
        &self,
        action: &Action,
        context: &mut ContextStore,
        ledger: &mut TaskLedger,
    ) -> ActionOutcome {
        let (outcome, message) = match action {
            Action::Run { command } => {
                let outcome = self.run_with_retry(command).await;
                let message = if outcome.success {
                    format!("Command `{}` succeeded:\n{}", command, outcome.output)
                } else {
                    format!(
                        "Command `{}` failed after {} attempt(s):\n{}\nPropose an alternative approach.",
                        command, outcome.attempts, outcome.output
                    )
                };
                (outcome, message)
            }
            Action::ReadFile { path } => match self.fs.read(path).await {
                Ok(content) => {
                    let content = truncate_output(&content, self.max_output_bytes);
                    let message = format!("Contents of {}:\n{}", path, content);
                    (ActionOutcome::new(true, content), message)
                }
                Err(e) => self.failure(format!("Could not read {}: {}", path, e)),
            },
            Action::Patch { path, content } => match self.fs.write(path, content).await {
                Ok(()) => {
                    let output = format!("Wrote {} bytes to {}", content.len(), path);
                    (ActionOutcome::new(true, output.clone()), output)
                }
                Err(e) => self.failure(format!("Could not write {}: {}", path, e)),
            },
            Action::Commit { message } => match self.vcs.commit_all(message).await {
                Ok(out) => {
                    let out = truncate_output(out.trim(), self.max_output_bytes);
                    let text = format!("Committed changes: {}\n{}", message, out);
                    (ActionOutcome::new(true, out), text)
                }
                Err(e) => self.failure(format!("Commit failed: {}", e)),
            },
            Action::DefineCriteria { task_id, criteria } => {
                let output = if ledger.define_criteria(task_id, criteria) {
                    format!(
                        "Defined {} success criteria for task {}.",
                        criteria.len(),
                        task_id
                    )
                } else {
                    format!(
                        "Task {} is not the active task; criteria were not recorded.",
                        task_id
                    )
                };
                (ActionOutcome::new(true, output.clone()), output)
            }
            Action::VerifyCriterion {
                task_id,
                criterion_index,
                command,
            } => {
                self.verify_criterion(task_id, *criterion_index, command, ledger)
                    .await
            }
        };

        log_component!(
            info,
            "executor",
            "Action executed",
            action = action.tag(),
            success = outcome.success,
            attempts = outcome.attempts,
        );
        context.append(Message::assistant(&message));
        outcome
    }

    fn failure(&self, output: String) -> (ActionOutcome, String) {
        let message = format!("{}\nPropose an alternative approach.", output);
        (ActionOutcome::new(false, output), message)
    }

    /// Run `command`, retrying failures with linear backoff.
    ///
    /// A spawn error counts as a failed attempt.
    async fn run_with_retry(&self, command: &str) -> ActionOutcome {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut waited = Duration::ZERO;
        let mut last_output = String::new();

        for attempt in 1..=max_attempts {
            match self.shell.run(command).await {
                Ok(out) if out.success() => {
                    return ActionOutcome {
                        success: true,
                        output: truncate_output(&out.format(), self.max_output_bytes),
                        attempts: attempt,
                        waited,
                        task_completed: false,
                    };
                }
                Ok(out) => last_output = out.format(),
                Err(e) => last_output = format!("Failed to execute command: {}", e),
            }

            if attempt < max_attempts {
                let delay = linear_backoff(attempt, self.retry.base_delay);
                warn!(
                    command = %command,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Command failed, retrying"
                );
                tokio::time::sleep(delay).await;
                waited += delay;
            }
        }

        ActionOutcome {
            success: false,
            output: truncate_output(&last_output, self.max_output_bytes),
            attempts: max_attempts,
            waited,
            task_completed: false,
        }
    }

    async fn verify_criterion(
        &self,
        task_id: &str,
        index: usize,
        command: &str,
        ledger: &mut TaskLedger,
    ) -> (ActionOutcome, String) {
        let criterion = match ledger.get(task_id) {
            Some(task) if task.status == TaskStatus::Active => match task.criteria.get(index) {
                Some(c) => c.text.clone(),
                None => {
                    return self.failure(format!(
                        "Task {} has no criterion {} ({} defined).",
                        task_id,
                        index,
                        task.criteria.len()
                    ))
                }
            },
            Some(task) => {
                return self.failure(format!("Task {} is {}, not active.", task_id, task.status))
            }
            None => return self.failure(format!("Unknown task {}.", task_id)),
        };

        let output = match self.shell.run(command).await {
            Ok(out) => out,
            Err(e) => {
                return self.failure(format!(
                    "Verification of \"{}\" could not run: {}",
                    criterion, e
                ))
            }
        };
        let shown = truncate_output(&output.format(), self.max_output_bytes);

        if !passes_verification(&output) {
            return self.failure(format!(
                "Criterion \"{}\" is not satisfied. `{}` output:\n{}",
                criterion, command, shown
            ));
        }

        match ledger.verify_criterion(task_id, index, command) {
            Ok(Verification::TaskCompleted) => {
                info!(task_id = %task_id, "All criteria verified; task completed");
                let mut outcome = ActionOutcome::new(true, shown);
                outcome.task_completed = true;
                let message = format!(
                    "Criterion \"{}\" verified. All criteria verified; task {} is complete.",
                    criterion, task_id
                );
                (outcome, message)
            }
            Ok(Verification::Recorded) => {
                let message = format!("Criterion \"{}\" verified.", criterion);
                (ActionOutcome::new(true, shown), message)
            }
            Err(e) => self.failure(format!("Could not record verification: {}", e)),
        }
    }
}
