//! Confirmation gate for side-effecting actions.
//!
//! The orchestrator asks an [`Approver`] before running a shell command or
//! writing a file. When auto-approval is enabled the gate is [`AutoApprove`].

use async_trait::async_trait;

use crate::error::Result;

/// Yes/no confirmation for a gated action.
#[async_trait]
pub trait Approver: Send + Sync {
    /// Ask whether the described action may run. `Ok(false)` is a decline,
    /// not an error.
    async fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Approves everything without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Approver for AutoApprove {
    async fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Interpret a typed confirmation answer. Only an explicit yes approves.
///
/// # Example
/// ```
/// use taskpilot::tools::approval::is_affirmative;
///
/// assert!(is_affirmative("Y"));
/// assert!(!is_affirmative(""));
/// ```
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
