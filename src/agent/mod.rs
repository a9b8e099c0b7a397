//! Agent module - the task orchestration core
//!
//! Everything between a user submission and the collaborators lives here:
//!
//! - [`tokens`]: deterministic token estimates
//! - [`compaction`]: truncation passes that keep the context within bounds
//! - [`ContextStore`] / [`ContextBuilder`]: bounded history and system prompt
//! - [`protocol`]: action parsing and conversational signals
//! - [`TaskLedger`]: tasks, criteria and their status transitions
//! - [`ActionExecutor`]: runs actions with retry and records their results
//! - [`Orchestrator`]: the bounded step loop
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  CLI / REPL │────>│ Orchestrator │────>│ LLMProvider │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!                        │    │    │
//!              ┌─────────┘    │    └──────────┐
//!              ▼              ▼               ▼
//!       ┌────────────┐ ┌────────────┐ ┌────────────────┐
//!       │ContextStore│ │ TaskLedger │ │ ActionExecutor │──> shell / fs / git
//!       └────────────┘ └────────────┘ └────────────────┘
//! ```

pub mod compaction;
mod context;
mod executor;
mod ledger;
mod r#loop;
pub mod protocol;
pub mod tokens;

pub use context::{ContextBuilder, ContextStore, RuntimeContext};
pub use executor::{linear_backoff, passes_verification, ActionExecutor, ActionOutcome, RetryPolicy};
pub use ledger::{verify_task_completion, Criterion, Task, TaskLedger, TaskStatus, Verification};
pub use protocol::{Action, Reply, Signal};
pub use r#loop::{is_goal, HaltReason, Orchestrator, SubmissionOutcome};
