//! TaskPilot - autonomous task orchestration agent for the terminal
//!
//! A user goal becomes a task with success criteria; a bounded step loop asks
//! the model for the next action, executes it through pluggable collaborators
//! (shell, filesystem, git, confirmation), and stops once every criterion is
//! verified or another halt condition is reached.

pub mod agent;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{HaltReason, Orchestrator, SubmissionOutcome};
pub use config::Config;
pub use error::{PilotError, Result};
pub use providers::{ChatOptions, LLMProvider, LLMResponse, OpenAIProvider, Usage};
pub use session::{Message, Role};
