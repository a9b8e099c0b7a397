//! Orchestrator: the bounded step loop behind every user submission
//!
//! One submission runs up to `max_steps` steps. Each step requests a
//! completion over the whole context, records the reply, and then either
//! executes the proposed action or interprets the prose. The loop halts on
//! task completion or failure, a conversational answer, a declined action,
//! an unrecognized action, or an exhausted step budget.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{AgentConfig, ContextConfig};
use crate::error::Result;
use crate::providers::{ChatOptions, LLMProvider};
use crate::session::Message;
use crate::tools::Approver;
use crate::utils::string::preview;

use super::context::{ContextBuilder, ContextStore};
use super::executor::ActionExecutor;
use super::ledger::{verify_task_completion, TaskLedger};
use super::protocol::{classify_signal, parse, Action, Reply, Signal};

/// Verbs that mark short inputs as goals.
static GOAL_VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(create|delete|modify|check)\b").unwrap());

/// Sent when the model answers in prose while a task is still open.
const CONTINUE_NUDGE: &str = "Continue working on the active task. Reply with one JSON action, \
or say \"task complete\" once every success criterion is verified.";

/// Whether `input` starts a new task.
///
/// Slash commands never do. Anything longer than `min_len` characters does,
/// as does shorter input containing one of the goal verbs as a whole word.
///
/// ```
/// use taskpilot::agent::is_goal;
///
/// assert!(is_goal("create a README", 20));
/// assert!(!is_goal("thanks!", 20));
/// assert!(!is_goal("/tasks", 20));
/// ```
pub fn is_goal(input: &str, min_len: usize) -> bool {
    let input = input.trim();
    if input.starts_with('/') {
        return false;
    }
    input.chars().count() > min_len || GOAL_VERB.is_match(input)
}

/// Why a submission stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// The active task was completed
    TaskCompleted,
    /// The model reported failure; the task was marked failed
    TaskFailed,
    /// The model claimed completion but criteria remain unverified
    Signalled,
    /// Prose reply with no task in progress
    Answered,
    /// The user declined a gated action
    Declined,
    /// The model proposed an action nobody handles
    UnrecognizedAction(String),
    /// `max_steps` steps ran without another halt condition
    StepBudgetExhausted,
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::TaskCompleted => write!(f, "task completed"),
            HaltReason::TaskFailed => write!(f, "task failed"),
            HaltReason::Signalled => {
                write!(f, "completion claimed but criteria are not all verified")
            }
            HaltReason::Answered => write!(f, "answered"),
            HaltReason::Declined => write!(f, "action declined; task returned to pending"),
            HaltReason::UnrecognizedAction(tag) => write!(f, "unrecognized action '{}'", tag),
            HaltReason::StepBudgetExhausted => {
                write!(f, "step budget exhausted; task returned to pending")
            }
        }
    }
}

/// Summary of one [`Orchestrator::submit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub reason: HaltReason,
    /// Completions requested
    pub steps: u32,
    /// Task the submission worked on, if any
    pub task_id: Option<String>,
    /// Last raw model reply
    pub last_reply: Option<String>,
    /// Total tokens reported by the provider across all steps
    pub tokens_used: u32,
}

/// Owns the context and the task ledger and drives the step loop.
///
/// # Example
///
/// ```rust,ignore
/// let mut orchestrator = Orchestrator::new(config.agent.clone(), config.context, provider, executor, approver);
/// let outcome = orchestrator.submit("create a README for this project").await?;
/// println!("{}", outcome.reason);
/// ```
pub struct Orchestrator {
    settings: AgentConfig,
    provider: Arc<dyn LLMProvider>,
    executor: ActionExecutor,
    approver: Arc<dyn Approver>,
    builder: ContextBuilder,
    context: ContextStore,
    ledger: TaskLedger,
}

impl Orchestrator {
    pub fn new(
        settings: AgentConfig,
        limits: ContextConfig,
        provider: Arc<dyn LLMProvider>,
        executor: ActionExecutor,
        approver: Arc<dyn Approver>,
    ) -> Self {
        let builder = ContextBuilder::new();
        let context = ContextStore::new(&builder.build_system_prompt(None), limits);
        Self {
            settings,
            provider,
            executor,
            approver,
            builder,
            context,
            ledger: TaskLedger::new(),
        }
    }

    /// Use a custom system prompt builder, e.g. one carrying runtime context.
    pub fn with_context_builder(mut self, builder: ContextBuilder) -> Self {
        self.builder = builder;
        self.refresh_system_prompt();
        self
    }

    /// Process one user input to a halt.
    ///
    /// Only provider failures and confirmation I/O failures are returned as
    /// errors; action failures are fed back to the model.
    pub async fn submit(&mut self, input: &str) -> Result<SubmissionOutcome> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("submission", request_id = %request_id);
        self.run_submission(input).instrument(span).await
    }

    async fn run_submission(&mut self, input: &str) -> Result<SubmissionOutcome> {
        let task_id = if is_goal(input, self.settings.goal_min_length) {
            Some(self.ledger.open_task(input))
        } else {
            self.ledger.resume_current()
        };
        let model = match self.settings.model.trim() {
            "" => self.provider.default_model().to_string(),
            configured => configured.to_string(),
        };
        info!(
            input = %preview(input, 80),
            task_id = task_id.as_deref().unwrap_or("-"),
            provider = self.provider.name(),
            model = %model,
            "Processing submission"
        );

        self.refresh_system_prompt();
        self.context.append(Message::user(input));

        let mut last_reply = None;
        let mut tokens_used = 0u32;
        let max_steps = self.settings.max_steps;

        for step in 1..=max_steps {
            let options = ChatOptions::new()
                .with_max_tokens(self.settings.max_tokens)
                .with_temperature(self.settings.temperature);
            let response = self
                .provider
                .chat(self.context.snapshot(), Some(model.as_str()), options)
                .await?;
            if let Some(usage) = response.usage {
                tokens_used = tokens_used.saturating_add(usage.total_tokens);
                debug!(
                    step,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Token usage"
                );
            }
            let reply = response.content;
            debug!(step, reply = %preview(&reply, 120), "Model replied");
            self.context.append(Message::assistant(&reply));
            last_reply = Some(reply.clone());

            let halt = match parse(&reply) {
                Reply::Unrecognized(tag) => {
                    warn!(action = %tag, "Unrecognized action; stopping");
                    Some(HaltReason::UnrecognizedAction(tag))
                }
                Reply::Action(action) => self.handle_action(&action).await?,
                Reply::Prose => self.handle_prose(&reply)?,
            };

            if let Some(reason) = halt {
                info!(step, reason = %reason, "Submission halted");
                return Ok(SubmissionOutcome {
                    reason,
                    steps: step,
                    task_id,
                    last_reply,
                    tokens_used,
                });
            }
        }

        if let Some(id) = self.ledger.current_active().map(|t| t.id.clone()) {
            self.ledger.demote(&id)?;
            self.refresh_system_prompt();
        }
        warn!(max_steps, "Step budget exhausted before the task finished");
        Ok(SubmissionOutcome {
            reason: HaltReason::StepBudgetExhausted,
            steps: max_steps,
            task_id,
            last_reply,
            tokens_used,
        })
    }

    async fn handle_action(&mut self, action: &Action) -> Result<Option<HaltReason>> {
        if action.requires_confirmation() && !self.settings.auto_approve {
            let approved = self.approver.confirm(&action.describe()).await?;
            if !approved {
                info!(action = action.tag(), "Action declined by user");
                self.context.append(Message::assistant(&format!(
                    "The user declined: {}",
                    action.describe()
                )));
                if let Some(id) = self.ledger.current_active().map(|t| t.id.clone()) {
                    self.ledger.demote(&id)?;
                    self.refresh_system_prompt();
                }
                return Ok(Some(HaltReason::Declined));
            }
        }

        let outcome = self
            .executor
            .execute(action, &mut self.context, &mut self.ledger)
            .await;

        if matches!(
            action,
            Action::DefineCriteria { .. } | Action::VerifyCriterion { .. }
        ) {
            self.refresh_system_prompt();
        }
        if outcome.task_completed {
            return Ok(Some(HaltReason::TaskCompleted));
        }
        Ok(None)
    }

    fn handle_prose(&mut self, reply: &str) -> Result<Option<HaltReason>> {
        let Some(task) = self.ledger.current_active() else {
            return Ok(Some(HaltReason::Answered));
        };
        let id = task.id.clone();
        let criteria_met = task.criteria.is_empty() || verify_task_completion(task);

        let reason = match classify_signal(reply) {
            Some(Signal::Completed) if criteria_met => {
                self.ledger.complete(&id, Some(preview(reply, 200)))?;
                HaltReason::TaskCompleted
            }
            Some(Signal::Completed) => {
                info!(task_id = %id, "Completion claimed with unverified criteria");
                HaltReason::Signalled
            }
            Some(Signal::Failed) => {
                self.ledger.fail(&id, Some(preview(reply, 200)))?;
                HaltReason::TaskFailed
            }
            None => {
                self.context.append(Message::user(CONTINUE_NUDGE));
                return Ok(None);
            }
        };
        self.refresh_system_prompt();
        Ok(Some(reason))
    }

    /// Rebuild the system message from the current active task.
    fn refresh_system_prompt(&mut self) {
        let prompt = self.builder.build_system_prompt(self.ledger.current_active());
        let unchanged = self
            .context
            .system_message()
            .is_some_and(|m| m.content == prompt);
        if !unchanged {
            self.context.replace_system_message(&prompt);
        }
    }

    /// Clear the context down to the system message and drop every task.
    pub fn reset(&mut self) {
        self.context.reset();
        self.ledger.reset();
        self.refresh_system_prompt();
        info!("Conversation and task ledger reset");
    }

    /// Report for the `/tasks` command.
    pub fn task_summary(&self) -> String {
        self.ledger.summary()
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub fn ledger(&self) -> &TaskLedger {
        &self.ledger
    }

    pub fn auto_approve(&self) -> bool {
        self.settings.auto_approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_goal_by_length() {
        assert!(is_goal("please tidy up the build scripts", 20));
        assert!(!is_goal("short message", 20));
        // Exactly min_len is not enough
        assert!(!is_goal(&"a".repeat(20), 20));
        assert!(is_goal(&"a".repeat(21), 20));
    }

    #[test]
    fn test_is_goal_by_verb() {
        assert!(is_goal("Create x", 20));
        assert!(is_goal("check tests", 20));
        assert!(is_goal("delete it", 20));
        assert!(is_goal("modify a", 20));
        // Whole words only
        assert!(!is_goal("checked", 20));
        assert!(!is_goal("recreate", 20));
    }

    #[test]
    fn test_slash_commands_are_never_goals() {
        assert!(!is_goal("/create something really long for sure", 20));
    }

    #[test]
    fn test_halt_reason_display() {
        assert_eq!(HaltReason::TaskCompleted.to_string(), "task completed");
        assert_eq!(
            HaltReason::UnrecognizedAction("deploy".into()).to_string(),
            "unrecognized action 'deploy'"
        );
    }
}
