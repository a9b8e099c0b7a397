//! Conversation context for the step loop
//!
//! This module provides the [`ContextStore`], the bounded message history sent
//! to the model, and the [`ContextBuilder`] that renders its system message
//! from the base prompt, a [`RuntimeContext`] section and the active task.

use crate::config::ContextConfig;
use crate::log_component;
use crate::session::Message;

use super::compaction::{compress, CompressionReport};
use super::ledger::Task;
use super::tokens::estimate_messages;

/// Base system prompt: the agent's role and the action wire format.
const BASE_PROMPT: &str = r#"You are TaskPilot, an autonomous software engineering agent working in the user's project directory.

Work towards the user's goal one step at a time. When you want to act, reply with exactly one JSON object inside a ```json fenced block. Supported actions:

- {"action": "run", "command": "<shell command>"}
- {"action": "read_file", "path": "<path>"}
- {"action": "patch", "path": "<path>", "content": "<full new file content>"}
- {"action": "commit", "message": "<commit message>"}
- {"action": "define_criteria", "taskId": "<task id>", "criteria": ["<criterion>", ...]}
- {"action": "verify_criterion", "taskId": "<task id>", "criterionIndex": <n>, "command": "<shell command>"}

Before doing the work for a new task, define its success criteria. Verify each criterion with a command whose success proves it holds; the task completes when every criterion is verified.

When you have nothing to execute, reply in plain prose. Say "task complete" when the goal is achieved, or say it failed if it cannot be achieved."#;

/// Runtime facts injected into the system prompt.
///
/// # Example
///
/// ```rust
/// use taskpilot::agent::RuntimeContext;
///
/// let ctx = RuntimeContext::new()
///     .with_workdir("/home/user/project")
///     .with_auto_approve(false)
///     .with_os_info();
///
/// let rendered = ctx.render().unwrap();
/// assert!(rendered.contains("Working directory: /home/user/project"));
/// assert!(rendered.contains("Auto-approve: off"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    /// Directory commands run in
    pub workdir: Option<String>,
    /// Current timestamp (RFC 3339)
    pub current_time: Option<String>,
    /// OS/platform info (e.g., "linux x86_64")
    pub os_info: Option<String>,
    /// Whether side-effecting actions skip confirmation
    pub auto_approve: Option<bool>,
}

impl RuntimeContext {
    /// Create a new empty runtime context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workdir(mut self, workdir: &str) -> Self {
        self.workdir = Some(workdir.to_string());
        self
    }

    /// Set the current time to now (UTC).
    pub fn with_current_time(mut self) -> Self {
        self.current_time = Some(chrono::Utc::now().to_rfc3339());
        self
    }

    /// Set the OS/platform info from the current environment.
    pub fn with_os_info(mut self) -> Self {
        self.os_info = Some(format!(
            "{} {}",
            std::env::consts::OS,
            std::env::consts::ARCH
        ));
        self
    }

    pub fn with_auto_approve(mut self, enabled: bool) -> Self {
        self.auto_approve = Some(enabled);
        self
    }

    /// Returns `true` if no fields have been populated.
    pub fn is_empty(&self) -> bool {
        self.workdir.is_none()
            && self.current_time.is_none()
            && self.os_info.is_none()
            && self.auto_approve.is_none()
    }

    /// Render the context as a markdown section, or `None` if empty.
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(ref workdir) = self.workdir {
            parts.push(format!("- Working directory: {}", workdir));
        }
        if let Some(ref os) = self.os_info {
            parts.push(format!("- Platform: {}", os));
        }
        if let Some(ref time) = self.current_time {
            parts.push(format!("- Current time: {}", time));
        }
        if let Some(auto) = self.auto_approve {
            parts.push(format!(
                "- Auto-approve: {}",
                if auto { "on" } else { "off" }
            ));
        }

        Some(format!("## Runtime Context\n\n{}", parts.join("\n")))
    }
}

/// Renders the system message.
///
/// The orchestrator rebuilds the system message whenever the active task or
/// its criteria change, so the model always sees the current task state.
///
/// # Example
///
/// ```rust
/// use taskpilot::agent::ContextBuilder;
///
/// let builder = ContextBuilder::new();
/// let system = builder.build_system_message(None);
/// assert!(system.content.contains("verify_criterion"));
/// assert!(!system.content.contains("## Active Task"));
/// ```
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
    runtime_context: Option<RuntimeContext>,
}

impl ContextBuilder {
    /// Create a builder with the default system prompt.
    pub fn new() -> Self {
        Self {
            system_prompt: BASE_PROMPT.to_string(),
            runtime_context: None,
        }
    }

    /// Replace the base system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Add runtime context to the system prompt. Empty contexts are ignored.
    pub fn with_runtime_context(mut self, ctx: RuntimeContext) -> Self {
        if !ctx.is_empty() {
            self.runtime_context = Some(ctx);
        }
        self
    }

    /// Build the system prompt text for the given active task.
    pub fn build_system_prompt(&self, task: Option<&Task>) -> String {
        let mut content = self.system_prompt.clone();
        if let Some(rendered) = self.runtime_context.as_ref().and_then(|c| c.render()) {
            content.push_str("\n\n");
            content.push_str(&rendered);
        }
        if let Some(task) = task {
            content.push_str("\n\n");
            content.push_str(&render_task_section(task));
        }
        content
    }

    /// Build the system message for the given active task.
    pub fn build_system_message(&self, task: Option<&Task>) -> Message {
        Message::system(&self.build_system_prompt(task))
    }

    /// Get the base system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn render_task_section(task: &Task) -> String {
    let mut out = format!(
        "## Active Task\n\n- Id: {}\n- Goal: {}",
        task.id, task.description
    );
    if task.criteria.is_empty() {
        out.push_str("\n- Success criteria: none defined yet. Define them first.");
    } else {
        out.push_str("\n- Success criteria:");
        for (i, criterion) in task.criteria.iter().enumerate() {
            let mark = if criterion.verified { "x" } else { " " };
            out.push_str(&format!("\n  {}. [{}] {}", i, mark, criterion.text));
        }
    }
    out
}

/// Bounded message history.
///
/// The first message is always the system message. Every mutation is followed
/// by compression, so after any call `len() <= max_messages` and the token
/// estimate fits `max_tokens` unless only the system message and one other
/// message remain.
#[derive(Debug, Clone)]
pub struct ContextStore {
    messages: Vec<Message>,
    limits: ContextConfig,
}

impl ContextStore {
    /// Create a store holding only the given system prompt.
    pub fn new(system_prompt: &str, limits: ContextConfig) -> Self {
        let mut store = Self {
            messages: vec![Message::system(system_prompt)],
            limits,
        };
        store.compress();
        store
    }

    /// Append a message, then compress.
    pub fn append(&mut self, message: Message) -> CompressionReport {
        self.messages.push(message);
        self.compress()
    }

    /// Replace the system message content, then compress.
    pub fn replace_system_message(&mut self, content: &str) -> CompressionReport {
        match self.messages.first_mut() {
            Some(first) if first.is_system() => first.content = content.to_string(),
            _ => self.messages.insert(0, Message::system(content)),
        }
        self.compress()
    }

    /// Drop everything but the system message.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Messages in order, system message first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Owned copy of the history, as sent to the model.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Estimated token cost of the whole history.
    pub fn total_tokens(&self) -> usize {
        estimate_messages(&self.messages)
    }

    pub fn limits(&self) -> ContextConfig {
        self.limits
    }

    fn compress(&mut self) -> CompressionReport {
        let report = compress(&mut self.messages, self.limits);
        if report.compressed() {
            log_component!(
                debug,
                "context",
                "Compressed context",
                dropped_by_count = report.dropped_by_count,
                dropped_by_tokens = report.dropped_by_tokens,
                tokens_after = report.tokens_after,
                messages = self.messages.len(),
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ledger::TaskLedger;
    use crate::session::Role;

    fn limits(max_messages: usize, max_tokens: usize) -> ContextConfig {
        ContextConfig {
            max_messages,
            max_tokens,
        }
    }

    // ── RuntimeContext ─────────────────────────────────────────────────

    #[test]
    fn test_runtime_context_empty() {
        let ctx = RuntimeContext::new();
        assert!(ctx.is_empty());
        assert!(ctx.render().is_none());
    }

    #[test]
    fn test_runtime_context_render_all_fields() {
        let ctx = RuntimeContext::new()
            .with_workdir("/srv/app")
            .with_current_time()
            .with_os_info()
            .with_auto_approve(true);
        let rendered = ctx.render().unwrap();
        assert!(rendered.starts_with("## Runtime Context"));
        assert!(rendered.contains("- Working directory: /srv/app"));
        assert!(rendered.contains("- Current time: "));
        assert!(rendered.contains(std::env::consts::OS));
        assert!(rendered.contains("- Auto-approve: on"));
    }

    // ── ContextBuilder ─────────────────────────────────────────────────

    #[test]
    fn test_builder_ignores_empty_runtime_context() {
        let builder = ContextBuilder::new().with_runtime_context(RuntimeContext::new());
        let prompt = builder.build_system_prompt(None);
        assert!(!prompt.contains("Runtime Context"));
        assert_eq!(prompt, builder.system_prompt());
    }

    #[test]
    fn test_builder_custom_prompt() {
        let builder = ContextBuilder::new().with_system_prompt("Be brief.");
        let msg = builder.build_system_message(None);
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "Be brief.");
    }

    #[test]
    fn test_builder_renders_task_without_criteria() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("add a CONTRIBUTING guide");
        let prompt = ContextBuilder::new().build_system_prompt(ledger.current_active());
        assert!(prompt.contains("## Active Task"));
        assert!(prompt.contains(&format!("- Id: {}", id)));
        assert!(prompt.contains("- Goal: add a CONTRIBUTING guide"));
        assert!(prompt.contains("none defined yet"));
    }

    #[test]
    fn test_builder_renders_criteria_state() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        ledger.define_criteria(&id, &["file exists".to_string(), "builds".to_string()]);
        ledger.verify_criterion(&id, 0, "test -f x").unwrap();
        let prompt = ContextBuilder::new().build_system_prompt(ledger.current_active());
        assert!(prompt.contains("0. [x] file exists"));
        assert!(prompt.contains("1. [ ] builds"));
    }

    // ── ContextStore ───────────────────────────────────────────────────

    #[test]
    fn test_store_starts_with_system_message() {
        let store = ContextStore::new("sys", limits(20, 8000));
        assert_eq!(store.len(), 1);
        assert!(store.system_message().unwrap().is_system());
    }

    #[test]
    fn test_store_append_and_snapshot() {
        let mut store = ContextStore::new("sys", limits(20, 8000));
        store.append(Message::user("hello"));
        store.append(Message::assistant("hi"));
        let snap = store.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[2].content, "hi");
        assert_eq!(store.last().unwrap().role, Role::Assistant);
    }

    #[test]
    fn test_store_drops_first_appended_at_capacity() {
        let mut store = ContextStore::new("sys", limits(20, 100_000));
        for i in 0..20 {
            store.append(Message::user(&format!("message {}", i)));
        }
        assert_eq!(store.len(), 20);
        assert_eq!(store.messages()[0].content, "sys");
        assert_eq!(store.messages()[1].content, "message 1");
        assert_eq!(store.last().unwrap().content, "message 19");
    }

    #[test]
    fn test_store_token_ceiling() {
        let mut store = ContextStore::new("sys", limits(20, 120));
        for _ in 0..10 {
            store.append(Message::user(&"w".repeat(100)));
        }
        assert!(store.total_tokens() <= 120);
        assert!(store.messages()[0].is_system());
    }

    #[test]
    fn test_store_replace_system_message() {
        let mut store = ContextStore::new("old", limits(20, 8000));
        store.append(Message::user("hi"));
        store.replace_system_message("new");
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[0].content, "new");
    }

    #[test]
    fn test_store_replace_system_message_compresses() {
        let mut store = ContextStore::new("sys", limits(20, 60));
        store.append(Message::user(&"a".repeat(100)));
        store.append(Message::user(&"b".repeat(100)));
        store.replace_system_message(&"s".repeat(100));
        assert_eq!(store.len(), 2);
        assert!(store.messages()[1].content.starts_with('b'));
    }

    #[test]
    fn test_store_reset_is_idempotent() {
        let mut store = ContextStore::new("sys", limits(20, 8000));
        store.append(Message::user("a"));
        store.reset();
        assert_eq!(store.len(), 1);
        store.reset();
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].content, "sys");
    }
}
