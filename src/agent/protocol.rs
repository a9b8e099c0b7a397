//! Model reply interpretation.
//!
//! A reply is either a structured action (one JSON object, optionally inside a
//! fenced code block) or conversational prose. Prose is further checked for a
//! completion or failure signal with a keyword heuristic, kept in
//! [`classify_signal`] so it can be replaced without touching the loop.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Fenced code block, with or without a `json` language tag.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[ \t]*(?:json|JSON)?[ \t]*\r?\n?(.*?)```").unwrap());

/// Opening fence through the last closing fence, for payloads that carry
/// fences of their own (e.g. a patched Markdown file).
static OUTER_FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[ \t]*(?:json|JSON)?[ \t]*\r?\n?(.*)```").unwrap());

/// Completion keywords, checked before failure keywords.
const COMPLETION_KEYWORDS: &[&str] = &["task complete", "finished", "done", "completed"];
const FAILURE_KEYWORDS: &[&str] = &["failed", "error", "cannot"];

/// A structured command proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Run a shell command
    Run { command: String },
    /// Read a file into context
    ReadFile { path: String },
    /// Overwrite a file with new content
    Patch { path: String, content: String },
    /// Stage everything and commit
    Commit { message: String },
    /// Attach success criteria to a task
    DefineCriteria {
        #[serde(rename = "taskId", alias = "task_id")]
        task_id: String,
        criteria: Vec<String>,
    },
    /// Check one criterion with a command
    VerifyCriterion {
        #[serde(rename = "taskId", alias = "task_id")]
        task_id: String,
        #[serde(rename = "criterionIndex", alias = "criterion_index")]
        criterion_index: usize,
        command: String,
    },
}

/// Action tags understood by [`Action`].
const KNOWN_TAGS: &[&str] = &[
    "run",
    "read_file",
    "patch",
    "commit",
    "define_criteria",
    "verify_criterion",
];

impl Action {
    /// The wire tag of this action.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Run { .. } => "run",
            Action::ReadFile { .. } => "read_file",
            Action::Patch { .. } => "patch",
            Action::Commit { .. } => "commit",
            Action::DefineCriteria { .. } => "define_criteria",
            Action::VerifyCriterion { .. } => "verify_criterion",
        }
    }

    /// Side-effecting actions that need user confirmation unless
    /// auto-approve is on.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Action::Run { .. } | Action::Patch { .. })
    }

    /// Prompt shown when asking for confirmation.
    pub fn describe(&self) -> String {
        match self {
            Action::Run { command } => format!("Run command: {}", command),
            Action::ReadFile { path } => format!("Read file: {}", path),
            Action::Patch { path, content } => {
                format!("Write {} bytes to {}", content.len(), path)
            }
            Action::Commit { message } => format!("Commit changes: {}", message),
            Action::DefineCriteria { criteria, .. } => {
                format!("Define {} success criteria", criteria.len())
            }
            Action::VerifyCriterion {
                criterion_index,
                command,
                ..
            } => format!("Verify criterion {} with: {}", criterion_index, command),
        }
    }
}

/// How a model reply was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Action(Action),
    /// A well-formed action object with a tag nobody handles
    Unrecognized(String),
    /// Conversational text
    Prose,
}

/// Conversational completion or failure signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Completed,
    Failed,
}

/// Interpret a raw model reply.
///
/// Malformed JSON, non-object JSON, objects without a string `action` field,
/// and known actions with missing fields are all treated as prose.
///
/// # Example
/// ```
/// use taskpilot::agent::protocol::{parse, Action, Reply};
///
/// let reply = "Let me look.\n```json\n{\"action\": \"read_file\", \"path\": \"Cargo.toml\"}\n```";
/// assert_eq!(
///     parse(reply),
///     Reply::Action(Action::ReadFile { path: "Cargo.toml".into() })
/// );
/// assert_eq!(parse("All good here."), Reply::Prose);
/// ```
pub fn parse(text: &str) -> Reply {
    candidates(text)
        .into_iter()
        .find_map(decode)
        .unwrap_or(Reply::Prose)
}

/// Spans that may hold the action object, most specific first.
fn candidates(text: &str) -> Vec<&str> {
    let mut spans = Vec::with_capacity(4);
    spans.extend(extract_fenced_block(text));
    spans.extend(
        OUTER_FENCED_BLOCK
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
    );
    spans.push(text);
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            spans.push(&text[start..=end]);
        }
    }
    spans
}

/// Decode one candidate span. `None` means the span holds no action object
/// and the next candidate should be tried.
fn decode(candidate: &str) -> Option<Reply> {
    let value: serde_json::Value = serde_json::from_str(candidate.trim()).ok()?;
    let tag = value.get("action")?.as_str()?.to_string();
    if !KNOWN_TAGS.contains(&tag.as_str()) {
        return Some(Reply::Unrecognized(tag));
    }
    match serde_json::from_value::<Action>(value) {
        Ok(action) => Some(Reply::Action(action)),
        Err(e) => {
            tracing::debug!(action = %tag, error = %e, "Action is missing fields; treating as prose");
            Some(Reply::Prose)
        }
    }
}

/// Contents of the first fenced code block in `text`, if any.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Classify prose as a completion or failure signal.
///
/// Case-insensitive substring match; completion wins when both match.
pub fn classify_signal(text: &str) -> Option<Signal> {
    let lower = text.to_lowercase();
    if COMPLETION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(Signal::Completed)
    } else if FAILURE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(Signal::Failed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_json() {
        let reply = r#"{"action": "run", "command": "ls -la"}"#;
        assert_eq!(
            parse(reply),
            Reply::Action(Action::Run {
                command: "ls -la".into()
            })
        );
    }

    #[test]
    fn test_parse_fenced_without_language() {
        let reply = "```\n{\"action\": \"commit\", \"message\": \"fix typo\"}\n```";
        assert_eq!(
            parse(reply),
            Reply::Action(Action::Commit {
                message: "fix typo".into()
            })
        );
    }

    #[test]
    fn test_parse_patch() {
        let reply = "```json\n{\"action\":\"patch\",\"path\":\"a.txt\",\"content\":\"hi\\n\"}\n```";
        assert_eq!(
            parse(reply),
            Reply::Action(Action::Patch {
                path: "a.txt".into(),
                content: "hi\n".into()
            })
        );
    }

    #[test]
    fn test_parse_define_criteria_both_spellings() {
        let camel = r#"{"action":"define_criteria","taskId":"t1","criteria":["a","b"]}"#;
        let snake = r#"{"action":"define_criteria","task_id":"t1","criteria":["a","b"]}"#;
        let expected = Reply::Action(Action::DefineCriteria {
            task_id: "t1".into(),
            criteria: vec!["a".into(), "b".into()],
        });
        assert_eq!(parse(camel), expected);
        assert_eq!(parse(snake), expected);
    }

    #[test]
    fn test_parse_verify_criterion() {
        let reply = r#"{"action":"verify_criterion","taskId":"t1","criterionIndex":2,"command":"test -f x"}"#;
        assert_eq!(
            parse(reply),
            Reply::Action(Action::VerifyCriterion {
                task_id: "t1".into(),
                criterion_index: 2,
                command: "test -f x".into()
            })
        );
    }

    #[test]
    fn test_parse_unknown_tag() {
        let reply = r#"{"action": "deploy", "target": "prod"}"#;
        assert_eq!(parse(reply), Reply::Unrecognized("deploy".into()));
    }

    #[test]
    fn test_parse_malformed_is_prose() {
        assert_eq!(parse("{\"action\": \"run\", "), Reply::Prose);
        assert_eq!(parse("```json\nnot json\n```"), Reply::Prose);
        assert_eq!(parse("[1, 2, 3]"), Reply::Prose);
        assert_eq!(parse(r#"{"command": "ls"}"#), Reply::Prose);
        assert_eq!(parse(r#"{"action": 5}"#), Reply::Prose);
    }

    #[test]
    fn test_parse_missing_fields_is_prose() {
        assert_eq!(parse(r#"{"action": "run"}"#), Reply::Prose);
        assert_eq!(parse(r#"{"action": "patch", "path": "x"}"#), Reply::Prose);
    }

    #[test]
    fn test_parse_patch_with_fenced_content() {
        let reply = "```json\n{\"action\":\"patch\",\"path\":\"README.md\",\"content\":\"# Tool\\n\\n```bash\\ncargo run\\n```\\n\\nDone.\\n\"}\n```";
        assert_eq!(
            parse(reply),
            Reply::Action(Action::Patch {
                path: "README.md".into(),
                content: "# Tool\n\n```bash\ncargo run\n```\n\nDone.\n".into()
            })
        );
    }

    #[test]
    fn test_parse_object_surrounded_by_prose() {
        let reply = "Next I will list files: {\"action\": \"run\", \"command\": \"ls\"} then report.";
        assert_eq!(
            parse(reply),
            Reply::Action(Action::Run {
                command: "ls".into()
            })
        );
    }

    #[test]
    fn test_extract_fenced_block_first_only() {
        let text = "a\n```json\n{\"x\":1}\n```\nb\n```\nsecond\n```";
        assert_eq!(extract_fenced_block(text).map(str::trim), Some("{\"x\":1}"));
        assert!(extract_fenced_block("no fences").is_none());
    }

    #[test]
    fn test_classify_signal() {
        assert_eq!(classify_signal("Task complete!"), Some(Signal::Completed));
        assert_eq!(classify_signal("I'm DONE."), Some(Signal::Completed));
        assert_eq!(classify_signal("The build failed."), Some(Signal::Failed));
        assert_eq!(classify_signal("I cannot do that"), Some(Signal::Failed));
        assert_eq!(classify_signal("Here is the plan."), None);
    }

    #[test]
    fn test_classify_signal_completion_wins() {
        assert_eq!(
            classify_signal("Finished, after the first attempt failed."),
            Some(Signal::Completed)
        );
    }

    #[test]
    fn test_requires_confirmation() {
        assert!(Action::Run { command: "ls".into() }.requires_confirmation());
        assert!(Action::Patch {
            path: "a".into(),
            content: String::new()
        }
        .requires_confirmation());
        assert!(!Action::ReadFile { path: "a".into() }.requires_confirmation());
        assert!(!Action::Commit {
            message: "m".into()
        }
        .requires_confirmation());
    }

    #[test]
    fn test_tag_matches_known_tags() {
        let action = Action::ReadFile { path: "a".into() };
        assert!(KNOWN_TAGS.contains(&action.tag()));
    }
}
