//! Context compression for conversation history.
//!
//! Truncation only, never summarization: old messages are dropped, the
//! system message at index 0 is always kept. Two passes:
//!
//! - **Count pass**: keep the system message plus the `max_messages - 1`
//!   most recent messages.
//! - **Token pass**: while still over the token ceiling, drop the oldest
//!   message after the system message, stopping once only the system
//!   message and one other remain.
//!
//! These are pure functions over `Vec<Message>`; [`ContextStore`] applies
//! them after every mutation.
//!
//! [`ContextStore`]: super::ContextStore

use crate::config::ContextConfig;
use crate::session::{Message, Role};

use super::tokens::estimate_messages;

/// What a compression pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionReport {
    /// Messages dropped by the count pass
    pub dropped_by_count: usize,
    /// Messages dropped by the token pass
    pub dropped_by_tokens: usize,
    /// Estimated token cost after compression
    pub tokens_after: usize,
}

impl CompressionReport {
    /// Whether anything was removed.
    pub fn compressed(&self) -> bool {
        self.dropped_by_count + self.dropped_by_tokens > 0
    }
}

/// Truncate messages to keep only the N most recent.
///
/// Always preserves the first system message if present. When the first
/// message has `role == System`, the result contains that system message
/// plus the `keep_recent` most recent messages after it. Pairs of
/// user/assistant turns are not kept aligned.
///
/// # Examples
/// ```
/// use taskpilot::session::Message;
/// use taskpilot::agent::compaction::truncate_messages;
///
/// let msgs = vec![
///     Message::system("You are helpful."),
///     Message::user("Hi"),
///     Message::assistant("Hello!"),
///     Message::user("How are you?"),
///     Message::assistant("Great!"),
/// ];
/// let result = truncate_messages(msgs, 2);
/// assert_eq!(result.len(), 3); // system + 2 recent
/// ```
pub fn truncate_messages(messages: Vec<Message>, keep_recent: usize) -> Vec<Message> {
    let has_system_prefix = messages
        .first()
        .map(|m| m.role == Role::System)
        .unwrap_or(false);

    if has_system_prefix {
        let rest = messages.len() - 1;
        if rest <= keep_recent {
            return messages;
        }
        let skip = rest - keep_recent;
        let mut iter = messages.into_iter();
        let mut result = Vec::with_capacity(1 + keep_recent);
        result.extend(iter.next());
        result.extend(iter.skip(skip));
        result
    } else {
        if messages.len() <= keep_recent {
            return messages;
        }
        let skip = messages.len() - keep_recent;
        messages.into_iter().skip(skip).collect()
    }
}

/// Drop the oldest non-system messages until the estimated cost fits
/// `max_tokens` or only `[system, one other]` remains.
///
/// Returns the number of messages removed.
pub fn drop_oldest_until_within(messages: &mut Vec<Message>, max_tokens: usize) -> usize {
    let mut dropped = 0;
    let mut total = estimate_messages(messages);
    while total > max_tokens && messages.len() > 2 {
        let removed = messages.remove(1);
        total -= super::tokens::estimate_message(&removed);
        dropped += 1;
    }
    dropped
}

/// Apply both passes to `messages` against `limits`.
///
/// A no-op when the context already fits both ceilings.
///
/// # Examples
/// ```
/// use taskpilot::config::ContextConfig;
/// use taskpilot::session::Message;
/// use taskpilot::agent::compaction::compress;
///
/// let limits = ContextConfig { max_messages: 3, max_tokens: 10_000 };
/// let mut msgs = vec![
///     Message::system("sys"),
///     Message::user("one"),
///     Message::user("two"),
///     Message::user("three"),
/// ];
/// let report = compress(&mut msgs, limits);
/// assert_eq!(msgs.len(), 3);
/// assert_eq!(msgs[1].content, "two");
/// assert_eq!(report.dropped_by_count, 1);
/// ```
pub fn compress(messages: &mut Vec<Message>, limits: ContextConfig) -> CompressionReport {
    let total = estimate_messages(messages);
    if total <= limits.max_tokens && messages.len() <= limits.max_messages {
        return CompressionReport {
            tokens_after: total,
            ..CompressionReport::default()
        };
    }

    let before = messages.len();
    let kept = truncate_messages(
        std::mem::take(messages),
        limits.max_messages.saturating_sub(1),
    );
    *messages = kept;
    let dropped_by_count = before - messages.len();

    let dropped_by_tokens = drop_oldest_until_within(messages, limits.max_tokens);

    CompressionReport {
        dropped_by_count,
        dropped_by_tokens,
        tokens_after: estimate_messages(messages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_messages: usize, max_tokens: usize) -> ContextConfig {
        ContextConfig {
            max_messages,
            max_tokens,
        }
    }

    // ── truncate_messages ──────────────────────────────────────────────

    #[test]
    fn test_truncate_keeps_n_recent_without_system() {
        let msgs = vec![
            Message::user("one"),
            Message::user("two"),
            Message::user("three"),
            Message::user("four"),
        ];
        let result = truncate_messages(msgs, 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].content, "three");
        assert_eq!(result[1].content, "four");
    }

    #[test]
    fn test_truncate_preserves_system_message() {
        let msgs = vec![
            Message::system("sys"),
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        let result = truncate_messages(msgs, 1);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].content, "sys");
        assert_eq!(result[1].content, "c");
    }

    #[test]
    fn test_truncate_zero_keeps_only_system() {
        let msgs = vec![Message::system("sys"), Message::user("a")];
        let result = truncate_messages(msgs, 0);
        assert_eq!(result.len(), 1);
        assert!(result[0].is_system());
    }

    #[test]
    fn test_truncate_noop_when_short() {
        let msgs = vec![Message::system("sys"), Message::user("a")];
        assert_eq!(truncate_messages(msgs, 5).len(), 2);
    }

    // ── compress ───────────────────────────────────────────────────────

    #[test]
    fn test_compress_noop_within_limits() {
        let mut msgs = vec![Message::system("sys"), Message::user("hello")];
        let report = compress(&mut msgs, limits(20, 1000));
        assert!(!report.compressed());
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn test_compress_count_pass() {
        let mut msgs = vec![Message::system("sys")];
        for i in 0..10 {
            msgs.push(Message::user(&format!("m{}", i)));
        }
        let report = compress(&mut msgs, limits(5, 10_000));
        assert_eq!(msgs.len(), 5);
        assert!(msgs[0].is_system());
        assert_eq!(msgs[1].content, "m6");
        assert_eq!(report.dropped_by_count, 6);
        assert_eq!(report.dropped_by_tokens, 0);
    }

    #[test]
    fn test_compress_token_pass_drops_oldest_first() {
        let big = "x".repeat(400); // ~100 tokens each
        let mut msgs = vec![
            Message::system("sys"),
            Message::user(&big),
            Message::assistant(&big),
            Message::user("latest"),
        ];
        let report = compress(&mut msgs, limits(20, 150));
        assert_eq!(report.dropped_by_count, 0);
        assert_eq!(report.dropped_by_tokens, 1);
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1].role, Role::Assistant);
        assert!(report.tokens_after <= 150);
    }

    #[test]
    fn test_compress_stops_at_two_messages() {
        let huge = "y".repeat(4000);
        let mut msgs = vec![
            Message::system("sys"),
            Message::user(&huge),
            Message::user(&huge),
            Message::user(&huge),
        ];
        let report = compress(&mut msgs, limits(20, 10));
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].is_system());
        assert!(report.tokens_after > 10);
    }

    #[test]
    fn test_compress_invariants_over_many_appends() {
        let lim = limits(6, 60);
        let mut msgs = vec![Message::system("system prompt")];
        for i in 0..200 {
            msgs.push(Message::user(&"z".repeat(i % 37)));
            compress(&mut msgs, lim);
            assert!(msgs.len() <= lim.max_messages);
            assert!(msgs[0].is_system());
            assert_eq!(msgs[0].content, "system prompt");
            assert!(estimate_messages(&msgs) <= lim.max_tokens || msgs.len() == 2);
        }
    }
}
