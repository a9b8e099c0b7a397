//! Token cost estimation.
//!
//! A cheap, deterministic approximation of model tokens: roughly four
//! characters per token, rounded up. Identical input always yields the same
//! cost, which keeps compression reproducible.

use crate::session::Message;

/// Approximate characters per model token.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of `text`.
///
/// # Example
/// ```
/// use taskpilot::agent::tokens::estimate;
///
/// assert_eq!(estimate(""), 0);
/// assert_eq!(estimate("abcd"), 1);
/// assert_eq!(estimate("abcde"), 2);
/// ```
pub fn estimate(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate the token cost of a message: role label followed by content.
pub fn estimate_message(message: &Message) -> usize {
    estimate(&format!("{}{}", message.role, message.content))
}

/// Sum of [`estimate_message`] over `messages`.
pub fn estimate_messages(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message).sum()
}
