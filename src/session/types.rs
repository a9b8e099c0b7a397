//! Message types for TaskPilot conversations
//!
//! A conversation is an ordered list of [`Message`]s. The first message is
//! always the single system message; everything after it alternates loosely
//! between user input, raw model replies and action results.

use serde::{Deserialize, Serialize};

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The text content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message.
    ///
    /// # Example
    /// ```
    /// use taskpilot::session::{Message, Role};
    ///
    /// let msg = Message::user("create a hello.txt file");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    /// Create a new assistant message.
    ///
    /// # Example
    /// ```
    /// use taskpilot::session::{Message, Role};
    ///
    /// let msg = Message::assistant("Task complete.");
    /// assert_eq!(msg.role, Role::Assistant);
    /// ```
    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }

    /// Create a new system message.
    ///
    /// # Example
    /// ```
    /// use taskpilot::session::{Message, Role};
    ///
    /// let msg = Message::system("You are an automation assistant.");
    /// assert_eq!(msg.role, Role::System);
    /// ```
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
        }
    }

    /// Check if this is the system message.
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt and environment/task state
    System,
    /// Messages from the user
    User,
    /// Model replies and derived action results
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}
