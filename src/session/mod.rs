//! Session module - conversation message types
//!
//! Conversation state is never persisted; it lives in the
//! [`ContextStore`](crate::agent::ContextStore) owned by the orchestrator.

pub mod types;

pub use types::{Message, Role};
