//! Error types for TaskPilot
//!
//! This module defines the error type used throughout the library. Uses
//! `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Most failures inside a step never surface here: the executor turns
//! collaborator failures into context messages the model can react to. What
//! remains are configuration problems, provider failures and I/O on the
//! interactive prompt.

use thiserror::Error;

/// The primary error type for TaskPilot operations.
#[derive(Error, Debug)]
pub enum PilotError {
    /// Configuration-related errors (invalid ceilings, missing API key, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion endpoint failures (HTTP status, malformed body, empty reply)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Collaborator failures (shell spawn, file write, git)
    #[error("Tool error: {0}")]
    Tool(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found (tasks, criteria)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// A specialized `Result` type for TaskPilot operations.
pub type Result<T> = std::result::Result<T, PilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PilotError::Config("max_messages must be at least 2".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: max_messages must be at least 2"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PilotError = io_err.into();
        assert!(matches!(err, PilotError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: PilotError = json_err.into();
        assert!(err.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_not_found_display() {
        let err = PilotError::NotFound("task abc".into());
        assert_eq!(err.to_string(), "Not found: task abc");
    }
}
