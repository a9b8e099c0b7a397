//! Configuration management for TaskPilot
//!
//! Configuration is loaded from `~/.taskpilot/config.json` (optional) with
//! environment variable overrides applied on top.

mod types;

pub use types::*;

use crate::error::{PilotError, Result};
use std::path::{Path, PathBuf};

impl Config {
    /// Returns the TaskPilot configuration directory path (~/.taskpilot)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".taskpilot")
    }

    /// Returns the path to the config file (~/.taskpilot/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Unparseable numeric values are ignored, keeping the file/default value.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TASKPILOT_AUTO_APPROVE") {
            self.agent.auto_approve = parse_bool(&val);
        }
        if let Ok(val) = std::env::var("TASKPILOT_MODEL") {
            self.agent.model = val;
        }
        if let Ok(val) = std::env::var("TASKPILOT_MAX_STEPS") {
            if let Ok(v) = val.parse() {
                self.agent.max_steps = v;
            }
        }

        if let Ok(val) = std::env::var("TASKPILOT_MAX_MESSAGES") {
            if let Ok(v) = val.parse() {
                self.context.max_messages = v;
            }
        }
        if let Ok(val) = std::env::var("TASKPILOT_MAX_CONTEXT_TOKENS") {
            if let Ok(v) = val.parse() {
                self.context.max_tokens = v;
            }
        }

        if let Ok(val) = std::env::var("TASKPILOT_SHELL_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                self.shell.max_retries = v;
            }
        }
        if let Ok(val) = std::env::var("TASKPILOT_SHELL_RETRY_DELAY_MS") {
            if let Ok(v) = val.parse() {
                self.shell.retry_base_delay_ms = v;
            }
        }

        // Provider credentials; the generic OpenAI variable is the fallback
        if let Ok(val) = std::env::var("TASKPILOT_API_KEY") {
            self.provider.api_key = Some(val);
        } else if self.provider.api_key.is_none() {
            if let Ok(val) = std::env::var("OPENAI_API_KEY") {
                self.provider.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("TASKPILOT_API_BASE") {
            self.provider.api_base = Some(val);
        }

        if let Ok(val) = std::env::var("TASKPILOT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("TASKPILOT_LOG_FORMAT") {
            if let Ok(v) = val.parse() {
                self.logging.format = v;
            }
        }
    }

    /// Reject ceilings that would make the loop unable to run.
    pub fn validate(&self) -> Result<()> {
        if self.context.max_messages < 2 {
            return Err(PilotError::Config(
                "context.max_messages must be at least 2".into(),
            ));
        }
        if self.context.max_tokens == 0 {
            return Err(PilotError::Config(
                "context.max_tokens must be greater than 0".into(),
            ));
        }
        if self.agent.max_steps == 0 {
            return Err(PilotError::Config(
                "agent.max_steps must be greater than 0".into(),
            ));
        }
        if self.shell.max_retries == 0 {
            return Err(PilotError::Config(
                "shell.max_retries must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the working directory for shell commands and relative paths.
    pub fn workdir(&self) -> PathBuf {
        match self.shell.workdir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => expand_tilde(dir),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Interpret common truthy spellings used in environment variables.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
