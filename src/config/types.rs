//! Configuration type definitions for TaskPilot
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a missing or partial config file is always valid.

use serde::{Deserialize, Serialize};

/// Main configuration struct for TaskPilot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Step loop behavior (model, step budget, confirmation gate)
    pub agent: AgentConfig,
    /// Context ceilings used by compression
    pub context: ContextConfig,
    /// Shell executor and retry policy
    pub shell: ShellConfig,
    /// Completion endpoint
    pub provider: ProviderConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Default model requested from the completion endpoint.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Step loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent to the completion endpoint
    pub model: String,
    /// Maximum tokens the model may generate per completion
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum steps per submission before the loop gives up
    pub max_steps: u32,
    /// Skip every confirmation prompt
    pub auto_approve: bool,
    /// Inputs longer than this (in chars) are treated as new goals
    pub goal_min_length: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.2,
            max_steps: 10,
            auto_approve: false,
            goal_min_length: 20,
        }
    }
}

// ============================================================================
// Context Configuration
// ============================================================================

/// Ceilings enforced by context compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum number of messages, system message included
    pub max_messages: usize,
    /// Maximum estimated token cost of the whole context
    pub max_tokens: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: 20,
            max_tokens: 8000,
        }
    }
}

// ============================================================================
// Shell Configuration
// ============================================================================

/// Shell executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Total attempts for a failing `run` action
    pub max_retries: u32,
    /// Base delay for the linear backoff (`attempt * base`)
    pub retry_base_delay_ms: u64,
    /// Action output above this size is truncated before entering context
    pub max_output_bytes: usize,
    /// Working directory for commands and relative paths (defaults to cwd)
    pub workdir: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 1000,
            max_output_bytes: 8000,
            workdir: None,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Bearer token
    pub api_key: Option<String>,
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub api_base: Option<String>,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, coloured
    Pretty,
    /// Compact single-line text
    #[default]
    Component,
    /// JSON lines
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "component" => Ok(LogFormat::Component),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Append logs to this file instead of stderr
    pub file: Option<String>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            file: None,
            level: "warn".to_string(),
        }
    }
}
