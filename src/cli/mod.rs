//! CLI module — argument parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod agent;
pub mod common;

use anyhow::{Context, Result};
use clap::Parser;

use taskpilot::config::Config;

#[derive(Parser, Debug)]
#[command(name = "taskpilot")]
#[command(version)]
#[command(
    about = "Autonomous task agent for your terminal",
    long_about = "Give TaskPilot a goal and it works towards it step by step: \
running commands, reading and writing files, committing, and verifying \
success criteria. Without a goal it starts an interactive session."
)]
struct Cli {
    /// Start an interactive session (after running the given goal, if any)
    #[arg(short, long)]
    interactive: bool,
    /// Run commands and write files without asking for confirmation
    #[arg(long)]
    auto_approve: bool,
    /// Goal to work on, e.g. `taskpilot create a README for this project`
    #[arg(trailing_var_arg = true, value_name = "GOAL")]
    words: Vec<String>,
}

impl Cli {
    /// The trailing words joined into one goal, if any were given.
    fn goal(&self) -> Option<String> {
        let goal = self.words.join(" ");
        let goal = goal.trim();
        (!goal.is_empty()).then(|| goal.to_string())
    }
}

/// Entry point for the CLI — called from main().
pub async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load()
        .with_context(|| format!("Failed to load configuration from {:?}", Config::path()))?;
    if cli.auto_approve {
        config.agent.auto_approve = true;
    }
    taskpilot::utils::logging::init_logging(&config.logging)
        .with_context(|| "Failed to initialize logging")?;

    let goal = cli.goal();
    let interactive = cli.interactive || goal.is_none();
    agent::cmd_agent(config, goal, interactive).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_words_form_goal() {
        let cli = Cli::parse_from(["taskpilot", "create", "a", "README"]);
        assert_eq!(cli.goal().as_deref(), Some("create a README"));
        assert!(!cli.interactive);
    }

    #[test]
    fn test_flags_before_goal() {
        let cli = Cli::parse_from(["taskpilot", "--auto-approve", "-i", "check", "tests"]);
        assert!(cli.auto_approve);
        assert!(cli.interactive);
        assert_eq!(cli.goal().as_deref(), Some("check tests"));
    }

    #[test]
    fn test_no_words_means_no_goal() {
        let cli = Cli::parse_from(["taskpilot"]);
        assert!(cli.goal().is_none());
    }
}
