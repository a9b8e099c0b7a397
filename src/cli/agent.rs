//! Agent command handlers: one-shot goal and the interactive session.

use std::io::{self, Write};

use anyhow::Result;

use taskpilot::agent::{HaltReason, Orchestrator};
use taskpilot::config::Config;

use super::common::{create_orchestrator, read_line};

/// Commands handled locally in the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SlashCommand {
    Exit,
    Reset,
    Pwd,
    Tasks,
    Unknown(String),
}

/// Parse `/command` input. Anything not starting with `/` is `None`.
pub(crate) fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let input = input.trim();
    let name = input.strip_prefix('/')?;
    let name = name.split_whitespace().next().unwrap_or("");
    Some(match name.to_ascii_lowercase().as_str() {
        "exit" | "quit" => SlashCommand::Exit,
        "reset" => SlashCommand::Reset,
        "pwd" => SlashCommand::Pwd,
        "tasks" => SlashCommand::Tasks,
        _ => SlashCommand::Unknown(input.to_string()),
    })
}

/// Run an optional one-shot goal, then the interactive session if requested.
pub(crate) async fn cmd_agent(config: Config, goal: Option<String>, interactive: bool) -> Result<()> {
    let mut orchestrator = create_orchestrator(&config)?;

    if let Some(goal) = goal {
        let ok = submit_and_report(&mut orchestrator, &goal).await;
        if !interactive {
            if !ok {
                std::process::exit(1);
            }
            return Ok(());
        }
    }

    print_banner(&config);
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let Some(input) = read_line()? else {
            // EOF
            println!();
            break;
        };
        if input.is_empty() {
            continue;
        }

        match parse_slash_command(&input) {
            Some(SlashCommand::Exit) => {
                println!("Goodbye!");
                break;
            }
            Some(SlashCommand::Reset) => {
                orchestrator.reset();
                println!("Conversation and tasks cleared.");
            }
            Some(SlashCommand::Pwd) => {
                println!("{}", config.workdir().display());
            }
            Some(SlashCommand::Tasks) => {
                println!("{}", orchestrator.task_summary());
            }
            Some(SlashCommand::Unknown(cmd)) => {
                println!("Unknown command: {}", cmd);
                println!("Available commands: /exit, /reset, /pwd, /tasks");
            }
            None => {
                submit_and_report(&mut orchestrator, &input).await;
            }
        }
        println!();
    }

    Ok(())
}

/// Submit one input and print the final reply and halt reason.
///
/// Returns `false` when the submission errored or the task did not finish
/// successfully.
async fn submit_and_report(orchestrator: &mut Orchestrator, input: &str) -> bool {
    match orchestrator.submit(input).await {
        Ok(outcome) => {
            if let Some(reply) = &outcome.last_reply {
                println!();
                println!("{}", reply);
            }
            println!();
            if outcome.tokens_used > 0 {
                println!(
                    "[{} after {} step(s), {} tokens]",
                    outcome.reason, outcome.steps, outcome.tokens_used
                );
            } else {
                println!("[{} after {} step(s)]", outcome.reason, outcome.steps);
            }
            !matches!(
                outcome.reason,
                HaltReason::TaskFailed
                    | HaltReason::UnrecognizedAction(_)
                    | HaltReason::StepBudgetExhausted
            )
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

fn print_banner(config: &Config) {
    println!("TaskPilot v{}", env!("CARGO_PKG_VERSION"));
    println!("Working directory: {}", config.workdir().display());
    println!(
        "Platform: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!(
        "Model: {}  |  Auto-approve: {}",
        config.agent.model,
        if config.agent.auto_approve { "on" } else { "off" }
    );
    println!("Describe a goal and press Enter. Commands: /exit, /reset, /pwd, /tasks");
    println!();
}
