//! Shared CLI helpers: wiring the orchestrator and reading the terminal.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use taskpilot::agent::{ActionExecutor, ContextBuilder, Orchestrator, RetryPolicy, RuntimeContext};
use taskpilot::config::Config;
use taskpilot::providers::{LLMProvider, OpenAIProvider};
use taskpilot::tools::approval::is_affirmative;
use taskpilot::tools::{Approver, AutoApprove, GitCli, LocalFileSystem, NativeShell};

/// Read a line from stdin, trimming whitespace. `None` on end of input.
pub(crate) fn read_line() -> Result<Option<String>> {
    let mut input = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut input)
        .with_context(|| "Failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Asks on the terminal before a gated action runs.
pub(crate) struct StdinApprover;

#[async_trait]
impl Approver for StdinApprover {
    async fn confirm(&self, prompt: &str) -> taskpilot::Result<bool> {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(stdout, "{} [y/N]: ", prompt)?;
            stdout.flush()?;
            let mut answer = String::new();
            io::stdin().lock().read_line(&mut answer)?;
            Ok(answer)
        })
        .await
        .map_err(|e| taskpilot::PilotError::Tool(format!("Confirmation prompt failed: {}", e)))??;
        Ok(is_affirmative(&answer))
    }
}

/// Build an orchestrator from config: OpenAI-compatible provider, local
/// shell, filesystem and git rooted at the configured working directory.
pub(crate) fn create_orchestrator(config: &Config) -> Result<Orchestrator> {
    let api_key = config
        .provider
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "No API key configured. Set TASKPILOT_API_KEY (or OPENAI_API_KEY), \
                 or add provider.api_key to {:?}",
                Config::path()
            )
        })?;
    let provider = match config.provider.api_base.as_deref() {
        Some(base) => OpenAIProvider::with_base_url(api_key, base),
        None => OpenAIProvider::new(api_key),
    };
    tracing::debug!(
        provider = provider.name(),
        api_base = provider.api_base(),
        "Provider configured"
    );

    let workdir = config.workdir();
    let executor = ActionExecutor::new(
        Arc::new(NativeShell::new().with_workdir(workdir.clone())),
        Arc::new(LocalFileSystem::new(workdir.clone())),
        Arc::new(GitCli::new(workdir.clone())),
    )
    .with_retry_policy(RetryPolicy::from(&config.shell))
    .with_max_output_bytes(config.shell.max_output_bytes);

    let approver: Arc<dyn Approver> = if config.agent.auto_approve {
        Arc::new(AutoApprove)
    } else {
        Arc::new(StdinApprover)
    };

    let runtime = RuntimeContext::new()
        .with_workdir(&workdir.display().to_string())
        .with_os_info()
        .with_current_time()
        .with_auto_approve(config.agent.auto_approve);

    Ok(Orchestrator::new(
        config.agent.clone(),
        config.context,
        Arc::new(provider),
        executor,
        approver,
    )
    .with_context_builder(ContextBuilder::new().with_runtime_context(runtime)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_orchestrator_requires_api_key() {
        let mut config = Config::default();
        config.provider.api_key = None;
        let err = create_orchestrator(&config).err().unwrap();
        assert!(err.to_string().contains("No API key configured"));

        config.provider.api_key = Some("   ".into());
        assert!(create_orchestrator(&config).is_err());
    }

    #[test]
    fn test_create_orchestrator_with_key() {
        let mut config = Config::default();
        config.provider.api_key = Some("sk-test".into());
        config.agent.auto_approve = true;
        let orchestrator = create_orchestrator(&config).unwrap();
        assert!(orchestrator.auto_approve());
        assert_eq!(orchestrator.context().len(), 1);
        let system = &orchestrator.context().messages()[0].content;
        assert!(system.contains("Auto-approve: on"));
    }
}
