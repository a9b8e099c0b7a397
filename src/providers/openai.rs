//! OpenAI-compatible provider implementation
//!
//! Implements the `LLMProvider` trait against the Chat Completions API. Any
//! endpoint speaking the same wire format (Azure, OpenRouter, vLLM, Ollama)
//! works through [`OpenAIProvider::with_base_url`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PilotError, Result};
use crate::session::Message;

use super::{ChatOptions, LLMProvider, LLMResponse, Usage};

/// The OpenAI API endpoint URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// The default model to use.
const DEFAULT_MODEL: &str = crate::config::DEFAULT_MODEL;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}

// ============================================================================
// OpenAI Provider
// ============================================================================

/// OpenAI-compatible completion provider.
pub struct OpenAIProvider {
    /// API key for authentication
    api_key: String,
    /// API base URL
    api_base: String,
    /// HTTP client for making requests
    client: Client,
}

impl OpenAIProvider {
    /// Create a new provider against the default OpenAI endpoint.
    ///
    /// # Example
    /// ```
    /// use taskpilot::providers::{LLMProvider, OpenAIProvider};
    ///
    /// let provider = OpenAIProvider::new("sk-xxx");
    /// assert_eq!(provider.name(), "openai");
    /// ```
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL)
    }

    /// Create a provider with a custom base URL (trailing slash removed).
    pub fn with_base_url(api_key: &str, api_base: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// The base URL requests are sent to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

/// Turn a non-success response body into a readable provider error.
fn describe_error(status: u16, body: &str) -> PilotError {
    match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(parsed) => PilotError::Provider(format!(
            "API error ({}): {} - {}",
            status,
            parsed.error.r#type.as_deref().unwrap_or("error"),
            parsed.error.message
        )),
        Err(_) => PilotError::Provider(format!("API error ({}): {}", status, body.trim())),
    }
}

/// Extract the first choice's text from a response body.
fn convert_response(response: OpenAIResponse) -> Result<LLMResponse> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| PilotError::Provider("Completion contained no choices".into()))?;

    let mut llm_response = LLMResponse::text(&content);
    if let Some(usage) = response.usage {
        llm_response =
            llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }
    Ok(llm_response)
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let model = model.unwrap_or(DEFAULT_MODEL);
        let request = OpenAIRequest {
            model,
            messages: &messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        debug!(model = model, messages = messages.len(), "Completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PilotError::Provider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(describe_error(status.as_u16(), &body));
        }

        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| PilotError::Provider(format!("Failed to parse response: {}", e)))?;

        convert_response(parsed)
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_removed() {
        let provider = OpenAIProvider::with_base_url("k", "http://localhost:11434/v1/");
        assert_eq!(provider.api_base(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_request_serializes_messages_verbatim() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let request = OpenAIRequest {
            model: "m",
            messages: &messages,
            max_tokens: None,
            temperature: Some(0.2),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_convert_response_first_choice() {
        let raw = r#"{"choices":[{"message":{"content":"hello"}}],"usage":{"prompt_tokens":3,"completion_tokens":1}}"#;
        let parsed: OpenAIResponse = serde_json::from_str(raw).unwrap();
        let response = convert_response(parsed).unwrap();
        assert_eq!(response.content, "hello");
        assert_eq!(response.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn test_convert_response_empty_choices_is_error() {
        let parsed: OpenAIResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(convert_response(parsed).is_err());
    }

    #[test]
    fn test_describe_error_structured_body() {
        let err = describe_error(
            401,
            r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#,
        );
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("bad key"));
    }

    #[test]
    fn test_describe_error_plain_body() {
        let err = describe_error(502, "upstream down\n");
        assert_eq!(err.to_string(), "Provider error: API error (502): upstream down");
    }
}
