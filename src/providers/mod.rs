//! HTTP providers. Every backend here speaks the OpenAI-style
//! `/chat/completions` wire format, so the request/response types and the
//! error handling live in this module.

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod openrouter;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub(crate) const KITCHEN_SYSTEM_PROMPT: &str = "You are a friendly, practical cooking assistant. \
Answer concisely, use common kitchen units, and mention food safety when it matters.";

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// System prompt plus one user message.
    pub fn kitchen(model: &str, prompt: &str, max_tokens: Option<usize>, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                WireMessage {
                    role: "system".to_string(),
                    content: KITCHEN_SYSTEM_PROMPT.to_string(),
                },
                WireMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens,
            temperature,
            stream: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<usize>,
    completion_tokens: Option<usize>,
    total_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    // Some backends send a number, some a string
    code: Option<serde_json::Value>,
}

/// POST a chat completion and return the first choice's text.
pub(crate) async fn post_chat_completion(
    client: &Client,
    provider: &str,
    url: &str,
    api_key: Option<&str>,
    request: &ChatCompletionRequest,
) -> Result<String> {
    let mut builder = client.post(url).json(request);
    if let Some(key) = api_key {
        builder = builder.bearer_auth(key);
    }

    let response = builder
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", provider))?;

    let status = response.status();
    let response_text = response.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<ApiError>(&response_text) {
            Ok(err) => anyhow!(
                "{} API error: {} (type: {:?}, code: {:?})",
                provider,
                err.error.message,
                err.error.error_type,
                err.error.code
            ),
            Err(_) => anyhow!("{} API error (status {}): {}", provider, status, response_text),
        });
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
        .with_context(|| format!("Failed to parse {} response", provider))?;

    if let Some(usage) = &parsed.usage {
        info!(
            "{} token usage - Prompt: {:?}, Completion: {:?}, Total: {:?}",
            provider, usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No response choices from {}", provider))?;

    match choice.finish_reason.as_deref() {
        Some("length") | Some("max_tokens") => {
            warn!("{} response was truncated; the answer may be incomplete", provider)
        }
        _ => {}
    }

    Ok(choice.message.content)
}
