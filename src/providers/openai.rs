use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::env;

use super::{ChatCompletionRequest, post_chat_completion};
use crate::llm_manager::LLMProvider;

/// OpenAI chat completions provider
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(model: Option<String>, temperature: Option<f32>) -> Result<Self> {
        let api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY environment variable not set")?;
        Ok(Self::with_config(
            api_key,
            model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        )
        .with_temperature(temperature.unwrap_or(0.4)))
    }

    pub fn with_config(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.4,
            client: Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Reasoning models reject a custom temperature.
    fn is_reasoning_model(&self) -> bool {
        self.model.starts_with('o')
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn context_size(&self) -> usize {
        match self.model.as_str() {
            "gpt-3.5-turbo" => 16_385,
            "gpt-4" => 8_192,
            m if m.starts_with("gpt-4.1") => 1_047_576,
            m if m.starts_with("o3") || m.starts_with("o4") => 200_000,
            _ => 128_000,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let temperature = if self.is_reasoning_model() { 1.0 } else { self.temperature };
        let request = ChatCompletionRequest::kitchen(&self.model, prompt, None, temperature);
        post_chat_completion(
            &self.client,
            self.name(),
            "https://api.openai.com/v1/chat/completions",
            Some(&self.api_key),
            &request,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_sizes() {
        let provider = OpenAIProvider::with_config("test_key".to_string(), "gpt-4o".to_string());
        assert_eq!(provider.context_size(), 128_000);

        let provider =
            OpenAIProvider::with_config("test_key".to_string(), "gpt-3.5-turbo".to_string());
        assert_eq!(provider.context_size(), 16_385);
    }

    #[test]
    fn test_reasoning_models_detected() {
        assert!(OpenAIProvider::with_config("k".into(), "o4-mini".into()).is_reasoning_model());
        assert!(!OpenAIProvider::with_config("k".into(), "gpt-4o-mini".into()).is_reasoning_model());
    }
}
