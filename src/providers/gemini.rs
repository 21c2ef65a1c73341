use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::env;

use super::{ChatCompletionRequest, post_chat_completion};
use crate::llm_manager::LLMProvider;

/// Gemini through Google's OpenAI-compatible endpoint
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: usize,
    temperature: f32,
    client: Client,
}

impl GeminiProvider {
    pub fn new(model: Option<String>, temperature: Option<f32>) -> Result<Self> {
        let api_key =
            env::var("GEMINI_API_KEY").context("GEMINI_API_KEY environment variable not set")?;
        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| "gemini-1.5-pro-latest".to_string()),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            max_tokens: 2048,
            temperature: temperature.unwrap_or(0.4),
            client: Client::new(),
        })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn context_size(&self) -> usize {
        match self.model.trim_start_matches("models/") {
            m if m.starts_with("gemini-1.5-pro") => 2_097_152,
            _ => 1_048_576,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest::kitchen(
            &self.model,
            prompt,
            Some(self.max_tokens),
            self.temperature,
        );
        post_chat_completion(
            &self.client,
            self.name(),
            &format!("{}/chat/completions", self.base_url),
            Some(&self.api_key),
            &request,
        )
        .await
    }
}
