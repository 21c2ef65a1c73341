use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::env;

use super::{ChatCompletionRequest, post_chat_completion};
use crate::llm_manager::LLMProvider;

#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    pub model: String,
    pub temperature: f32,
    api_key: String,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(model: Option<String>, temperature: Option<f32>) -> Result<Self> {
        let api_key = env::var("OPENROUTER_API_KEY")
            .context("OPENROUTER_API_KEY environment variable not set")?;
        Ok(Self {
            model: model.unwrap_or_else(|| "meta-llama/llama-3.1-8b-instruct".to_string()),
            temperature: temperature.unwrap_or(0.4),
            api_key,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    fn name(&self) -> &str { "openrouter" }
    fn context_size(&self) -> usize { 32768 }
    fn model_name(&self) -> &str { &self.model }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest::kitchen(&self.model, prompt, None, self.temperature);
        post_chat_completion(
            &self.client,
            self.name(),
            "https://openrouter.ai/api/v1/chat/completions",
            Some(&self.api_key),
            &request,
        )
        .await
    }
}
