use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use super::{ChatCompletionRequest, post_chat_completion};
use crate::llm_manager::LLMProvider;

/// Ollama local LLM provider, through its OpenAI-compatible endpoint
pub struct OllamaProvider {
    model: String,
    base_url: String,
    client: Client,
    max_tokens: usize,
    temperature: f32,
}

impl OllamaProvider {
    pub fn new(
        model: Option<String>,
        temperature: Option<f32>,
        base_url: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            model: model.unwrap_or_else(|| "llama3.2".to_string()),
            base_url: base_url
                .unwrap_or_else(|| "http://localhost:11434".to_string())
                .trim_end_matches('/')
                .to_string(),
            client: Client::new(),
            max_tokens: 2048,
            temperature: temperature.unwrap_or(0.7),
        })
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn context_size(&self) -> usize {
        // Handle size variants such as "qwen3:8b"
        let base_model = self.model.split(':').next().unwrap_or(&self.model);

        match base_model {
            "llama3.3" | "llama3.2" | "llama3.1" => 128_000,
            "llama3" => 8_192,
            "qwen3" => 128_000,
            "qwen2.5" => 32_768,
            "gemma3" => 128_000,
            "gemma2" => 8_192,
            "mistral" => 32_768,
            "phi4" => 16_384,
            _ => 32_768,
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
            &format!("{}/v1/chat/completions", self.base_url),
            None,
            &request,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_size_ignores_tag() {
        let provider = OllamaProvider::new(Some("qwen3:8b".to_string()), None, None).unwrap();
        assert_eq!(provider.context_size(), 128_000);

        let provider = OllamaProvider::new(None, None, Some("http://box:11434/".into())).unwrap();
        assert_eq!(provider.base_url, "http://box:11434");
        assert_eq!(provider.model_name(), "llama3.2");
    }
}
