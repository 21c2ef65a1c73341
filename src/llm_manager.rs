use crate::analyzer::{COOKING_TIME_PROMPT, NUTRITION_PROMPT, STEPS_PROMPT};
use crate::chat::ChatMode;
use crate::config::{Config, ProviderConfig};
use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::impl_event_emitter;
use crate::providers::{
    gemini::GeminiProvider, ollama::OllamaProvider, openai::OpenAIProvider,
    openrouter::OpenRouterProvider,
};
use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

/// Trait representing an LLM provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Maximum context size in tokens.
    #[allow(dead_code)]
    fn context_size(&self) -> usize;

    /// Send a prompt to the provider and return the response text.
    async fn send_prompt(&self, prompt: &str) -> Result<String>;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }
}

/// Offline provider with canned kitchen answers, used when no remote LLM is
/// configured or `--offline` is given.
pub struct LocalProvider;

impl LocalProvider {
    fn estimate_minutes(recipe: &str) -> usize {
        let sentences = recipe.split('.').filter(|s| !s.trim().is_empty()).count();
        (sentences * 5).max(10)
    }

    fn numbered_steps(recipe: &str) -> String {
        let steps: Vec<String> = recipe
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect();
        if steps.is_empty() {
            "1. Prepare the ingredients and cook until done".to_string()
        } else {
            steps.join("\n")
        }
    }
}

#[async_trait]
impl LLMProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn context_size(&self) -> usize {
        4096
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        if let Some(recipe) = prompt.strip_prefix(COOKING_TIME_PROMPT) {
            return Ok(format!("{}", Self::estimate_minutes(recipe)));
        }
        if let Some(recipe) = prompt.strip_prefix(STEPS_PROMPT) {
            return Ok(Self::numbered_steps(recipe));
        }
        if prompt.starts_with(NUTRITION_PROMPT) {
            return Ok(
                "Calories: 450 kcal\nProtein: 15 g\nCarbohydrates: 60 g\nFats: 14 g".to_string(),
            );
        }
        for mode in ChatMode::ALL {
            if let Some(question) = prompt.strip_prefix(mode.template()) {
                return Ok(format!(
                    "I'm running offline, so no fresh ideas right now. You asked about:{}",
                    question
                ));
            }
        }
        Ok(prompt.to_string())
    }
}

/// Manager that keeps track of providers and reports calls on the event bus.
pub struct LLMManager {
    providers: Vec<Box<dyn LLMProvider>>,
    event_bus: Option<Arc<EventBus>>,
    config: Option<Arc<Config>>,
}

impl LLMManager {
    /// Create a new manager with the given providers.
    pub fn new(
        providers: Vec<Box<dyn LLMProvider>>,
        event_bus: Arc<EventBus>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            providers,
            event_bus: Some(event_bus),
            config: Some(config),
        }
    }

    /// Build providers from the enabled entries in the configuration, in
    /// priority order. Falls back to [`LocalProvider`] when none can be built.
    pub fn from_config(config: Arc<Config>, event_bus: Arc<EventBus>, offline: bool) -> Self {
        let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();

        if !offline {
            let ai = &config.ai_providers;
            if let Some(p) = enabled(&ai.gemini) {
                push_provider(
                    &mut providers,
                    "Gemini",
                    GeminiProvider::new(Some(p.model.clone()), p.temperature),
                );
            }
            if let Some(p) = enabled(&ai.openai) {
                push_provider(
                    &mut providers,
                    "OpenAI",
                    OpenAIProvider::new(Some(p.model.clone()), p.temperature),
                );
            }
            if let Some(p) = enabled(&ai.openrouter) {
                push_provider(
                    &mut providers,
                    "OpenRouter",
                    OpenRouterProvider::new(Some(p.model.clone()), p.temperature),
                );
            }
            if let Some(p) = enabled(&ai.ollama) {
                push_provider(
                    &mut providers,
                    "Ollama",
                    OllamaProvider::new(Some(p.model.clone()), p.temperature, p.base_url.clone()),
                );
            }
        }

        if providers.is_empty() {
            if !offline {
                warn!("No LLM provider available, answering from the offline kitchen helper");
            }
            providers.push(Box::new(LocalProvider));
        }

        Self::new(providers, event_bus, config)
    }

    /// Get the active provider.
    pub fn provider(&self) -> Option<&dyn LLMProvider> {
        self.providers.first().map(|p| p.as_ref())
    }

    /// Send a prompt to the first available provider.
    pub async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let provider = self
            .providers
            .first()
            .ok_or_else(|| anyhow::anyhow!("No providers available"))?;

        info!("Sending prompt to {} ({})", provider.name(), provider.model_name());
        if let Some(bus) = &self.event_bus {
            let _ = bus
                .emit(Event::APICallStarted {
                    provider: provider.name().to_string(),
                    model: provider.model_name().to_string(),
                })
                .await;
        }

        let result = provider.send_prompt(prompt).await;

        if let Some(bus) = &self.event_bus {
            match &result {
                Ok(response) => {
                    // Rough estimate: 1 token ≈ 4 characters
                    let input_tokens = prompt.len() / 4;
                    let output_tokens = response.len() / 4;
                    let cost = self.calculate_cost(provider.name(), input_tokens, output_tokens);

                    let _ = bus
                        .emit(Event::APICallCompleted {
                            provider: provider.name().to_string(),
                            tokens: input_tokens + output_tokens,
                            cost,
                        })
                        .await;
                }
                Err(e) => {
                    warn!("{} call failed: {}", provider.name(), e);
                    let _ = bus
                        .emit(Event::APIError {
                            provider: provider.name().to_string(),
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        result
    }

    /// Calculate cost for API call based on provider configuration
    fn calculate_cost(&self, provider_name: &str, input_tokens: usize, output_tokens: usize) -> f32 {
        let Some(config) = &self.config else {
            return 0.0;
        };

        let provider_config = match provider_name.to_lowercase().as_str() {
            "gemini" => &config.ai_providers.gemini,
            "openai" => &config.ai_providers.openai,
            "openrouter" => &config.ai_providers.openrouter,
            "ollama" => &config.ai_providers.ollama,
            _ => return 0.0,
        };

        match provider_config {
            Some(p) => {
                p.cost_per_1m_input_tokens.unwrap_or(0.0) * (input_tokens as f32) / 1_000_000.0
                    + p.cost_per_1m_output_tokens.unwrap_or(0.0) * (output_tokens as f32)
                        / 1_000_000.0
            }
            None => 0.0,
        }
    }
}

fn enabled(provider: &Option<ProviderConfig>) -> Option<&ProviderConfig> {
    provider.as_ref().filter(|p| p.enabled)
}

fn push_provider<P: LLMProvider + 'static>(
    providers: &mut Vec<Box<dyn LLMProvider>>,
    name: &str,
    built: Result<P>,
) {
    match built {
        Ok(provider) => {
            info!("{} provider ready ({})", name, provider.model_name());
            providers.push(Box::new(provider));
        }
        Err(e) => warn!("Skipping {} provider: {}", name, e),
    }
}

// Implement EventEmitter trait for LLMManager
impl_event_emitter!(LLMManager);

/// Test doubles for the LLM boundary.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Provider that answers from a prefix-matched script and records every
    /// prompt it receives.
    pub struct ScriptedProvider {
        rules: Vec<(String, std::result::Result<String, String>)>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self {
                rules: Vec::new(),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn reply(mut self, prefix: &str, text: &str) -> Self {
            self.rules.push((prefix.to_string(), Ok(text.to_string())));
            self
        }

        pub fn fail(mut self, prefix: &str, error: &str) -> Self {
            self.rules.push((prefix.to_string(), Err(error.to_string())));
            self
        }

        pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
            self.prompts.clone()
        }

        /// Wrap the script in a manager with a fresh event bus.
        pub fn into_manager(self) -> (Arc<LLMManager>, Arc<Mutex<Vec<String>>>) {
            let prompts = self.prompts();
            let manager = LLMManager::new(
                vec![Box::new(self)],
                Arc::new(EventBus::new(64)),
                Arc::new(Config::default()),
            );
            (Arc::new(manager), prompts)
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn context_size(&self) -> usize {
            4096
        }

        async fn send_prompt(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.rules.iter().find(|(prefix, _)| prompt.starts_with(prefix)) {
                Some((_, Ok(text))) => Ok(text.clone()),
                Some((_, Err(e))) => Err(anyhow::anyhow!(e.clone())),
                None => Err(anyhow::anyhow!("no scripted reply for {:?}", prompt)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;

    #[tokio::test]
    async fn test_send_prompt_updates_metrics() {
        let bus = Arc::new(EventBus::new(16));
        let manager = LLMManager::new(
            vec![Box::new(ScriptedProvider::new().reply("", "ok"))],
            bus.clone(),
            Arc::new(Config::default()),
        );

        assert_eq!(manager.send_prompt("hello there").await.unwrap(), "ok");
        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_api_calls, 1);
        assert_eq!(metrics.api_errors, 0);
    }

    #[tokio::test]
    async fn test_errors_are_reported_and_returned() {
        let bus = Arc::new(EventBus::new(16));
        let manager = LLMManager::new(
            vec![Box::new(ScriptedProvider::new().fail("", "quota exceeded"))],
            bus.clone(),
            Arc::new(Config::default()),
        );

        let err = manager.send_prompt("hello").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(bus.get_metrics().await.api_errors, 1);
    }

    #[tokio::test]
    async fn test_offline_manager_uses_local_provider() {
        let manager = LLMManager::from_config(
            Arc::new(Config::default()),
            Arc::new(EventBus::new(16)),
            true,
        );
        assert_eq!(manager.provider().map(|p| p.name()), Some("local"));
    }

    #[tokio::test]
    async fn test_local_provider_answers_kitchen_prompts() {
        let local = LocalProvider;
        let time = local
            .send_prompt(&format!("{}Boil pasta. Add sauce.", COOKING_TIME_PROMPT))
            .await
            .unwrap();
        assert_eq!(time, "10");

        let steps = local
            .send_prompt(&format!("{}Boil pasta. Add sauce.", STEPS_PROMPT))
            .await
            .unwrap();
        assert_eq!(steps, "1. Boil pasta\n2. Add sauce");
    }
}
