use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::time_estimate::FALLBACK_MINUTES;

/// Main configuration structure for kitchen_copilot
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// AI provider configurations
    #[serde(default)]
    pub ai_providers: AIProvidersConfig,

    /// Recipe analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Session and render loop configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// UI display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

/// Providers are tried in this field order; the first one that can be built wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIProvidersConfig {
    pub gemini: Option<ProviderConfig>,
    pub openai: Option<ProviderConfig>,
    pub openrouter: Option<ProviderConfig>,
    pub ollama: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    pub enabled: bool,

    /// Model to use
    pub model: String,

    /// Temperature setting
    pub temperature: Option<f32>,

    /// Server address, for self-hosted providers
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub cost_per_1m_input_tokens: Option<f32>,

    #[serde(default)]
    pub cost_per_1m_output_tokens: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minutes used when the model's time estimate cannot be read
    #[serde(default = "default_fallback_minutes")]
    pub fallback_minutes: u64,

    /// Characters kept from the recipe's first word for the timer label
    #[serde(default = "default_label_max_chars")]
    pub label_max_chars: usize,

    /// Send the time, steps and nutrition requests concurrently
    #[serde(default = "default_parallel_requests")]
    pub parallel_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How often the watch view re-renders (and so re-ticks) timers
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,

    /// Upper bound for the minutes field of a manual timer
    #[serde(default = "default_max_manual_minutes")]
    pub max_manual_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show progress bars
    #[serde(default = "default_progress_bars")]
    pub progress_bars: bool,
}

// Default value functions
fn default_fallback_minutes() -> u64 { FALLBACK_MINUTES }
fn default_label_max_chars() -> usize { 15 }
fn default_parallel_requests() -> bool { true }
fn default_render_interval_ms() -> u64 { 1000 }
fn default_max_manual_minutes() -> u32 { 120 }
fn default_colorful() -> bool { true }
fn default_progress_bars() -> bool { true }

impl Default for AIProvidersConfig {
    fn default() -> Self {
        AIProvidersConfig {
            gemini: Some(ProviderConfig {
                enabled: true,
                model: "gemini-1.5-pro-latest".to_string(),
                temperature: Some(0.4),
                base_url: None,
                cost_per_1m_input_tokens: Some(1.25),
                cost_per_1m_output_tokens: Some(5.0),
            }),
            openai: Some(ProviderConfig {
                enabled: false,
                model: "gpt-4o-mini".to_string(),
                temperature: Some(0.4),
                base_url: None,
                cost_per_1m_input_tokens: Some(0.15),
                cost_per_1m_output_tokens: Some(0.6),
            }),
            openrouter: Some(ProviderConfig {
                enabled: false,
                model: "meta-llama/llama-3.1-8b-instruct".to_string(),
                temperature: Some(0.4),
                base_url: None,
                cost_per_1m_input_tokens: None,
                cost_per_1m_output_tokens: None,
            }),
            ollama: Some(ProviderConfig {
                enabled: false,
                model: "llama3.2".to_string(),
                temperature: Some(0.7),
                base_url: Some("http://localhost:11434".to_string()),
                cost_per_1m_input_tokens: None,
                cost_per_1m_output_tokens: None,
            }),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            fallback_minutes: default_fallback_minutes(),
            label_max_chars: default_label_max_chars(),
            parallel_requests: default_parallel_requests(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            render_interval_ms: default_render_interval_ms(),
            max_manual_minutes: default_max_manual_minutes(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            colorful: default_colorful(),
            progress_bars: default_progress_bars(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(&*shellexpand::tilde(path));
        }

        let default_paths = [
            "kitchen_copilot.toml",
            ".kitchen_copilot.toml",
            "~/.config/kitchen_copilot/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            let expanded: &str = &expanded_path;
            if Path::new(expanded).exists() {
                match Self::from_file(expanded) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, plain: bool, render_interval_ms: Option<u64>) {
        if plain {
            self.ui.colorful = false;
            self.ui.progress_bars = false;
        }
        if let Some(ms) = render_interval_ms {
            self.session.render_interval_ms = ms.max(50);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [analysis]
            fallback_minutes = 15

            [session]
            render_interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.fallback_minutes, 15);
        assert_eq!(config.analysis.label_max_chars, 15);
        assert_eq!(config.session.render_interval_ms, 250);
        assert_eq!(config.session.max_manual_minutes, 120);
        assert!(config.ui.colorful);
        assert!(config.ai_providers.gemini.as_ref().unwrap().enabled);
    }

    #[test]
    fn test_provider_section_replaces_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ai_providers.ollama]
            enabled = true
            model = "qwen3:8b"
            base_url = "http://kitchen-box:11434"
            "#,
        )
        .unwrap();

        let ollama = config.ai_providers.ollama.unwrap();
        assert!(ollama.enabled);
        assert_eq!(ollama.base_url.as_deref(), Some("http://kitchen-box:11434"));
        assert!(config.ai_providers.gemini.is_none());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.merge_with_args(true, Some(10));
        assert!(!config.ui.colorful);
        assert!(!config.ui.progress_bars);
        assert_eq!(config.session.render_interval_ms, 50);
    }
}
