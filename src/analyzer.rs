use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::config::AnalysisConfig;
use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::impl_event_emitter;
use crate::llm_manager::LLMManager;
use crate::time_estimate::{extract_minutes, minutes_or_fallback};

pub const COOKING_TIME_PROMPT: &str = "Estimate total cooking time (in minutes only). Recipe: ";
pub const STEPS_PROMPT: &str =
    "Break this recipe into clear step-by-step instructions with estimated time for each step:\n";
pub const NUTRITION_PROMPT: &str =
    "Give an estimated nutrition breakdown of the following recipe:\n";
const NUTRITION_SUFFIX: &str = "\nInclude calories, protein, carbs, fats.";

/// Everything the model told us about one recipe.
#[derive(Debug, Clone)]
pub struct RecipeAnalysis {
    pub label: String,
    pub minutes: u64,
    pub used_fallback: bool,
    pub steps: String,
    pub nutrition: String,
}

impl RecipeAnalysis {
    pub fn duration_secs(&self) -> f64 {
        (self.minutes as f64) * 60.0
    }
}

/// One line of the step-by-step output.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionStep {
    /// 1-based line position in the model's reply, blank lines included.
    pub number: usize,
    pub text: String,
}

/// Split the model's instructions into displayable steps, skipping blank lines.
pub fn instruction_steps(steps: &str) -> Vec<InstructionStep> {
    steps
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| InstructionStep {
            number: i + 1,
            text: line.trim().to_string(),
        })
        .collect()
}

/// Timer label for an analysed recipe: the first word, cut to `max_chars`
/// characters, behind a pan emoji.
pub fn derive_label(recipe: &str, max_chars: usize) -> String {
    let first_word = recipe.split_whitespace().next().unwrap_or("Recipe");
    let short: String = first_word.chars().take(max_chars).collect();
    format!("🍳 {}...", short)
}

/// Sends the three recipe prompts and collects their answers.
pub struct RecipeAnalyzer {
    config: AnalysisConfig,
    event_bus: Option<Arc<EventBus>>,
}

impl RecipeAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Analyse a recipe.
    ///
    /// The time estimate never fails: it falls back to the configured minutes.
    /// A failed steps or nutrition request fails the whole analysis.
    pub async fn analyze(&self, llm: &LLMManager, recipe: &str) -> Result<RecipeAnalysis> {
        let time_prompt = format!("{}{}", COOKING_TIME_PROMPT, recipe);
        let steps_prompt = format!("{}{}", STEPS_PROMPT, recipe);
        let nutrition_prompt = format!("{}{}{}", NUTRITION_PROMPT, recipe, NUTRITION_SUFFIX);

        let (time_reply, steps_reply, nutrition_reply) = if self.config.parallel_requests {
            tokio::join!(
                llm.send_prompt(&time_prompt),
                llm.send_prompt(&steps_prompt),
                llm.send_prompt(&nutrition_prompt),
            )
        } else {
            let time_reply = llm.send_prompt(&time_prompt).await;
            let steps_reply = llm.send_prompt(&steps_prompt).await;
            let nutrition_reply = llm.send_prompt(&nutrition_prompt).await;
            (time_reply, steps_reply, nutrition_reply)
        };

        let used_fallback = !matches!(&time_reply, Ok(text) if extract_minutes(text).is_some());
        let minutes = minutes_or_fallback(time_reply, self.config.fallback_minutes);
        let steps = steps_reply
            .context("Failed to get step-by-step instructions")?
            .trim()
            .to_string();
        let nutrition = nutrition_reply
            .context("Failed to get a nutrition estimate")?
            .trim()
            .to_string();

        let label = derive_label(recipe, self.config.label_max_chars);
        info!("Analysed '{}': {} min", label, minutes);

        let _ = self
            .emit_event(Event::RecipeAnalyzed {
                label: label.clone(),
                minutes,
                used_fallback,
            })
            .await;

        Ok(RecipeAnalysis {
            label,
            minutes,
            used_fallback,
            steps,
            nutrition,
        })
    }
}

impl_event_emitter!(RecipeAnalyzer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_manager::testing::ScriptedProvider;

    const RECIPE: &str = "Spaghetti with garlic, olive oil and chili. Boil pasta. Toss.";

    fn script() -> ScriptedProvider {
        ScriptedProvider::new()
            .reply(STEPS_PROMPT, "1. Boil pasta (10 min)\n\n2. Toss with oil (2 min)\n")
            .reply(NUTRITION_PROMPT, "Calories: 520 kcal\nProtein: 14 g")
    }

    #[tokio::test]
    async fn test_analyze_collects_all_three_answers() {
        let (llm, prompts) = script()
            .reply(COOKING_TIME_PROMPT, "About 15 minutes")
            .into_manager();

        let analysis = RecipeAnalyzer::new(AnalysisConfig::default())
            .analyze(&llm, RECIPE)
            .await
            .unwrap();

        assert_eq!(analysis.label, "🍳 Spaghetti...");
        assert_eq!(analysis.minutes, 15);
        assert!(!analysis.used_fallback);
        assert_eq!(analysis.duration_secs(), 900.0);
        assert_eq!(analysis.steps, "1. Boil pasta (10 min)\n\n2. Toss with oil (2 min)");
        assert_eq!(analysis.nutrition, "Calories: 520 kcal\nProtein: 14 g");

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().any(|p| p.ends_with("Include calories, protein, carbs, fats.")));
    }

    #[tokio::test]
    async fn test_time_failure_uses_fallback() {
        let (llm, _) = script().fail(COOKING_TIME_PROMPT, "timeout").into_manager();
        let config = AnalysisConfig {
            parallel_requests: false,
            ..AnalysisConfig::default()
        };

        let analysis = RecipeAnalyzer::new(config).analyze(&llm, RECIPE).await.unwrap();
        assert_eq!(analysis.minutes, 10);
        assert!(analysis.used_fallback);
    }

    #[tokio::test]
    async fn test_steps_failure_fails_analysis() {
        let (llm, _) = ScriptedProvider::new()
            .reply(COOKING_TIME_PROMPT, "20")
            .fail(STEPS_PROMPT, "quota exceeded")
            .reply(NUTRITION_PROMPT, "Calories: 100")
            .into_manager();

        let err = RecipeAnalyzer::new(AnalysisConfig::default())
            .analyze(&llm, RECIPE)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("quota exceeded"));
    }

    #[test]
    fn test_derive_label_truncates_first_word() {
        assert_eq!(derive_label("Pasta carbonara", 15), "🍳 Pasta...");
        assert_eq!(
            derive_label("Supercalifragilisticexpialidocious stew", 15),
            "🍳 Supercalifragil..."
        );
        assert_eq!(derive_label("Crème brûlée", 3), "🍳 Crè...");
    }

    #[test]
    fn test_instruction_steps_keep_line_numbers() {
        let steps = instruction_steps("1. Boil water\n\n2. Add pasta\n   \n3. Drain");
        assert_eq!(
            steps,
            vec![
                InstructionStep { number: 1, text: "1. Boil water".to_string() },
                InstructionStep { number: 3, text: "2. Add pasta".to_string() },
                InstructionStep { number: 5, text: "3. Drain".to_string() },
            ]
        );
    }
}
