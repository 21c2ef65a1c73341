use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::impl_event_emitter;
use crate::llm_manager::LLMManager;

/// What kind of answer the chat assistant should give.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatMode {
    RecipeIdeas,
    CookingTips,
    IngredientSubstitutes,
}

impl ChatMode {
    pub const ALL: [ChatMode; 3] = [
        ChatMode::RecipeIdeas,
        ChatMode::CookingTips,
        ChatMode::IngredientSubstitutes,
    ];

    /// Fixed instruction placed in front of the user's text.
    pub fn template(&self) -> &'static str {
        match self {
            ChatMode::RecipeIdeas => "Suggest a recipe idea based on:",
            ChatMode::CookingTips => "Give a cooking technique or safety tip about:",
            ChatMode::IngredientSubstitutes => "Suggest a substitute for:",
        }
    }

    pub fn prompt(&self, user_text: &str) -> String {
        format!("{} {}", self.template(), user_text)
    }

    /// Accepts the short names used at the prompt (`ideas`, `tips`, `subs`).
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "ideas" | "idea" | "recipe" | "recipes" => Some(ChatMode::RecipeIdeas),
            "tips" | "tip" => Some(ChatMode::CookingTips),
            "subs" | "sub" | "substitute" | "substitutes" => {
                Some(ChatMode::IngredientSubstitutes)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::RecipeIdeas => write!(f, "🍳 Recipe Ideas"),
            ChatMode::CookingTips => write!(f, "🧠 Cooking Tips"),
            ChatMode::IngredientSubstitutes => write!(f, "🥢 Ingredient Substitutes"),
        }
    }
}

/// Canned questions offered as one-click shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickPrompt {
    SuggestDinner,
    ReplaceGarlic,
    HealthySnack,
}

impl QuickPrompt {
    pub const ALL: [QuickPrompt; 3] = [
        QuickPrompt::SuggestDinner,
        QuickPrompt::ReplaceGarlic,
        QuickPrompt::HealthySnack,
    ];

    pub fn text(&self) -> &'static str {
        match self {
            QuickPrompt::SuggestDinner => "What can I make for dinner with rice and tomatoes?",
            QuickPrompt::ReplaceGarlic => "What can I use instead of garlic?",
            QuickPrompt::HealthySnack => "Give me a healthy snack idea under 10 minutes.",
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            QuickPrompt::SuggestDinner => "dinner",
            QuickPrompt::ReplaceGarlic => "garlic",
            QuickPrompt::HealthySnack => "snack",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        let word = word.to_lowercase();
        Self::ALL.into_iter().find(|q| q.keyword() == word)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "User"),
            ChatRole::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Append-only transcript. Turns are only ever added in user/assistant pairs.
#[derive(Debug, Default)]
pub struct ChatTranscript {
    turns: Vec<ChatTurn>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_exchange(&mut self, user: String, assistant: String) {
        self.turns.push(ChatTurn {
            role: ChatRole::User,
            content: user,
        });
        self.turns.push(ChatTurn {
            role: ChatRole::Assistant,
            content: assistant,
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Turns a (mode, text) pair into one LLM call and records the exchange.
pub struct ChatDispatcher {
    event_bus: Option<Arc<EventBus>>,
}

impl ChatDispatcher {
    pub fn new() -> Self {
        Self { event_bus: None }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Ask the model and append the user and assistant turns, in that order.
    ///
    /// A failed call is returned to the caller and leaves the transcript untouched.
    pub async fn dispatch(
        &self,
        transcript: &mut ChatTranscript,
        llm: &LLMManager,
        mode: ChatMode,
        user_text: &str,
    ) -> Result<String> {
        let prompt = mode.prompt(user_text);
        info!("Chat ({:?}): {}", mode, user_text);

        let reply = llm
            .send_prompt(&prompt)
            .await
            .context("The cooking assistant could not answer")?
            .trim()
            .to_string();

        transcript.record_exchange(user_text.to_string(), reply.clone());

        let _ = self
            .emit_event(Event::ChatTurnRecorded {
                mode: format!("{:?}", mode),
                prompt_len: prompt.len(),
                reply_len: reply.len(),
            })
            .await;

        Ok(reply)
    }
}

impl Default for ChatDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl_event_emitter!(ChatDispatcher);
