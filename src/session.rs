use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, TimeDelta};
use log::{debug, info};
use thiserror::Error;
use uuid::Uuid;

use crate::analyzer::{InstructionStep, RecipeAnalysis, RecipeAnalyzer, instruction_steps};
use crate::chat::{ChatDispatcher, ChatMode, ChatTranscript, QuickPrompt};
use crate::clock::Clock;
use crate::config::Config;
use crate::event_bus::{Event, EventBus, EventEmitter, Metrics};
use crate::impl_event_emitter;
use crate::llm_manager::LLMManager;
use crate::nutrition::{NutritionChart, NutritionError, parse_nutrition, parse_nutrition_lenient};
use crate::presets::{Preset, find_preset};
use crate::timer::{
    CompletionLogEntry, Countdown, TimerError, TimerOrigin, TimerRecord, TimerRegistry, TimerState,
    format_clock,
};

const MAX_MANUAL_SECONDS: u32 = 59;

/// Errors surfaced to the user by a session handler.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please enter a recipe.")]
    EmptyRecipe,

    #[error("Please type a message or pick a quick prompt.")]
    EmptyMessage,

    #[error("Please give the timer a label.")]
    EmptyLabel,

    #[error("{field} must be between 0 and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("No preset matches '{0}'")]
    UnknownPreset(String),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Nutrition(#[from] NutritionError),

    /// An LLM request whose text we need (steps, nutrition, chat) failed.
    #[error("{0:#}")]
    Generation(anyhow::Error),
}

/// Render-ready projection of one active timer.
#[derive(Debug, Clone)]
pub struct TimerView {
    pub label: String,
    pub state: TimerState,
    pub remaining_secs: f64,
    pub progress: f64,
    pub clock: String,
    pub has_steps: bool,
    pub has_nutrition: bool,
}

impl From<&TimerRecord> for TimerView {
    fn from(timer: &TimerRecord) -> Self {
        Self {
            label: timer.label.clone(),
            state: timer.state(),
            remaining_secs: timer.remaining_secs(),
            progress: timer.progress(),
            clock: format_clock(timer.remaining_secs()),
            has_steps: !timer.steps.is_empty(),
            has_nutrition: !timer.nutrition.is_empty(),
        }
    }
}

/// Output of one render pass.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub timers: Vec<TimerView>,
    /// Timers that reached zero during this pass.
    pub newly_completed: Vec<CompletionLogEntry>,
}

/// Chartable nutrition for one timer plus any lines that could not be read.
#[derive(Debug)]
pub struct NutritionBreakdown {
    pub chart: NutritionChart,
    pub skipped: Vec<NutritionError>,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub duration: TimeDelta,
    pub timers_completed: usize,
    pub timers_abandoned: usize,
    pub chat_turns: usize,
    pub metrics: Metrics,
}

/// All state belonging to one user's cooking session.
///
/// Every user intent is a method here. The host calls [`render_pass`]
/// after each intent and on its own render cadence; countdowns only move
/// when it does.
///
/// [`render_pass`]: CookingSession::render_pass
pub struct CookingSession {
    id: Uuid,
    started_at: DateTime<Local>,
    config: Arc<Config>,
    llm: Arc<LLMManager>,
    clock: Arc<dyn Clock>,
    analyzer: RecipeAnalyzer,
    dispatcher: ChatDispatcher,
    timers: TimerRegistry,
    transcript: ChatTranscript,
    recipe_input: String,
    steps_output: String,
    chat_mode: ChatMode,
    trigger_prompt: Option<QuickPrompt>,
    event_bus: Option<Arc<EventBus>>,
}

impl CookingSession {
    pub async fn start(
        config: Arc<Config>,
        llm: Arc<LLMManager>,
        clock: Arc<dyn Clock>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: clock.now(),
            analyzer: RecipeAnalyzer::new(config.analysis.clone()).with_event_bus(event_bus.clone()),
            dispatcher: ChatDispatcher::new().with_event_bus(event_bus.clone()),
            config,
            llm,
            clock,
            timers: TimerRegistry::new(),
            transcript: ChatTranscript::new(),
            recipe_input: String::new(),
            steps_output: String::new(),
            chat_mode: ChatMode::RecipeIdeas,
            trigger_prompt: None,
            event_bus: Some(event_bus),
        };

        info!("Session {} started", session.id);
        let _ = session
            .emit_event(Event::SessionStarted {
                session_id: session.id.to_string(),
            })
            .await;
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cadence at which the host should re-render while timers run.
    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.config.session.render_interval_ms)
    }

    pub fn recipe_input(&self) -> &str {
        &self.recipe_input
    }

    pub fn set_recipe_input(&mut self, text: &str) {
        self.recipe_input = text.to_string();
    }

    /// Load a preset into the recipe input and clear the previous steps.
    pub async fn select_preset(&mut self, query: &str) -> Result<&'static Preset, SessionError> {
        let preset =
            find_preset(query).ok_or_else(|| SessionError::UnknownPreset(query.to_string()))?;
        self.recipe_input = preset.recipe.to_string();
        self.steps_output.clear();
        let _ = self
            .emit_event(Event::PresetSelected {
                name: preset.name.to_string(),
            })
            .await;
        Ok(preset)
    }

    /// Analyse `text` (or the current recipe input) and add a timer for it.
    pub async fn analyze_recipe(&mut self, text: Option<&str>) -> Result<RecipeAnalysis, SessionError> {
        if let Some(text) = text {
            self.recipe_input = text.to_string();
        }
        if self.recipe_input.trim().is_empty() {
            return Err(SessionError::EmptyRecipe);
        }

        let analysis = self
            .analyzer
            .analyze(&self.llm, &self.recipe_input)
            .await
            .map_err(SessionError::Generation)?;

        self.timers.add(
            &analysis.label,
            analysis.duration_secs(),
            &analysis.steps,
            &analysis.nutrition,
            TimerOrigin::Analysis,
        )?;
        self.steps_output = analysis.steps.clone();

        let _ = self
            .emit_event(Event::TimerAdded {
                label: analysis.label.clone(),
                duration_secs: analysis.duration_secs(),
                from_analysis: true,
            })
            .await;
        Ok(analysis)
    }

    pub async fn add_manual_timer(
        &mut self,
        label: &str,
        minutes: u32,
        seconds: u32,
    ) -> Result<(), SessionError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(SessionError::EmptyLabel);
        }
        let max_minutes = self.config.session.max_manual_minutes;
        if minutes > max_minutes {
            return Err(SessionError::OutOfRange {
                field: "Minutes",
                value: minutes,
                max: max_minutes,
            });
        }
        if seconds > MAX_MANUAL_SECONDS {
            return Err(SessionError::OutOfRange {
                field: "Seconds",
                value: seconds,
                max: MAX_MANUAL_SECONDS,
            });
        }

        let total = f64::from(minutes) * 60.0 + f64::from(seconds);
        self.timers.add(label, total, "", "", TimerOrigin::Manual)?;
        let _ = self
            .emit_event(Event::TimerAdded {
                label: label.to_string(),
                duration_secs: total,
                from_analysis: false,
            })
            .await;
        Ok(())
    }

    pub async fn start_timer(&mut self, label: &str) -> Result<(), SessionError> {
        self.timers.start(label, self.clock.now())?;
        let _ = self
            .emit_event(Event::TimerStarted {
                label: label.to_string(),
            })
            .await;
        Ok(())
    }

    pub async fn pause_timer(&mut self, label: &str) -> Result<Countdown, SessionError> {
        let outcome = self.timers.pause(label, self.clock.now())?;
        let event = match &outcome {
            Countdown::Completed(entry) => Event::TimerCompleted {
                label: entry.label.clone(),
            },
            Countdown::Remaining(remaining) | Countdown::Stopped { remaining_secs: remaining } => {
                Event::TimerPaused {
                    label: label.to_string(),
                    remaining_secs: *remaining,
                }
            }
        };
        let _ = self.emit_event(event).await;
        Ok(outcome)
    }

    pub async fn resume_timer(&mut self, label: &str) -> Result<(), SessionError> {
        self.timers.resume(label, self.clock.now())?;
        let _ = self
            .emit_event(Event::TimerResumed {
                label: label.to_string(),
            })
            .await;
        Ok(())
    }

    /// Cancel a timer without logging it as completed.
    pub async fn stop_timer(&mut self, label: &str) -> Result<TimerRecord, SessionError> {
        let removed = self.timers.stop(label)?;
        info!(
            "Timer '{}' stopped with {} of {} left",
            label,
            format_clock(removed.remaining_secs()),
            format_clock(removed.duration_secs())
        );
        let _ = self
            .emit_event(Event::TimerStopped {
                label: label.to_string(),
            })
            .await;
        Ok(removed)
    }

    pub fn chat_mode(&self) -> ChatMode {
        self.chat_mode
    }

    pub fn set_chat_mode(&mut self, mode: ChatMode) {
        self.chat_mode = mode;
    }

    /// Queue a canned question; the next empty chat send uses it.
    pub fn queue_quick_prompt(&mut self, prompt: QuickPrompt) {
        debug!("Queued quick prompt {:?}", prompt);
        self.trigger_prompt = Some(prompt);
    }

    pub fn pending_quick_prompt(&self) -> Option<QuickPrompt> {
        self.trigger_prompt
    }

    /// Send a chat message in `mode`. Empty `text` falls back to a queued
    /// quick prompt, which is cleared once answered.
    pub async fn send_chat(&mut self, mode: ChatMode, text: &str) -> Result<String, SessionError> {
        let text = text.trim();
        let message = if !text.is_empty() {
            text.to_string()
        } else if let Some(prompt) = self.trigger_prompt {
            prompt.text().to_string()
        } else {
            return Err(SessionError::EmptyMessage);
        };

        self.chat_mode = mode;
        let reply = self
            .dispatcher
            .dispatch(&mut self.transcript, &self.llm, mode, &message)
            .await
            .map_err(SessionError::Generation)?;
        self.trigger_prompt = None;
        Ok(reply)
    }

    /// Tick every running timer against the clock and project the result.
    pub async fn render_pass(&mut self) -> RenderFrame {
        let newly_completed = self.timers.tick_all(self.clock.now());
        for entry in &newly_completed {
            info!("Timer '{}' is done", entry.label);
            let _ = self
                .emit_event(Event::TimerCompleted {
                    label: entry.label.clone(),
                })
                .await;
        }
        RenderFrame {
            timers: self.timer_views(),
            newly_completed,
        }
    }

    pub fn timer_views(&self) -> Vec<TimerView> {
        self.timers.iter().map(TimerView::from).collect()
    }

    pub fn has_running_timers(&self) -> bool {
        self.timers.any_running()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn completion_log(&self) -> &[CompletionLogEntry] {
        self.timers.completion_log()
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    /// Steps from the latest analysis.
    pub fn instruction_steps(&self) -> Vec<InstructionStep> {
        instruction_steps(&self.steps_output)
    }

    /// Steps stored with a particular timer.
    pub fn timer_steps(&self, label: &str) -> Option<Vec<InstructionStep>> {
        self.timers.get(label).map(|t| instruction_steps(&t.steps))
    }

    /// Parse a timer's nutrition text fresh, skipping unreadable lines.
    pub fn nutrition_for(&self, label: &str) -> Option<NutritionBreakdown> {
        let timer = self.timers.get(label)?;
        let (slices, skipped) = parse_nutrition_lenient(&timer.nutrition);
        Some(NutritionBreakdown {
            chart: NutritionChart::new(slices),
            skipped,
        })
    }

    /// Parse a timer's nutrition text, failing on the first unreadable line.
    pub fn nutrition_strict(&self, label: &str) -> Result<NutritionChart, SessionError> {
        let timer = self
            .timers
            .get(label)
            .ok_or_else(|| TimerError::NotFound(label.to_string()))?;
        Ok(NutritionChart::new(parse_nutrition(&timer.nutrition)?))
    }

    pub async fn metrics(&self) -> Metrics {
        match &self.event_bus {
            Some(bus) => bus.get_metrics().await,
            None => Metrics::default(),
        }
    }

    /// Tear the session down. Active timers are dropped.
    pub async fn end(self) -> SessionSummary {
        let summary = SessionSummary {
            id: self.id,
            duration: self.clock.now() - self.started_at,
            timers_completed: self.timers.completion_log().len(),
            timers_abandoned: self.timers.len(),
            chat_turns: self.transcript.len(),
            metrics: self.metrics().await,
        };

        let _ = self
            .emit_event(Event::SessionEnded {
                session_id: self.id.to_string(),
                timers_completed: summary.timers_completed,
                chat_turns: summary.chat_turns,
            })
            .await;
        info!("Session {} ended", self.id);
        summary
    }
}

impl_event_emitter!(CookingSession);
