use std::fmt;

use chrono::{DateTime, Local};
use log::debug;
use serde::Serialize;
use thiserror::Error;

/// Lifecycle state of a single countdown.
///
/// Completed timers are not represented here: on reaching zero a record leaves
/// the registry and a [`CompletionLogEntry`] takes its place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerState {
    Idle,
    Running { started_at: DateTime<Local> },
    Paused,
}

impl TimerState {
    pub fn name(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running { .. } => "running",
            TimerState::Paused => "paused",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which flow created a timer. Decides how a duplicate label is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOrigin {
    /// User typed a label; duplicates are rejected.
    Manual,
    /// Derived from a recipe analysis; duplicates overwrite.
    Analysis,
}

#[derive(Debug, Error, PartialEq)]
pub enum TimerError {
    #[error("a timer labelled '{0}' already exists")]
    LabelExists(String),

    #[error("no timer labelled '{0}'")]
    NotFound(String),

    #[error("cannot {action} timer '{label}' while it is {state}")]
    InvalidTransition {
        label: String,
        action: &'static str,
        state: &'static str,
    },

    #[error("invalid timer duration: {0} seconds")]
    InvalidDuration(f64),
}

/// One dish's countdown.
#[derive(Debug, Clone)]
pub struct TimerRecord {
    pub label: String,
    duration_secs: f64,
    remaining_secs: f64,
    state: TimerState,
    pub steps: String,
    pub nutrition: String,
}

impl TimerRecord {
    fn new(label: String, duration_secs: f64, steps: String, nutrition: String) -> Self {
        Self {
            label,
            duration_secs,
            remaining_secs: duration_secs,
            state: TimerState::Idle,
            steps,
            nutrition,
        }
    }

    /// Planned duration. After a pause this is the frozen remaining time.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining_secs
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, TimerState::Paused)
    }

    /// Fraction of the current duration already elapsed, in `0.0..=1.0`.
    /// A zero-length timer counts as complete.
    pub fn progress(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 1.0;
        }
        ((self.duration_secs - self.remaining_secs) / self.duration_secs).clamp(0.0, 1.0)
    }

    /// Recompute `remaining_secs` from the start instant. No-op unless running.
    fn refresh(&mut self, now: DateTime<Local>) {
        if let TimerState::Running { started_at } = self.state {
            self.remaining_secs = (self.duration_secs - elapsed_secs(started_at, now)).max(0.0);
        }
    }

    fn transition_error(&self, action: &'static str) -> TimerError {
        TimerError::InvalidTransition {
            label: self.label.clone(),
            action,
            state: self.state.name(),
        }
    }
}

fn elapsed_secs(since: DateTime<Local>, now: DateTime<Local>) -> f64 {
    let elapsed = (now - since).num_milliseconds() as f64 / 1000.0;
    elapsed.max(0.0)
}

/// A timer that ran down to zero on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionLogEntry {
    pub label: String,
    pub completed_at: DateTime<Local>,
}

/// Result of recomputing one timer's countdown.
#[derive(Debug, Clone, PartialEq)]
pub enum Countdown {
    /// Timer is not running; nothing was recomputed.
    Stopped { remaining_secs: f64 },
    /// Timer is still counting (or was just frozen by a pause).
    Remaining(f64),
    /// Timer reached zero and moved to the completion log.
    Completed(CompletionLogEntry),
}

/// Active timers in display order plus the append-only completion log.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: Vec<TimerRecord>,
    completed: Vec<CompletionLogEntry>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        label: &str,
        duration_secs: f64,
        steps: &str,
        nutrition: &str,
        origin: TimerOrigin,
    ) -> Result<(), TimerError> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(TimerError::InvalidDuration(duration_secs));
        }

        let record = TimerRecord::new(
            label.to_string(),
            duration_secs,
            steps.to_string(),
            nutrition.to_string(),
        );

        match (self.position(label), origin) {
            (Some(_), TimerOrigin::Manual) => Err(TimerError::LabelExists(label.to_string())),
            (Some(index), TimerOrigin::Analysis) => {
                debug!("Replacing timer '{}'", label);
                self.timers[index] = record;
                Ok(())
            }
            (None, _) => {
                debug!("Adding timer '{}' ({}s)", label, duration_secs);
                self.timers.push(record);
                Ok(())
            }
        }
    }

    /// Start an idle or paused timer.
    pub fn start(&mut self, label: &str, now: DateTime<Local>) -> Result<(), TimerError> {
        let timer = self.get_mut(label)?;
        match timer.state {
            TimerState::Idle | TimerState::Paused => {
                timer.state = TimerState::Running { started_at: now };
                debug!("Timer '{}' running from {:.1}s", label, timer.duration_secs);
                Ok(())
            }
            TimerState::Running { .. } => Err(timer.transition_error("start")),
        }
    }

    /// Resume a paused timer from its frozen remaining time.
    pub fn resume(&mut self, label: &str, now: DateTime<Local>) -> Result<(), TimerError> {
        let timer = self.get_mut(label)?;
        if !timer.is_paused() {
            return Err(timer.transition_error("resume"));
        }
        self.start(label, now)
    }

    /// Pause a running timer.
    ///
    /// The remaining time is recomputed one last time and becomes the new
    /// duration. If it has already run out the timer completes instead.
    pub fn pause(&mut self, label: &str, now: DateTime<Local>) -> Result<Countdown, TimerError> {
        let timer = self.get_mut(label)?;
        if !timer.is_running() {
            return Err(timer.transition_error("pause"));
        }

        if let Countdown::Completed(entry) = self.tick(label, now)? {
            return Ok(Countdown::Completed(entry));
        }

        let timer = self.get_mut(label)?;
        timer.duration_secs = timer.remaining_secs;
        timer.state = TimerState::Paused;
        debug!("Timer '{}' paused at {:.1}s", label, timer.remaining_secs);
        Ok(Countdown::Remaining(timer.remaining_secs))
    }

    /// Recompute one timer. A running timer that reaches zero is logged and
    /// removed; calling this on a non-running timer changes nothing.
    pub fn tick(&mut self, label: &str, now: DateTime<Local>) -> Result<Countdown, TimerError> {
        let index = self
            .position(label)
            .ok_or_else(|| TimerError::NotFound(label.to_string()))?;

        let timer = &mut self.timers[index];
        if !timer.is_running() {
            return Ok(Countdown::Stopped {
                remaining_secs: timer.remaining_secs,
            });
        }

        timer.refresh(now);
        if timer.remaining_secs > 0.0 {
            return Ok(Countdown::Remaining(timer.remaining_secs));
        }

        let timer = self.timers.remove(index);
        let entry = CompletionLogEntry {
            label: timer.label,
            completed_at: now,
        };
        debug!("Timer '{}' completed", entry.label);
        self.completed.push(entry.clone());
        Ok(Countdown::Completed(entry))
    }

    /// One render pass: tick every running timer in display order and return
    /// the entries that completed during this pass.
    pub fn tick_all(&mut self, now: DateTime<Local>) -> Vec<CompletionLogEntry> {
        let running: Vec<String> = self
            .timers
            .iter()
            .filter(|t| t.is_running())
            .map(|t| t.label.clone())
            .collect();

        let mut finished = Vec::new();
        for label in running {
            if let Ok(Countdown::Completed(entry)) = self.tick(&label, now) {
                finished.push(entry);
            }
        }
        finished
    }

    /// Cancel a timer. Nothing is written to the completion log.
    pub fn stop(&mut self, label: &str) -> Result<TimerRecord, TimerError> {
        let index = self
            .position(label)
            .ok_or_else(|| TimerError::NotFound(label.to_string()))?;
        debug!("Timer '{}' stopped", label);
        Ok(self.timers.remove(index))
    }

    pub fn get(&self, label: &str) -> Option<&TimerRecord> {
        self.timers.iter().find(|t| t.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimerRecord> {
        self.timers.iter()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn any_running(&self) -> bool {
        self.timers.iter().any(|t| t.is_running())
    }

    pub fn completion_log(&self) -> &[CompletionLogEntry] {
        &self.completed
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.timers.iter().position(|t| t.label == label)
    }

    fn get_mut(&mut self, label: &str) -> Result<&mut TimerRecord, TimerError> {
        self.timers
            .iter_mut()
            .find(|t| t.label == label)
            .ok_or_else(|| TimerError::NotFound(label.to_string()))
    }
}

/// Render seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: f64) -> String {
    let secs = secs.max(0.0);
    let minutes = (secs / 60.0).floor() as u64;
    let seconds = (secs % 60.0).floor() as u64;
    format!("{:02}:{:02}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn at(base: DateTime<Local>, secs: f64) -> DateTime<Local> {
        base + TimeDelta::milliseconds((secs * 1000.0) as i64)
    }

    fn assert_single_state(registry: &TimerRegistry) {
        for timer in registry.iter() {
            assert!(!(timer.is_running() && timer.is_paused()));
        }
    }

    #[test]
    fn test_manual_timer_runs_to_completion() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Rice", 30.0, "", "", TimerOrigin::Manual).unwrap();
        registry.start("Rice", t0).unwrap();

        assert_eq!(
            registry.tick("Rice", at(t0, 10.0)).unwrap(),
            Countdown::Remaining(20.0)
        );

        let finished = registry.tick_all(at(t0, 30.0));
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].label, "Rice");
        assert!(registry.get("Rice").is_none());
        assert_eq!(registry.completion_log().len(), 1);

        // Level trigger fires once: later passes see nothing.
        assert!(registry.tick_all(at(t0, 40.0)).is_empty());
        assert_eq!(registry.completion_log().len(), 1);
    }

    #[test]
    fn test_duplicate_manual_label_rejected() {
        let mut registry = TimerRegistry::new();
        registry.add("Rice", 30.0, "", "", TimerOrigin::Manual).unwrap();
        let err = registry
            .add("Rice", 90.0, "", "", TimerOrigin::Manual)
            .unwrap_err();
        assert_eq!(err, TimerError::LabelExists("Rice".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Rice").unwrap().duration_secs(), 30.0);
    }

    #[test]
    fn test_analysis_label_overwrites_in_place() {
        let mut registry = TimerRegistry::new();
        registry.add("Soup", 60.0, "", "", TimerOrigin::Analysis).unwrap();
        registry.add("Rice", 30.0, "", "", TimerOrigin::Manual).unwrap();
        registry
            .add("Soup", 600.0, "1. Boil", "Calories: 100", TimerOrigin::Analysis)
            .unwrap();

        let labels: Vec<&str> = registry.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Soup", "Rice"]);
        let soup = registry.get("Soup").unwrap();
        assert_eq!(soup.duration_secs(), 600.0);
        assert_eq!(soup.steps, "1. Boil");
    }

    #[test]
    fn test_pause_then_resume_keeps_remaining() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Pasta", 600.0, "", "", TimerOrigin::Manual).unwrap();
        registry.start("Pasta", t0).unwrap();

        let paused = registry.pause("Pasta", at(t0, 100.0)).unwrap();
        assert_eq!(paused, Countdown::Remaining(500.0));
        let pasta = registry.get("Pasta").unwrap();
        assert!(pasta.is_paused());
        assert_eq!(pasta.duration_secs(), 500.0);

        // Time spent paused does not count.
        registry.resume("Pasta", at(t0, 1000.0)).unwrap();
        assert_eq!(
            registry.tick("Pasta", at(t0, 1050.0)).unwrap(),
            Countdown::Remaining(450.0)
        );
        assert_single_state(&registry);
    }

    #[test]
    fn test_tick_is_idempotent_when_not_running() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Eggs", 300.0, "", "", TimerOrigin::Manual).unwrap();

        for offset in [0.0, 50.0, 5000.0] {
            assert_eq!(
                registry.tick("Eggs", at(t0, offset)).unwrap(),
                Countdown::Stopped { remaining_secs: 300.0 }
            );
        }

        registry.start("Eggs", t0).unwrap();
        registry.pause("Eggs", at(t0, 60.0)).unwrap();
        for offset in [61.0, 500.0] {
            assert_eq!(
                registry.tick("Eggs", at(t0, offset)).unwrap(),
                Countdown::Stopped { remaining_secs: 240.0 }
            );
        }
    }

    #[test]
    fn test_invalid_transitions_leave_state_intact() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Tea", 120.0, "", "", TimerOrigin::Manual).unwrap();

        assert!(matches!(
            registry.pause("Tea", t0),
            Err(TimerError::InvalidTransition { action: "pause", state: "idle", .. })
        ));
        assert!(matches!(
            registry.resume("Tea", t0),
            Err(TimerError::InvalidTransition { action: "resume", .. })
        ));

        registry.start("Tea", t0).unwrap();
        assert!(matches!(
            registry.start("Tea", at(t0, 5.0)),
            Err(TimerError::InvalidTransition { action: "start", state: "running", .. })
        ));

        registry.pause("Tea", at(t0, 20.0)).unwrap();
        assert!(matches!(
            registry.pause("Tea", at(t0, 30.0)),
            Err(TimerError::InvalidTransition { state: "paused", .. })
        ));
        assert_eq!(registry.get("Tea").unwrap().remaining_secs(), 100.0);
        assert_single_state(&registry);
    }

    #[test]
    fn test_start_from_paused_is_allowed() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Bread", 100.0, "", "", TimerOrigin::Manual).unwrap();
        registry.start("Bread", t0).unwrap();
        registry.pause("Bread", at(t0, 40.0)).unwrap();
        registry.start("Bread", at(t0, 50.0)).unwrap();
        assert!(registry.get("Bread").unwrap().is_running());
        assert_single_state(&registry);
    }

    #[test]
    fn test_pause_after_expiry_completes() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Toast", 5.0, "", "", TimerOrigin::Manual).unwrap();
        registry.start("Toast", t0).unwrap();

        let outcome = registry.pause("Toast", at(t0, 9.0)).unwrap();
        assert!(matches!(outcome, Countdown::Completed(_)));
        assert!(registry.is_empty());
        assert_eq!(registry.completion_log()[0].label, "Toast");
    }

    #[test]
    fn test_stop_does_not_log_completion() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Rice", 30.0, "", "", TimerOrigin::Manual).unwrap();
        registry.start("Rice", t0).unwrap();

        let removed = registry.stop("Rice").unwrap();
        assert_eq!(removed.label, "Rice");
        assert!(registry.is_empty());
        assert!(registry.completion_log().is_empty());
        assert_eq!(
            registry.stop("Rice").unwrap_err(),
            TimerError::NotFound("Rice".to_string())
        );
    }

    #[test]
    fn test_zero_duration_timer() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Instant", 0.0, "", "", TimerOrigin::Manual).unwrap();
        assert_eq!(registry.get("Instant").unwrap().progress(), 1.0);

        registry.start("Instant", t0).unwrap();
        assert_eq!(registry.tick_all(t0).len(), 1);
    }

    #[test]
    fn test_rejects_negative_duration() {
        let mut registry = TimerRegistry::new();
        assert_eq!(
            registry.add("Bad", -1.0, "", "", TimerOrigin::Manual),
            Err(TimerError::InvalidDuration(-1.0))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_progress_fraction() {
        let t0 = Local::now();
        let mut registry = TimerRegistry::new();
        registry.add("Stew", 200.0, "", "", TimerOrigin::Manual).unwrap();
        assert_eq!(registry.get("Stew").unwrap().progress(), 0.0);

        registry.start("Stew", t0).unwrap();
        registry.tick("Stew", at(t0, 50.0)).unwrap();
        assert_eq!(registry.get("Stew").unwrap().progress(), 0.25);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(59.9), "00:59");
        assert_eq!(format_clock(90.0), "01:30");
        assert_eq!(format_clock(7265.0), "121:05");
    }
}
