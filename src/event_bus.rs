use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// Events emitted by the session and the LLM layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Session lifecycle
    SessionStarted {
        session_id: String,
    },
    SessionEnded {
        session_id: String,
        timers_completed: usize,
        chat_turns: usize,
    },

    // Timer events
    TimerAdded {
        label: String,
        duration_secs: f64,
        from_analysis: bool,
    },
    TimerStarted {
        label: String,
    },
    TimerPaused {
        label: String,
        remaining_secs: f64,
    },
    TimerResumed {
        label: String,
    },
    TimerStopped {
        label: String,
    },
    TimerCompleted {
        label: String,
    },

    // Recipe and chat events
    RecipeAnalyzed {
        label: String,
        minutes: u64,
        used_fallback: bool,
    },
    PresetSelected {
        name: String,
    },
    ChatTurnRecorded {
        mode: String,
        prompt_len: usize,
        reply_len: usize,
    },

    // API events
    APICallStarted {
        provider: String,
        model: String,
    },
    APICallCompleted {
        provider: String,
        tokens: usize,
        cost: f32,
    },
    APIError {
        provider: String,
        error: String,
    },
}

/// Event bus for component communication
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    metrics: Arc<RwLock<Metrics>>,
}

/// Accumulated metrics from events
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub total_api_calls: usize,
    pub api_errors: usize,
    pub total_tokens: usize,
    pub total_cost: f32,
    pub timers_added: usize,
    pub timers_completed: usize,
    pub recipes_analyzed: usize,
    pub chat_turns: usize,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    /// Subscribe to events
    #[allow(dead_code)]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.update_metrics(&event).await;

        // No receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Get current metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    async fn update_metrics(&self, event: &Event) {
        let mut metrics = self.metrics.write().await;

        match event {
            Event::APICallCompleted { tokens, cost, .. } => {
                metrics.total_api_calls += 1;
                metrics.total_tokens += tokens;
                metrics.total_cost += cost;
            }
            Event::APIError { .. } => {
                metrics.api_errors += 1;
            }
            Event::TimerAdded { .. } => {
                metrics.timers_added += 1;
            }
            Event::TimerCompleted { .. } => {
                metrics.timers_completed += 1;
            }
            Event::RecipeAnalyzed { .. } => {
                metrics.recipes_analyzed += 1;
            }
            Event::ChatTurnRecorded { .. } => {
                // One user turn and one assistant turn
                metrics.chat_turns += 2;
            }
            _ => {}
        }
    }
}

/// Trait for components that can emit events
#[async_trait::async_trait]
pub trait EventEmitter {
    #[allow(dead_code)]
    fn set_event_bus(&mut self, bus: Arc<EventBus>);

    async fn emit_event(&self, event: Event) -> Result<()>;
}

/// Helper macro to implement EventEmitter trait
#[macro_export]
macro_rules! impl_event_emitter {
    ($type:ty) => {
        #[async_trait::async_trait]
        impl EventEmitter for $type {
            fn set_event_bus(&mut self, bus: Arc<EventBus>) {
                self.event_bus = Some(bus);
            }

            async fn emit_event(&self, event: Event) -> Result<()> {
                if let Some(bus) = &self.event_bus {
                    bus.emit(event).await
                } else {
                    Ok(())
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission() {
        let bus = EventBus::new(100);
        let mut receiver = bus.subscribe();

        bus.emit(Event::TimerStarted {
            label: "Rice".to_string(),
        })
        .await
        .unwrap();

        match receiver.recv().await.unwrap() {
            Event::TimerStarted { label } => assert_eq!(label, "Rice"),
            _ => panic!("Wrong event type"),
        }
    }

    #[tokio::test]
    async fn test_metrics_update() {
        let bus = EventBus::new(100);

        bus.emit(Event::APICallCompleted {
            provider: "gemini".to_string(),
            tokens: 100,
            cost: 0.01,
        })
        .await
        .unwrap();
        bus.emit(Event::TimerCompleted {
            label: "Rice".to_string(),
        })
        .await
        .unwrap();
        bus.emit(Event::ChatTurnRecorded {
            mode: "tips".to_string(),
            prompt_len: 10,
            reply_len: 20,
        })
        .await
        .unwrap();

        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_api_calls, 1);
        assert_eq!(metrics.total_tokens, 100);
        assert_eq!(metrics.total_cost, 0.01);
        assert_eq!(metrics.timers_completed, 1);
        assert_eq!(metrics.chat_turns, 2);
    }
}
