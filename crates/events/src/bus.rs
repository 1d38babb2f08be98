//! Event bus abstraction for decoupled event emission.
//!
//! Lets the session and notification subsystems report changes without
//! knowing which host is listening.

use std::sync::{Arc, Mutex, MutexGuard};

/// Sink for topic-addressed JSON events.
pub trait EventBus: Send + Sync {
    /// Emit an event on `topic` (e.g. "session:status_changed").
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

/// Type alias for shared event bus reference.
pub type EventBusRef = Arc<dyn EventBus>;

/// Captures all emitted events for later inspection.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<EmittedEvent>>,
}

/// A captured event from InMemoryEventBus.
#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn captured(&self) -> MutexGuard<'_, Vec<EmittedEvent>> {
        self.events.lock().expect("event bus mutex poisoned")
    }

    pub fn events(&self) -> Vec<EmittedEvent> {
        self.captured().clone()
    }

    /// Events for a specific topic, in emission order.
    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.captured()
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Most recent event on `topic`.
    pub fn last_for(&self, topic: &str) -> Option<EmittedEvent> {
        self.captured().iter().rev().find(|e| e.topic == topic).cloned()
    }

    pub fn clear(&self) {
        self.captured().clear();
    }

    pub fn len(&self) -> usize {
        self.captured().len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured().is_empty()
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.captured().push(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// Discards all events.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: serde_json::Value) {}
}

/// Writes every event to the `tracing` log at debug level.
///
/// Used by headless hosts that have no UI to forward events to.
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        tracing::debug!(topic, %payload, "event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_event_bus() {
        let bus = InMemoryEventBus::new();

        bus.emit("session:status_changed", json!({"to": "unlocked"}));
        bus.emit("notifications:updated", json!({"unread_count": 2}));
        bus.emit("session:status_changed", json!({"to": "locked"}));

        assert_eq!(bus.len(), 3);
        assert_eq!(bus.events_for("session:status_changed").len(), 2);
        assert_eq!(bus.events_for("notifications:updated").len(), 1);
        assert_eq!(bus.events_for("test:missing").len(), 0);
        assert_eq!(
            bus.last_for("session:status_changed").unwrap().payload["to"],
            "locked"
        );
        assert!(bus.last_for("test:missing").is_none());
    }

    #[test]
    fn test_in_memory_event_bus_clear() {
        let bus = InMemoryEventBus::new();

        bus.emit("session:status_changed", json!({}));
        assert!(!bus.is_empty());

        bus.clear();
        assert!(bus.is_empty());
    }

    #[test]
    fn test_null_and_tracing_buses_accept_events() {
        NullEventBus.emit("session:status_changed", json!({"data": "ignored"}));
        TracingEventBus.emit("session:status_changed", json!({"data": "logged"}));
    }
}
