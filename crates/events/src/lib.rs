//! Shared event contracts for the welfare client core.
//!
//! The session guard and the notification feed publish state changes through
//! an [`EventBus`] so that hosts (console, desktop shell, tests) can observe
//! them without reaching into either subsystem's state.

mod bus;

pub use bus::{EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus, TracingEventBus};

use serde::{Deserialize, Serialize};

/// Emitted after every session state transition.
///
/// Producers: session guard
/// Consumers: host shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusChangedEvent {
    /// Status before the transition (`initializing`, `no_session`, `unlocked`, `locked`).
    pub from: String,
    /// Status after the transition.
    pub to: String,
    /// Username of the identity bound to the session, if any.
    #[serde(default)]
    pub username: Option<String>,
    /// What caused the transition (`probe`, `login`, `idle`, `manual`, `shortcut`, `unlock`, `logout`).
    pub cause: String,
    #[serde(default)]
    pub timestamp_ms: i64,
}

/// Emitted after every successful notification fetch.
///
/// Producers: notification feed
/// Consumers: host shell (badge counters, list views)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsUpdatedEvent {
    /// Unread count as reported by the remote service.
    pub unread_count: u32,
    /// Number of items in the current page.
    pub item_count: usize,
    #[serde(default)]
    pub timestamp_ms: i64,
}

/// Emitted when a polling fetch surfaces items that were not in the previous fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArrivalsEvent {
    pub ids: Vec<String>,
    /// Whether an audible alert was requested for this batch.
    #[serde(default)]
    pub alerted: bool,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Session status transition.
    pub const SESSION_STATUS_CHANGED: &str = "session:status_changed";
    /// Notification summary replaced.
    pub const NOTIFICATIONS_UPDATED: &str = "notifications:updated";
    /// New-arrival delta detected.
    pub const NOTIFICATIONS_NEW_ARRIVALS: &str = "notifications:new_arrivals";
}

/// Serialize `payload` and emit it on `topic`.
///
/// Serialization failures are logged and dropped; events are observational.
pub fn emit_event<T: Serialize>(bus: &dyn EventBus, topic: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => bus.emit(topic, value),
        Err(e) => tracing::warn!(topic, error = %e, "failed to serialize event payload"),
    }
}

/// Milliseconds since the Unix epoch, used to stamp events.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_changed_deserialize_minimal() {
        let json = r#"{"from": "locked", "to": "unlocked", "cause": "unlock"}"#;
        let event: SessionStatusChangedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.to, "unlocked");
        assert_eq!(event.username, None);
        assert_eq!(event.timestamp_ms, 0);
    }

    #[test]
    fn test_emit_event_serializes_payload() {
        let bus = InMemoryEventBus::new();
        emit_event(
            &bus,
            event_names::NOTIFICATIONS_NEW_ARRIVALS,
            &NewArrivalsEvent {
                ids: vec!["4".to_string()],
                alerted: true,
            },
        );

        let events = bus.events_for(event_names::NOTIFICATIONS_NEW_ARRIVALS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["ids"][0], "4");
        assert_eq!(events[0].payload["alerted"], true);
    }
}
