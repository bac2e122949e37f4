use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::id::Snowflake;

/// A lifecycle notification emitted by the command layer.
/// Subscribers observe routing outcomes without being part of dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub payload: serde_json::Value,
}

/// Categories of lifecycle events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An interaction named a command nobody registered
    UnknownApplicationCommand,
    /// A command passed its checks and is about to run
    ApplicationCommandRun,
    /// A command handler returned successfully
    ApplicationCommandCompletion,
    /// A check or handler failed
    ApplicationCommandError,
    /// An autocomplete handler failed or broke its contract
    AutocompleteError,
    /// A registry reconciliation finished
    CommandsSynced,
}

impl Event {
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            interaction_id: None,
            command: None,
            payload,
        }
    }

    pub fn with_interaction(mut self, id: Snowflake) -> Self {
        self.interaction_id = Some(id);
        self
    }

    pub fn with_command(mut self, name: impl Into<String>) -> Self {
        self.command = Some(name.into());
        self
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

/// Publish-subscribe fan-out for lifecycle events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { sender: tx }
    }

    /// Sends an event to every current subscriber. Having no subscribers is not an error.
    pub fn publish(&self, event: Event) {
        debug!(kind = %event.kind, command = ?event.command, "publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(
            EventKind::ApplicationCommandRun,
            serde_json::json!({"surface": "chat_input"}),
        )
        .with_interaction(Snowflake(7))
        .with_command("ping");
        assert_eq!(event.kind, EventKind::ApplicationCommandRun);
        assert_eq!(event.interaction_id, Some(Snowflake(7)));
        assert_eq!(event.command.as_deref(), Some("ping"));
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(EventKind::CommandsSynced, serde_json::json!({"registered": 2}));
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.kind, EventKind::CommandsSynced);
        assert!(deserialized.command.is_none());
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(
            EventKind::UnknownApplicationCommand.to_string(),
            "unknown_application_command"
        );
        assert_eq!(
            EventKind::ApplicationCommandError.to_string(),
            "application_command_error"
        );
    }

    #[tokio::test]
    async fn test_bus_fan_out() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(Event::new(EventKind::AutocompleteError, serde_json::Value::Null));
        assert_eq!(a.recv().await.unwrap().kind, EventKind::AutocompleteError);
        assert_eq!(b.recv().await.unwrap().kind, EventKind::AutocompleteError);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(Event::new(EventKind::ApplicationCommandRun, serde_json::Value::Null));
    }
}
