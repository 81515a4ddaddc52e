//! Event sink: fire-and-forget dispatch of side effects.
//!
//! The engine publishes named events after its primary transaction has
//! committed; external listeners (notifications, SLA scheduling, room
//! creation) consume them. Publishing is best-effort — a failed publish
//! is logged and counted, never surfaced to the caller, and never rolls
//! back the committed mutation.
//!
//! Payloads always carry the tenant id explicitly. Consumers run outside
//! the request's scope and must not rely on any ambient context.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A published event: name plus JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Publish failure. Carried to the dispatch site, logged there, and
/// dropped — see module docs.
#[derive(Debug, thiserror::Error)]
#[error("event publish failed: {0}")]
pub struct PublishError(pub String);

/// Something that accepts events. Implementations must not block the
/// caller; delivery guarantees are theirs to define (the engine assumes
/// none).
pub trait EventSink: Send + Sync {
    fn publish(&self, name: &str, payload: serde_json::Value) -> Result<(), PublishError>;
}

/// Discards everything. Useful when no listener is wired up.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _name: &str, _payload: serde_json::Value) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Hands events to an in-process consumer over an unbounded channel.
/// Send never blocks; a dropped receiver turns into a publish error at
/// the dispatch site.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, name: &str, payload: serde_json::Value) -> Result<(), PublishError> {
        self.tx
            .send(OutboundEvent {
                name: name.to_string(),
                payload,
            })
            .map_err(|_| PublishError("event channel closed".into()))
    }
}

/// Test sink that records everything published.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<OutboundEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, name: &str, payload: serde_json::Value) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(OutboundEvent {
            name: name.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Test sink that always fails, for exercising the log-and-continue path.
pub struct FailingSink;

impl EventSink for FailingSink {
    fn publish(&self, _name: &str, _payload: serde_json::Value) -> Result<(), PublishError> {
        Err(PublishError("sink unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.publish("case.notify.client", json!({"case_id": "a"}))
            .unwrap();
        sink.publish("case.notify.assignee", json!({"case_id": "a"}))
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().name, "case.notify.client");
        assert_eq!(rx.try_recv().unwrap().name, "case.notify.assignee");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_errors_after_receiver_drops() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(sink.publish("case.notify.client", json!({})).is_err());
    }

    #[test]
    fn recording_sink_captures_payloads() {
        let sink = RecordingSink::new();
        sink.publish("case.assigned", json!({"worker_id": "w"}))
            .unwrap();
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["worker_id"], "w");
    }
}
