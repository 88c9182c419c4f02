//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`SubscriptionEvent`]s.
//! It is shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use parley_core::notification::NotificationKind;
use parley_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// SubscriptionEvent
// ---------------------------------------------------------------------------

/// A notice about a project's subscription or usage.
///
/// Constructed via [`SubscriptionEvent::new`] and enriched with
/// [`with_dedup_hours`](SubscriptionEvent::with_dedup_hours) and
/// [`with_payload`](SubscriptionEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    /// Internal project id.
    pub project_id: DbId,

    /// Public project id, carried for outbound delivery.
    pub project_external_id: String,

    pub kind: NotificationKind,

    /// Log message stored in the notification record.
    pub message: String,

    /// When set, the notice is dropped if one of the same kind was logged
    /// for the project within this many hours.
    pub dedup_hours: Option<i64>,

    /// Free-form JSON payload carrying kind-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl SubscriptionEvent {
    pub fn new(
        project_id: DbId,
        project_external_id: impl Into<String>,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            project_external_id: project_external_id.into(),
            kind,
            message: message.into(),
            dedup_hours: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Suppress the notice if an identical kind was logged recently.
    pub fn with_dedup_hours(mut self, hours: i64) -> Self {
        self.dedup_hours = Some(hours);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use parley_core::notification::NotificationKind;
/// use parley_events::bus::{EventBus, SubscriptionEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SubscriptionEvent::new(1, "proj_1", NotificationKind::Test, "hello"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SubscriptionEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: SubscriptionEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SubscriptionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
