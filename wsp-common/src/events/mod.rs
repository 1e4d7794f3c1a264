//! Event types for the room event system
//!
//! Provides the published state of a room membership (RoomEvent) and the
//! EventBus that presentation layers subscribe to.

mod queue_types;

pub use queue_types::{EndOutcome, QueueChangeTrigger};

use crate::model::PlaybackState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Room event types
///
/// Emitted by the player core after each transition. Presentation layers
/// (controls, queue view, embedding glue) render from these instead of
/// reaching into the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    /// Local playback state replaced by a new snapshot
    StateChanged {
        state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// Drift exceeded the threshold and the local position was corrected
    Resynced {
        /// Local fraction before the correction
        from_played: f64,
        /// Peer-reported fraction that was adopted
        to_played: f64,
        /// Seconds-equivalent drift that triggered the correction
        drift_secs: f64,
        timestamp: DateTime<Utc>,
    },

    /// Drift exceeded the threshold but a local interaction was in flight
    ResyncSuppressed {
        drift_secs: f64,
        timestamp: DateTime<Utc>,
    },

    /// A new media url was loaded
    MediaLoaded {
        url: String,
        timestamp: DateTime<Utc>,
    },

    /// Queue contents or current index changed
    QueueChanged {
        queue: Vec<String>,
        /// -1 when nothing in the queue is current
        queue_index: i64,
        trigger: QueueChangeTrigger,
        timestamp: DateTime<Utc>,
    },

    /// Media element reached the end of the media
    PlaybackEnded {
        outcome: EndOutcome,
        timestamp: DateTime<Utc>,
    },

    /// Media element reported a playback error
    ///
    /// The core keeps its last good state; retrying is up to the presentation layer.
    MediaError {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Interaction guard window elapsed without re-arm
    GuardExpired { timestamp: DateTime<Utc> },
}

impl RoomEvent {
    /// Event type name, as used for SSE event fields and logs
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::StateChanged { .. } => "StateChanged",
            RoomEvent::Resynced { .. } => "Resynced",
            RoomEvent::ResyncSuppressed { .. } => "ResyncSuppressed",
            RoomEvent::MediaLoaded { .. } => "MediaLoaded",
            RoomEvent::QueueChanged { .. } => "QueueChanged",
            RoomEvent::PlaybackEnded { .. } => "PlaybackEnded",
            RoomEvent::MediaError { .. } => "MediaError",
            RoomEvent::GuardExpired { .. } => "GuardExpired",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Distribution bus for room events
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the session loop)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use wsp_common::events::{EventBus, RoomEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(RoomEvent::GuardExpired {
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(RoomEvent::GuardExpired { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RoomEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: RoomEvent) -> Result<usize, broadcast::error::SendError<RoomEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RoomEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_expired() -> RoomEvent {
        RoomEvent::GuardExpired {
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(16);
        assert_eq!(bus.capacity(), 16);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_fails() {
        let bus = EventBus::new(16);
        assert!(bus.emit(guard_expired()).is_err());
        // Lossy variant swallows it
        bus.emit_lossy(guard_expired());
    }

    #[tokio::test]
    async fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let delivered = bus
            .emit(RoomEvent::MediaLoaded {
                url: "a".to_string(),
                timestamp: Utc::now(),
            })
            .unwrap();
        assert_eq!(delivered, 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                RoomEvent::MediaLoaded { url, .. } => assert_eq!(url, "a"),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_type_method() {
        assert_eq!(guard_expired().event_type(), "GuardExpired");
        let queue_changed = RoomEvent::QueueChanged {
            queue: vec![],
            queue_index: -1,
            trigger: QueueChangeTrigger::Add,
            timestamp: Utc::now(),
        };
        assert_eq!(queue_changed.event_type(), "QueueChanged");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = RoomEvent::PlaybackEnded {
            outcome: EndOutcome::Stopped,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlaybackEnded");
        assert_eq!(json["outcome"], "Stopped");
    }
}
