//! Event types for the vq event system
//!
//! Provides the queue signals fired to local observers and the EventBus that
//! distributes them.

mod playback_types;

pub use playback_types::{DeviceEvent, PlaybackPhase};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Queue signals fired to registered observers
///
/// Each is a plain named signal: observers re-read the replica for details.
/// `ContentChanged` fires locally whenever a replication snapshot arrives; the
/// rest are broadcast by the authority and re-emitted by every peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// Replicated queue state arrived
    ContentChanged,

    /// Device owner reported the front video playing
    PlayingNext,

    /// Front video failed and was skipped
    SkippedDueToError,

    /// Last queued video finished, queue is now empty
    FinalVideoEnded,

    /// Front video finished and the next one was started
    VideoEnded,

    /// Queue cleared by a player with elevated rights
    Cleared,

    /// Front video removed before it finished
    CurrentVideoRemoved,

    /// Custom URL input was enabled
    CustomUrlsEnabled,

    /// Custom URL input was disabled
    CustomUrlsDisabled,

    /// Per-user limit value or enablement changed
    PerUserLimitChanged,
}

impl QueueEvent {
    /// Stable name used for SSE event fields and logs
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::ContentChanged => "ContentChanged",
            QueueEvent::PlayingNext => "PlayingNext",
            QueueEvent::SkippedDueToError => "SkippedDueToError",
            QueueEvent::FinalVideoEnded => "FinalVideoEnded",
            QueueEvent::VideoEnded => "VideoEnded",
            QueueEvent::Cleared => "Cleared",
            QueueEvent::CurrentVideoRemoved => "CurrentVideoRemoved",
            QueueEvent::CustomUrlsEnabled => "CustomUrlsEnabled",
            QueueEvent::CustomUrlsDisabled => "CustomUrlsDisabled",
            QueueEvent::PerUserLimitChanged => "PerUserLimitChanged",
        }
    }
}

impl std::fmt::Display for QueueEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Per-peer distribution bus for queue signals
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the peer)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use vq_common::events::{EventBus, QueueEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(QueueEvent::ContentChanged);
/// assert_eq!(rx.try_recv().unwrap(), QueueEvent::ContentChanged);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    pub fn emit(
        &self,
        event: QueueEvent,
    ) -> Result<usize, broadcast::error::SendError<QueueEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: QueueEvent) {
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

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(QueueEvent::Cleared).is_err());
        // Should not panic even without subscribers
        bus.emit_lossy(QueueEvent::Cleared);
    }

    #[tokio::test]
    async fn test_eventbus_emit_with_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        assert_eq!(bus.emit(QueueEvent::VideoEnded).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), QueueEvent::VideoEnded);
    }

    #[test]
    fn test_queue_event_serializes_with_type_tag() {
        let json = serde_json::to_string(&QueueEvent::FinalVideoEnded).unwrap();
        assert_eq!(json, r#"{"type":"FinalVideoEnded"}"#);
    }
}
