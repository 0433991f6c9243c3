//! Full-state replication
//!
//! The authority publishes its whole state after every accepted mutation;
//! followers replace their replica with each snapshot. Every receipt fires
//! `ContentChanged` on the local EventBus, including the authority's receipt
//! of its own snapshot.

use std::sync::Arc;

use tracing::{debug, warn};
use vq_common::events::{EventBus, QueueEvent};
use vq_common::protocol::{Message, QueueSnapshot, Route};
use vq_common::PlayerId;

use crate::queue::QueueState;
use crate::transport::Transport;

/// Publish and apply halves of replication for one peer
pub struct ReplicationChannel {
    transport: Arc<dyn Transport>,
    events: EventBus,
}

impl ReplicationChannel {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus) -> Self {
        Self { transport, events }
    }

    /// Broadcast the canonical state under a new revision
    pub fn publish(&self, state: &mut QueueState) {
        let revision = state.bump_revision();
        debug!(
            "Publishing revision {} ({} queued)",
            revision,
            state.queued_count()
        );
        self.transport.send(
            Route::All,
            Message::Replicate {
                snapshot: state.snapshot(),
            },
        );
    }

    /// Broadcast a signal to every peer
    pub fn signal(&self, event: QueueEvent) {
        self.transport.send(Route::All, Message::Signal { event });
    }

    /// Apply a snapshot received from `from`
    ///
    /// Followers always adopt it. The authority keeps its canonical state and
    /// only adopts snapshots newer than its own, which can only come from a
    /// previous authority.
    pub fn receive(
        &self,
        replica: &mut QueueState,
        is_authority: bool,
        from: PlayerId,
        snapshot: QueueSnapshot,
    ) {
        if is_authority && snapshot.revision <= replica.revision() {
            self.events.emit_lossy(QueueEvent::ContentChanged);
            return;
        }

        let revision = snapshot.revision;
        match replica.apply_snapshot(snapshot) {
            Ok(()) => {
                debug!("Applied revision {} from player {}", revision, from);
                self.events.emit_lossy(QueueEvent::ContentChanged);
            }
            Err(e) => warn!(
                "Dropping snapshot revision {} from player {}: {}",
                revision, from, e
            ),
        }
    }

    /// Re-emit a broadcast signal locally
    pub fn relay(&self, event: QueueEvent) {
        self.events.emit_lossy(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vq_common::QueueConfiguration;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(Route, Message)>>,
    }

    impl Transport for Recorder {
        fn send(&self, route: Route, message: Message) {
            self.sent.lock().unwrap().push((route, message));
        }
    }

    fn initialized() -> QueueState {
        let mut state = QueueState::new();
        state.ensure_initialized(&QueueConfiguration::default());
        state
    }

    #[test]
    fn test_publish_bumps_revision() {
        let recorder = Arc::new(Recorder::default());
        let channel = ReplicationChannel::new(recorder.clone(), EventBus::new(8));
        let mut state = initialized();

        channel.publish(&mut state);
        channel.publish(&mut state);

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        match &sent[1] {
            (Route::All, Message::Replicate { snapshot }) => assert_eq!(snapshot.revision, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_authority_ignores_own_snapshot() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let channel = ReplicationChannel::new(Arc::new(Recorder::default()), events);

        let mut state = initialized();
        state.bump_revision();
        let stale = state.snapshot();
        state.slots.enqueue(vq_common::QueueSlot::new("https://a".into(), "", 1));
        state.bump_revision();

        channel.receive(&mut state, true, 1, stale);
        assert_eq!(state.queued_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), QueueEvent::ContentChanged);
    }

    #[test]
    fn test_follower_adopts_snapshot() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let channel = ReplicationChannel::new(Arc::new(Recorder::default()), events);

        let mut authority = initialized();
        authority.slots.enqueue(vq_common::QueueSlot::new("https://a".into(), "A", 1));
        authority.bump_revision();

        let mut replica = QueueState::new();
        channel.receive(&mut replica, false, 1, authority.snapshot());
        assert_eq!(replica, authority);
        assert_eq!(rx.try_recv().unwrap(), QueueEvent::ContentChanged);
    }

    #[test]
    fn test_malformed_snapshot_dropped() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let channel = ReplicationChannel::new(Arc::new(Recorder::default()), events);

        let mut snapshot = initialized().snapshot();
        snapshot.titles.pop();
        let mut replica = QueueState::new();
        channel.receive(&mut replica, false, 1, snapshot);

        assert!(!replica.is_initialized());
        assert!(rx.try_recv().is_err());
    }
}
