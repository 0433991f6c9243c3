//! Peer-to-peer transport seam and its in-process loopback
//!
//! The real network (reliable ordered delivery, peer identity, authority
//! transfer) is external. Peers only see [`Transport::send`]; routing to the
//! current authority is resolved at delivery time.

use tokio::sync::mpsc;
use tracing::warn;
use vq_common::protocol::{Message, Route};
use vq_common::PlayerId;

/// One-way send primitive used by every peer
pub trait Transport: Send + Sync {
    fn send(&self, route: Route, message: Message);
}

/// Encoded message in flight on the loopback network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub from: PlayerId,
    pub route: Route,
    pub payload: String,
}

/// Sending half handed to one peer
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    local: PlayerId,
    tx: mpsc::UnboundedSender<Frame>,
}

impl Transport for LoopbackTransport {
    fn send(&self, route: Route, message: Message) {
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode {} message: {}", message.kind(), e);
                return;
            }
        };
        let frame = Frame {
            from: self.local,
            route,
            payload,
        };
        if self.tx.send(frame).is_err() {
            warn!(
                "Loopback network closed, dropping {} message from player {}",
                message.kind(),
                self.local
            );
        }
    }
}

/// Single FIFO shared by every peer in a session
///
/// Frames are delivered in the order they were sent, across all senders.
#[derive(Debug)]
pub struct LoopbackNetwork {
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Transport stamping frames with `local` as sender
    pub fn transport_for(&self, local: PlayerId) -> LoopbackTransport {
        LoopbackTransport {
            local,
            tx: self.tx.clone(),
        }
    }

    /// Next frame in send order, if any
    pub fn try_next(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vq_common::events::QueueEvent;

    #[test]
    fn test_frames_keep_send_order() {
        let mut network = LoopbackNetwork::new();
        let one = network.transport_for(1);
        let two = network.transport_for(2);

        one.send(Route::All, Message::Signal { event: QueueEvent::Cleared });
        two.send(Route::Peer(1), Message::Signal { event: QueueEvent::VideoEnded });

        let first = network.try_next().unwrap();
        assert_eq!(first.from, 1);
        assert_eq!(first.route, Route::All);
        assert_eq!(
            Message::decode(&first.payload).unwrap(),
            Message::Signal { event: QueueEvent::Cleared }
        );

        let second = network.try_next().unwrap();
        assert_eq!(second.from, 2);
        assert_eq!(second.route, Route::Peer(1));
        assert!(network.try_next().is_none());
    }
}
