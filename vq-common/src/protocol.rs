//! Wire protocol between peers
//!
//! Every interaction is a one-way message with no reply channel:
//! - `Message::Request` travels from any peer to the authority
//! - `Message::Replicate` carries the authority's full state to every peer
//! - `Message::PlayVideo` is directed at the single peer whose device plays next
//! - `Message::Signal` fans a queue signal out to every peer

use serde::{Deserialize, Serialize};

use crate::events::{DeviceEvent, PlaybackPhase, QueueEvent};
use crate::types::{Direction, PlayerId, QueueConfiguration, QueueSlot, VideoUrl};
use crate::{Error, Result};

/// Mutation or device relay addressed to the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    QueueVideo { url: VideoUrl, title: String },
    RemoveVideo { index: usize },
    MoveVideo { index: usize, direction: Direction },
    Clear,
    /// Signed so that negative limits can be rejected by the authority
    SetPerUserLimit { limit: i64 },
    SetPerUserLimitEnabled { enabled: bool },
    SetCustomUrlInputEnabled { enabled: bool },
    /// Playback device event relayed by the peer that owns the device
    Device { event: DeviceEvent },
}

impl Request {
    /// Request name used in denial logs
    pub fn name(&self) -> &'static str {
        match self {
            Request::QueueVideo { .. } => "QueueVideo",
            Request::RemoveVideo { .. } => "RemoveVideo",
            Request::MoveVideo { .. } => "MoveVideo",
            Request::Clear => "Clear",
            Request::SetPerUserLimit { .. } => "SetPerUserLimit",
            Request::SetPerUserLimitEnabled { .. } => "SetPerUserLimitEnabled",
            Request::SetCustomUrlInputEnabled { .. } => "SetCustomUrlInputEnabled",
            Request::Device { .. } => "DeviceEvent",
        }
    }
}

/// Full authority state as replicated to every peer
///
/// Slots travel as three index-aligned sequences of length `config.capacity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Incremented by the authority on every publish
    pub revision: u64,
    pub urls: Vec<VideoUrl>,
    pub titles: Vec<String>,
    pub owners: Vec<PlayerId>,
    pub config: QueueConfiguration,
    pub waiting_for_playback: bool,
    pub phase: PlaybackPhase,
    pub video_owner: Option<PlayerId>,
}

impl QueueSnapshot {
    /// Zip the parallel sequences back into slots
    ///
    /// Fails when any sequence length differs from the configured capacity.
    pub fn slots(&self) -> Result<Vec<QueueSlot>> {
        let capacity = self.config.capacity;
        if self.urls.len() != capacity
            || self.titles.len() != capacity
            || self.owners.len() != capacity
        {
            return Err(Error::InvalidSnapshot(format!(
                "parallel sequences misaligned: urls={} titles={} owners={} capacity={}",
                self.urls.len(),
                self.titles.len(),
                self.owners.len(),
                capacity
            )));
        }

        Ok(self
            .urls
            .iter()
            .zip(&self.titles)
            .zip(&self.owners)
            .map(|((url, title), owner)| QueueSlot::new(url.clone(), title.clone(), *owner))
            .collect())
    }
}

/// Message exchanged between peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Request half: `from` is the requesting player, preserved when forwarded
    Request { from: PlayerId, request: Request },
    /// Apply half: authority state for every replica
    Replicate { snapshot: QueueSnapshot },
    /// Directed hand-off: start this URL on the receiving peer's device
    PlayVideo { url: VideoUrl },
    /// Queue signal to re-emit on every peer's EventBus
    Signal { event: QueueEvent },
}

impl Message {
    /// Encode as a JSON frame
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON frame
    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Message kind for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Request { .. } => "request",
            Message::Replicate { .. } => "replicate",
            Message::PlayVideo { .. } => "play_video",
            Message::Signal { .. } => "signal",
        }
    }
}

/// Addressing for an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Whichever peer holds authority when the message is delivered
    Authority,
    /// One specific peer
    Peer(PlayerId),
    /// Every present peer, including the sender
    All,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::HasSentinel;

    fn snapshot(capacity: usize) -> QueueSnapshot {
        QueueSnapshot {
            revision: 1,
            urls: vec![VideoUrl::empty(); capacity],
            titles: vec![String::new(); capacity],
            owners: vec![-1; capacity],
            config: QueueConfiguration {
                capacity,
                ..QueueConfiguration::default()
            },
            waiting_for_playback: false,
            phase: PlaybackPhase::Empty,
            video_owner: None,
        }
    }

    #[test]
    fn test_snapshot_slots_zip() {
        let mut snap = snapshot(3);
        snap.urls[0] = VideoUrl::from("https://a");
        snap.titles[0] = "A".to_string();
        snap.owners[0] = 7;

        let slots = snap.slots().unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0], QueueSlot::new(VideoUrl::from("https://a"), "A", 7));
        assert!(slots[1].is_sentinel());
    }

    #[test]
    fn test_snapshot_misaligned_rejected() {
        let mut snap = snapshot(3);
        snap.owners.pop();
        assert!(matches!(snap.slots(), Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn test_request_frame_shape() {
        let message = Message::Request {
            from: 4,
            request: Request::MoveVideo {
                index: 2,
                direction: Direction::Up,
            },
        };
        let frame = message.encode().unwrap();
        assert!(frame.contains(r#""type":"request""#));
        assert!(frame.contains(r#""request":"move_video""#));
        assert_eq!(Message::decode(&frame).unwrap(), message);
    }

    #[test]
    fn test_decode_garbage_is_codec_error() {
        assert!(matches!(Message::decode("not json"), Err(Error::Codec(_))));
    }
}
