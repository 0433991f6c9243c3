//! Playback-related type definitions
//!
//! Supporting types for the hand-off between the queue and the device.

use serde::{Deserialize, Serialize};

/// Lifecycle of the front-of-queue item
///
/// `Ended` and `Errored` are transient: the coordinator moves straight on to
/// `Loading` for the next item or back to `Empty`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    /// Nothing queued, no device owner
    #[default]
    Empty,
    /// Play command issued, device has not reported playing yet
    Loading,
    /// Device reported playback started
    Playing,
    /// Device reported the end of the video
    Ended,
    /// Device reported a playback failure
    Errored,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Empty => write!(f, "empty"),
            PlaybackPhase::Loading => write!(f, "loading"),
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::Ended => write!(f, "ended"),
            PlaybackPhase::Errored => write!(f, "errored"),
        }
    }
}

/// Event reported by a peer's playback device
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEvent {
    LoadStart,
    Play,
    End,
    Error,
}

impl std::fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEvent::LoadStart => write!(f, "load_start"),
            DeviceEvent::Play => write!(f, "play"),
            DeviceEvent::End => write!(f, "end"),
            DeviceEvent::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for DeviceEvent {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load_start" => Ok(DeviceEvent::LoadStart),
            "play" => Ok(DeviceEvent::Play),
            "end" => Ok(DeviceEvent::End),
            "error" => Ok(DeviceEvent::Error),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown device event: {}",
                other
            ))),
        }
    }
}
