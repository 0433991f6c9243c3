//! Playback device seam
//!
//! The real device (and its retry, playlist and URL handling) lives outside
//! the queue. Each peer drives its local device only through
//! [`PlaybackDevice`].

use serde::Serialize;
use tracing::info;
use vq_common::VideoUrl;

/// Commands a peer issues to its local playback device
pub trait PlaybackDevice: Send {
    /// Start loading and playing `url`
    fn play_video(&mut self, url: &VideoUrl);

    /// Stop whatever is playing
    fn stop_video(&mut self);

    /// Become the peer allowed to drive the shared device
    fn take_ownership(&mut self);
}

/// Command recorded by [`SimulatedDevice`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeviceCommand {
    TakeOwnership,
    Play { url: VideoUrl },
    Stop,
}

/// In-memory device that records every command it receives
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    label: String,
    commands: Vec<DeviceCommand>,
    owned: bool,
    now_playing: Option<VideoUrl>,
}

impl SimulatedDevice {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Every command received, oldest first
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn is_owner(&self) -> bool {
        self.owned
    }

    pub fn now_playing(&self) -> Option<&VideoUrl> {
        self.now_playing.as_ref()
    }

    /// Number of play commands received
    pub fn play_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DeviceCommand::Play { .. }))
            .count()
    }

    /// Whether the most recent command was a stop
    pub fn is_stopped(&self) -> bool {
        matches!(self.commands.last(), Some(DeviceCommand::Stop))
    }
}

impl PlaybackDevice for SimulatedDevice {
    fn play_video(&mut self, url: &VideoUrl) {
        info!("[{}] play {}", self.label, url);
        self.now_playing = Some(url.clone());
        self.commands.push(DeviceCommand::Play { url: url.clone() });
    }

    fn stop_video(&mut self) {
        info!("[{}] stop", self.label);
        self.now_playing = None;
        self.commands.push(DeviceCommand::Stop);
    }

    fn take_ownership(&mut self) {
        self.owned = true;
        self.commands.push(DeviceCommand::TakeOwnership);
    }
}
