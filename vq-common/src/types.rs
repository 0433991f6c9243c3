//! Queue slot and configuration types
//!
//! Shared by every peer: the authority mutates them, followers hold replicas.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sentinel::HasSentinel;

/// Network identity of a peer as reported by the host platform
pub type PlayerId = i32;

/// Owner id stored in an empty slot
pub const NO_PLAYER: PlayerId = -1;

/// Largest offset at which `://` may start in a queued URL
const MAX_SCHEME_SEPARATOR_OFFSET: usize = 8;

/// Video address as entered by a player or picked from a playlist
///
/// Only loosely validated: the playback device owns real URL parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoUrl(String);

impl VideoUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The empty URL stored in unoccupied slots
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the URL is plausible enough to hand to the device
    ///
    /// Rejects empty/whitespace URLs and URLs whose `://` does not start
    /// within the first 8 characters.
    pub fn is_plausible(&self) -> bool {
        let url = self.0.trim();
        if url.is_empty() {
            return false;
        }
        match url.find("://") {
            Some(offset) => offset > 0 && offset <= MAX_SCHEME_SEPARATOR_OFFSET,
            None => false,
        }
    }
}

impl HasSentinel for VideoUrl {
    fn sentinel() -> Self {
        Self::empty()
    }

    fn is_sentinel(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoUrl {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// One queued video
///
/// A slot is empty only when all three fields hold their sentinel values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSlot {
    pub url: VideoUrl,
    pub title: String,
    pub queued_by: PlayerId,
}

impl QueueSlot {
    pub fn new(url: VideoUrl, title: impl Into<String>, queued_by: PlayerId) -> Self {
        Self {
            url,
            title: title.into(),
            queued_by,
        }
    }
}

impl HasSentinel for QueueSlot {
    fn sentinel() -> Self {
        Self {
            url: VideoUrl::sentinel(),
            title: String::sentinel(),
            queued_by: NO_PLAYER,
        }
    }

    fn is_sentinel(&self) -> bool {
        self.url.is_sentinel() && self.title.is_sentinel() && self.queued_by.is_sentinel()
    }
}

/// Queue settings replicated alongside the slots
///
/// Only a peer with elevated rights may change them. Capacity is fixed for
/// the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfiguration {
    pub capacity: usize,
    pub per_user_limit_enabled: bool,
    pub per_user_limit: u32,
    pub custom_url_input_enabled: bool,
}

impl Default for QueueConfiguration {
    fn default() -> Self {
        Self {
            capacity: 20,
            per_user_limit_enabled: false,
            per_user_limit: 3,
            custom_url_input_enabled: true,
        }
    }
}

/// Direction of a single-step move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward the front (index decreases)
    Up,
    /// Toward the back (index increases)
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}
