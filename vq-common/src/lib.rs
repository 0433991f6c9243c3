//! # Shared Video Queue Common Library
//!
//! Shared code for every vq crate including:
//! - Fixed-capacity sentinel arrays
//! - Queue slot and configuration types
//! - Wire protocol messages (requests, replication snapshots, play commands)
//! - Event types (QueueEvent) and the EventBus
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod sentinel;
pub mod types;

pub use error::{Error, Result};
pub use sentinel::{HasSentinel, SentinelArray};
pub use types::{Direction, PlayerId, QueueConfiguration, QueueSlot, VideoUrl, NO_PLAYER};
