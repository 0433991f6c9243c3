//! vq-peer: shared video queue peer
//!
//! One peer per participant keeps a replica of a fixed-capacity video queue.
//! A single peer holds authority: it validates and applies every mutation,
//! replicates the full state to everyone and hands each front video to the
//! device of the player who queued it.

pub mod api;
pub mod error;
pub mod peer;
pub mod playback;
pub mod queue;
pub mod replication;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
pub use peer::{Membership, Peer};
pub use playback::{DeviceCommand, PlaybackDevice, SimulatedDevice};
pub use session::{Roster, Session};
pub use vq_common::PlayerId;
