//! Queue state held by every peer
//!
//! The authority's copy is canonical; every other peer holds a replica that
//! only changes when a replication snapshot arrives.

use tracing::{debug, info};
use vq_common::protocol::QueueSnapshot;
use vq_common::{
    Error, HasSentinel, PlayerId, QueueConfiguration, QueueSlot, Result, SentinelArray, VideoUrl,
};

use crate::playback::PlaybackCoordinator;

/// Slots, configuration and playback coordination for one replica
#[derive(Debug, Clone, PartialEq)]
pub struct QueueState {
    initialized: bool,
    revision: u64,
    pub(crate) slots: SentinelArray<QueueSlot>,
    pub(crate) config: QueueConfiguration,
    pub(crate) playback: PlaybackCoordinator,
}

impl Default for QueueState {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueState {
    /// Uninitialized state with no slots
    pub fn new() -> Self {
        Self {
            initialized: false,
            revision: 0,
            slots: SentinelArray::new(0),
            config: QueueConfiguration::default(),
            playback: PlaybackCoordinator::default(),
        }
    }

    /// Create the slots and configuration once
    ///
    /// Returns true if this call performed the initialization; later calls
    /// leave the state untouched.
    pub fn ensure_initialized(&mut self, config: &QueueConfiguration) -> bool {
        if self.initialized {
            return false;
        }
        self.slots = SentinelArray::new(config.capacity);
        self.config = config.clone();
        self.playback = PlaybackCoordinator::default();
        self.initialized = true;
        info!("Queue initialized with capacity {}", config.capacity);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Revision of the last snapshot published or applied
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    pub fn slots(&self) -> &SentinelArray<QueueSlot> {
        &self.slots
    }

    pub fn config(&self) -> &QueueConfiguration {
        &self.config
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    pub fn queued_count(&self) -> usize {
        self.slots.count()
    }

    pub fn url(&self, index: usize) -> Option<&VideoUrl> {
        self.slots.get(index).map(|slot| &slot.url)
    }

    pub fn title(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|slot| slot.title.as_str())
    }

    pub fn owner(&self, index: usize) -> Option<PlayerId> {
        self.slots.get(index).map(|slot| slot.queued_by)
    }

    /// Number of occupied slots queued by `player`
    pub fn queued_by_count(&self, player: PlayerId) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.queued_by == player)
            .count()
    }

    /// Capture the full state for replication
    pub fn snapshot(&self) -> QueueSnapshot {
        let slots = self.slots.as_slice();
        QueueSnapshot {
            revision: self.revision,
            urls: slots.iter().map(|slot| slot.url.clone()).collect(),
            titles: slots.iter().map(|slot| slot.title.clone()).collect(),
            owners: slots.iter().map(|slot| slot.queued_by).collect(),
            config: self.config.clone(),
            waiting_for_playback: self.playback.is_waiting_for_playback(),
            phase: self.playback.phase(),
            video_owner: self.playback.video_owner(),
        }
    }

    /// Replace this replica with a snapshot from the authority
    ///
    /// An uninitialized replica adopts the snapshot as its initialized state.
    /// A malformed snapshot leaves the replica unchanged.
    pub fn apply_snapshot(&mut self, snapshot: QueueSnapshot) -> Result<()> {
        let capacity = snapshot.config.capacity;
        let slots = snapshot.slots()?;
        let slots = SentinelArray::try_from_slots(slots, capacity).ok_or_else(|| {
            Error::InvalidSnapshot(format!(
                "revision {} has an empty slot before an occupied one",
                snapshot.revision
            ))
        })?;
        if let Some(partial) = slots.as_slice().iter().find(|slot| {
            !slot.is_sentinel() && (slot.url.is_sentinel() || slot.queued_by.is_sentinel())
        }) {
            return Err(Error::InvalidSnapshot(format!(
                "revision {} has a partially empty slot {:?}",
                snapshot.revision, partial
            )));
        }

        self.slots = slots;
        self.config = snapshot.config;
        self.playback = PlaybackCoordinator::restore(
            snapshot.phase,
            snapshot.video_owner,
            snapshot.waiting_for_playback,
        );
        self.revision = snapshot.revision;
        if !self.initialized {
            debug!("Replica initialized from snapshot revision {}", snapshot.revision);
            self.initialized = true;
        }
        Ok(())
    }
}
