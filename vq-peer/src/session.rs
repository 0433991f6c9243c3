//! In-process session over the loopback transport
//!
//! Hosts every peer of one shared queue, the membership roster and the
//! authority assignment, and delivers frames in FIFO order. Stands in for
//! the real network in tests and in the service binary.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use vq_common::config::TomlConfig;
use vq_common::protocol::{Message, Route};
use vq_common::{PlayerId, QueueConfiguration, VideoUrl};

use crate::error::{Error, Result};
use crate::peer::{Membership, Peer};
use crate::playback::PlaybackDevice;
use crate::transport::{Frame, LoopbackNetwork};

/// Deliveries after which `pump` gives up on a session that never settles
const MAX_DELIVERIES_PER_PUMP: usize = 100_000;

/// Who is present and who holds elevated rights
#[derive(Debug, Clone, Default, Serialize)]
pub struct Roster {
    present: BTreeSet<PlayerId>,
    elevated: BTreeSet<PlayerId>,
}

impl Roster {
    pub fn present(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.present.iter().copied()
    }

    pub fn elevated(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.elevated.iter().copied()
    }
}

impl Membership for Roster {
    fn has_elevated_rights(&self, player: PlayerId) -> bool {
        self.elevated.contains(&player)
    }

    fn is_present(&self, player: PlayerId) -> bool {
        self.present.contains(&player)
    }
}

/// All peers sharing one queue
pub struct Session<D: PlaybackDevice> {
    settings: QueueConfiguration,
    event_capacity: usize,
    network: LoopbackNetwork,
    peers: BTreeMap<PlayerId, Peer<D>>,
    roster: Roster,
    authority: Option<PlayerId>,
}

impl<D: PlaybackDevice> Session<D> {
    pub fn new(settings: QueueConfiguration, event_capacity: usize) -> Self {
        Self {
            settings,
            event_capacity,
            network: LoopbackNetwork::new(),
            peers: BTreeMap::new(),
            roster: Roster::default(),
            authority: None,
        }
    }

    pub fn from_config(config: &TomlConfig) -> Self {
        Self::new(config.queue.clone(), config.event_capacity)
    }

    /// Add a peer driving `device`
    ///
    /// The first peer to join becomes the authority; later joiners receive
    /// the current state through a fresh publish.
    pub fn join(&mut self, id: PlayerId, elevated: bool, device: D) -> Result<()> {
        if id < 0 {
            return Err(Error::BadRequest(format!("invalid player id {}", id)));
        }
        if self.peers.contains_key(&id) {
            return Err(Error::DuplicatePeer(id));
        }

        let transport = Arc::new(self.network.transport_for(id));
        let peer = Peer::new(
            id,
            self.settings.clone(),
            device,
            transport,
            self.event_capacity,
        );
        self.peers.insert(id, peer);
        self.roster.present.insert(id);
        if elevated {
            self.roster.elevated.insert(id);
        }
        info!("Player {} joined (elevated: {})", id, elevated);

        match self.authority {
            None => self.assign_authority(id),
            Some(authority) => {
                if let Some(peer) = self.peers.get_mut(&authority) {
                    peer.publish_state();
                }
            }
        }
        Ok(())
    }

    /// Remove a peer and run departure cleanup on the authority
    ///
    /// Frames the departed peer sent that are still in flight are dropped on
    /// delivery. When the authority itself leaves, the lowest remaining id
    /// takes over before cleanup runs.
    pub fn leave(&mut self, id: PlayerId) -> Result<Peer<D>> {
        let peer = self.peers.remove(&id).ok_or(Error::UnknownPeer(id))?;
        self.roster.present.remove(&id);
        self.roster.elevated.remove(&id);
        info!("Player {} left", id);

        if self.authority == Some(id) {
            self.authority = None;
            if let Some(&next) = self.peers.keys().next() {
                self.assign_authority(next);
            } else {
                info!("Session is empty, no queue authority");
            }
        }

        if let Some(authority) = self.authority {
            if let Some(peer) = self.peers.get_mut(&authority) {
                peer.on_peer_left(id, &self.roster);
            }
        }
        Ok(peer)
    }

    /// Move authority to `id`
    pub fn transfer_authority(&mut self, id: PlayerId) -> Result<()> {
        if !self.peers.contains_key(&id) {
            return Err(Error::UnknownPeer(id));
        }
        if let Some(current) = self.authority {
            if let Some(peer) = self.peers.get_mut(&current) {
                peer.set_authority(false);
            }
        }
        self.assign_authority(id);
        Ok(())
    }

    fn assign_authority(&mut self, id: PlayerId) {
        if let Some(peer) = self.peers.get_mut(&id) {
            peer.set_authority(true);
            self.authority = Some(id);
        }
    }

    /// Grant or revoke elevated rights
    pub fn set_elevated(&mut self, id: PlayerId, elevated: bool) -> Result<()> {
        if !self.roster.present.contains(&id) {
            return Err(Error::UnknownPeer(id));
        }
        if elevated {
            self.roster.elevated.insert(id);
        } else {
            self.roster.elevated.remove(&id);
        }
        info!("Player {} elevated rights: {}", id, elevated);
        Ok(())
    }

    pub fn authority(&self) -> Option<PlayerId> {
        self.authority
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn peer(&self, id: PlayerId) -> Result<&Peer<D>> {
        self.peers.get(&id).ok_or(Error::UnknownPeer(id))
    }

    pub fn peer_mut(&mut self, id: PlayerId) -> Result<&mut Peer<D>> {
        self.peers.get_mut(&id).ok_or(Error::UnknownPeer(id))
    }

    pub fn peers(&self) -> impl Iterator<Item = &Peer<D>> {
        self.peers.values()
    }

    /// Deliver one frame; false when the network is idle
    pub fn deliver_next(&mut self) -> bool {
        let Some(frame) = self.network.try_next() else {
            return false;
        };
        self.deliver(frame);
        true
    }

    /// Deliver frames until the network is idle, returning how many
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while self.deliver_next() {
            delivered += 1;
            if delivered >= MAX_DELIVERIES_PER_PUMP {
                warn!("Session did not settle after {} deliveries", delivered);
                break;
            }
        }
        delivered
    }

    /// Let the current authority re-issue a dropped play command
    fn resume_hand_off(&mut self, player: PlayerId, url: &VideoUrl) {
        let Some(authority) = self.authority else {
            return;
        };
        if let Some(peer) = self.peers.get_mut(&authority) {
            peer.resume_hand_off(player, url, &self.roster);
        }
    }

    fn deliver(&mut self, frame: Frame) {
        let message = match Message::decode(&frame.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping undecodable frame from player {}: {}", frame.from, e);
                return;
            }
        };

        if !self.roster.is_present(frame.from) {
            debug!(
                "Dropping {} from departed player {}",
                message.kind(),
                frame.from
            );
            if let (Message::PlayVideo { url }, Route::Peer(player)) = (&message, frame.route) {
                self.resume_hand_off(player, url);
            }
            return;
        }

        let targets: Vec<PlayerId> = match frame.route {
            Route::Authority => match self.authority {
                Some(authority) => vec![authority],
                None => {
                    warn!("No authority for {} from player {}", message.kind(), frame.from);
                    return;
                }
            },
            Route::Peer(id) => vec![id],
            Route::All => self.peers.keys().copied().collect(),
        };

        debug!(
            "Delivering {} from player {} to {:?}",
            message.kind(),
            frame.from,
            targets
        );
        for target in targets {
            match self.peers.get_mut(&target) {
                Some(peer) => peer.handle(frame.from, message.clone(), &self.roster),
                None => debug!("Player {} is gone, dropping {}", target, message.kind()),
            }
        }
    }
}
