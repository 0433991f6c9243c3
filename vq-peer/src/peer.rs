//! Per-peer node
//!
//! Every participant runs one [`Peer`]. Public mutation methods never touch
//! local state: they send a request to whichever peer holds authority. The
//! authority applies it with [`QueueAuthority`] and carries out the
//! resulting [`Action`]s; everyone else follows via replication.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use vq_common::events::{DeviceEvent, EventBus, PlaybackPhase, QueueEvent};
use vq_common::protocol::{Message, QueueSnapshot, Request, Route};
use vq_common::{Direction, PlayerId, QueueConfiguration, VideoUrl};

use crate::playback::PlaybackDevice;
use crate::queue::{permissions, Action, QueueAuthority, QueueState};
use crate::replication::ReplicationChannel;
use crate::transport::Transport;

/// Host-provided view of who is present and who holds elevated rights
pub trait Membership {
    fn has_elevated_rights(&self, player: PlayerId) -> bool;

    /// Whether `player` still resolves to a present peer
    fn is_present(&self, player: PlayerId) -> bool;
}

/// One participant in the shared queue
pub struct Peer<D: PlaybackDevice> {
    id: PlayerId,
    is_authority: bool,
    settings: QueueConfiguration,
    replica: QueueState,
    device: D,
    transport: Arc<dyn Transport>,
    replication: ReplicationChannel,
    events: EventBus,
}

impl<D: PlaybackDevice> Peer<D> {
    /// Create a follower peer
    ///
    /// `settings` seed the queue only if this peer initializes it itself;
    /// otherwise the authority's replicated configuration wins.
    pub fn new(
        id: PlayerId,
        settings: QueueConfiguration,
        device: D,
        transport: Arc<dyn Transport>,
        event_capacity: usize,
    ) -> Self {
        let events = EventBus::new(event_capacity);
        let replication = ReplicationChannel::new(Arc::clone(&transport), events.clone());
        Self {
            id,
            is_authority: false,
            settings,
            replica: QueueState::new(),
            device,
            transport,
            replication,
            events,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_authority(&self) -> bool {
        self.is_authority
    }

    /// Grant or drop queue authority
    ///
    /// A newly promoted peer keeps its replica as the canonical state.
    pub fn set_authority(&mut self, is_authority: bool) {
        if self.is_authority == is_authority {
            return;
        }
        self.is_authority = is_authority;
        if is_authority {
            self.ensure_initialized();
            info!(
                "Player {} now holds queue authority at revision {}",
                self.id,
                self.replica.revision()
            );
        } else {
            info!("Player {} released queue authority", self.id);
        }
    }

    /// Create the queue on first use; later calls change nothing
    pub fn ensure_initialized(&mut self) {
        self.replica.ensure_initialized(&self.settings);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn state(&self) -> &QueueState {
        &self.replica
    }

    // ========================================
    // Mutation entry points
    // ========================================

    pub fn queue_video(&mut self, url: impl Into<VideoUrl>, title: impl Into<String>) {
        self.request(Request::QueueVideo {
            url: url.into(),
            title: title.into(),
        });
    }

    pub fn remove_video(&mut self, index: usize) {
        self.request(Request::RemoveVideo { index });
    }

    pub fn move_video(&mut self, index: usize, direction: Direction) {
        self.request(Request::MoveVideo { index, direction });
    }

    pub fn clear(&mut self) {
        self.request(Request::Clear);
    }

    pub fn set_per_user_limit(&mut self, limit: i64) {
        self.request(Request::SetPerUserLimit { limit });
    }

    pub fn set_per_user_limit_enabled(&mut self, enabled: bool) {
        self.request(Request::SetPerUserLimitEnabled { enabled });
    }

    pub fn set_custom_url_input_enabled(&mut self, enabled: bool) {
        self.request(Request::SetCustomUrlInputEnabled { enabled });
    }

    /// Forward an event reported by the local device
    pub fn relay_device_event(&mut self, event: DeviceEvent) {
        self.request(Request::Device { event });
    }

    fn request(&mut self, request: Request) {
        self.ensure_initialized();
        debug!("Player {} sends {}", self.id, request.name());
        self.transport.send(
            Route::Authority,
            Message::Request {
                from: self.id,
                request,
            },
        );
    }

    // ========================================
    // Delivery
    // ========================================

    /// Process one message delivered by the transport
    pub fn handle(&mut self, from: PlayerId, message: Message, membership: &dyn Membership) {
        match message {
            Message::Request {
                from: requester,
                request,
            } => {
                if !self.is_authority {
                    debug!(
                        "Player {} forwarding {} from player {} to authority",
                        self.id,
                        request.name(),
                        requester
                    );
                    self.transport.send(
                        Route::Authority,
                        Message::Request {
                            from: requester,
                            request,
                        },
                    );
                    return;
                }
                self.ensure_initialized();
                let elevated = membership.has_elevated_rights(requester);
                let actions =
                    QueueAuthority::new(&mut self.replica).handle(requester, elevated, request);
                self.execute(actions);
            }
            Message::Replicate { snapshot } => {
                self.replication
                    .receive(&mut self.replica, self.is_authority, from, snapshot);
            }
            Message::PlayVideo { url } => {
                info!("Player {} takes the device for {}", self.id, url);
                self.device.take_ownership();
                self.device.play_video(&url);
            }
            Message::Signal { event } => self.replication.relay(event),
        }
    }

    /// Clean up after `departed` left the session
    pub fn on_peer_left(&mut self, departed: PlayerId, membership: &dyn Membership) {
        if !self.is_authority {
            return;
        }
        self.ensure_initialized();
        let actions = QueueAuthority::new(&mut self.replica)
            .remove_departed(departed, |player| membership.is_present(player));
        self.execute(actions);
    }

    /// Re-send a play command that was lost with a departed authority
    ///
    /// Only honored while `player` is still expected to start `url` as the
    /// front video and its device has not reported `LoadStart`.
    pub fn resume_hand_off(
        &mut self,
        player: PlayerId,
        url: &VideoUrl,
        membership: &dyn Membership,
    ) {
        if !self.is_authority || !membership.is_present(player) {
            return;
        }
        let playback = self.replica.playback();
        let expected = playback.phase() == PlaybackPhase::Loading
            && !playback.is_waiting_for_playback()
            && playback.video_owner() == Some(player)
            && self.replica.url(0) == Some(url);
        if !expected {
            debug!("Not resuming stale hand-off of {} to player {}", url, player);
            return;
        }
        info!("Player {} resumes hand-off of {} to player {}", self.id, url, player);
        self.transport
            .send(Route::Peer(player), Message::PlayVideo { url: url.clone() });
    }

    /// Republish the canonical state, e.g. for a late joiner
    pub fn publish_state(&mut self) {
        if !self.is_authority {
            warn!("Player {} cannot publish without authority", self.id);
            return;
        }
        self.replication.publish(&mut self.replica);
    }

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Replicate => self.replication.publish(&mut self.replica),
                Action::PlayOn { player, url } => {
                    self.transport
                        .send(Route::Peer(player), Message::PlayVideo { url });
                }
                Action::Notify(event) => self.replication.signal(event),
                Action::StopDevice => {
                    self.device.take_ownership();
                    self.device.stop_video();
                }
            }
        }
    }

    // ========================================
    // Queries (answered from the local replica)
    // ========================================

    pub fn queued_count(&self) -> usize {
        self.replica.queued_count()
    }

    pub fn url(&self, index: usize) -> Option<&VideoUrl> {
        self.replica.url(index)
    }

    pub fn title(&self, index: usize) -> Option<&str> {
        self.replica.title(index)
    }

    pub fn owner(&self, index: usize) -> Option<PlayerId> {
        self.replica.owner(index)
    }

    pub fn per_user_limit(&self) -> u32 {
        self.replica.config().per_user_limit
    }

    pub fn is_permitted_to_remove(
        &self,
        requester: PlayerId,
        index: usize,
        membership: &dyn Membership,
    ) -> bool {
        index < self.queued_count()
            && permissions::can_remove(
                &self.replica,
                requester,
                index,
                membership.has_elevated_rights(requester),
            )
    }

    pub fn is_able_to_move(
        &self,
        requester: PlayerId,
        index: usize,
        direction: Direction,
        membership: &dyn Membership,
    ) -> bool {
        permissions::can_move(
            &self.replica,
            index,
            direction,
            membership.has_elevated_rights(requester),
        )
    }

    pub fn is_permitted_to_queue(&self, requester: PlayerId, membership: &dyn Membership) -> bool {
        permissions::can_queue(
            &self.replica,
            requester,
            membership.has_elevated_rights(requester),
        )
    }

    pub fn is_permitted_to_queue_custom_videos(
        &self,
        requester: PlayerId,
        membership: &dyn Membership,
    ) -> bool {
        permissions::can_queue_custom_videos(
            &self.replica,
            requester,
            membership.has_elevated_rights(requester),
        )
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.replica.snapshot()
    }
}
