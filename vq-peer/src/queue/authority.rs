//! Authority-side request handling
//!
//! Only the peer holding queue authority applies requests. Every accepted
//! request mutates the canonical [`QueueState`] and yields the side effects
//! (replication, directed play commands, signals, device stop) as a list of
//! [`Action`]s that the owning peer carries out afterwards, in order.
//!
//! Rejections never produce actions: permission denials and validation
//! failures are logged, capacity and index-range violations are silent.

use tracing::{debug, info, warn};
use vq_common::events::QueueEvent;
use vq_common::protocol::Request;
use vq_common::{Direction, PlayerId, QueueSlot, VideoUrl};

use super::{permissions, QueueState};
use crate::playback::AdvanceReason;

/// Side effect of an applied request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Publish the canonical state to every peer
    Replicate,
    /// Directed hand-off of the front video
    PlayOn { player: PlayerId, url: VideoUrl },
    /// Broadcast a queue signal
    Notify(QueueEvent),
    /// Take ownership of and stop the shared device
    StopDevice,
}

/// Applies requests to the canonical queue state
pub struct QueueAuthority<'a> {
    state: &'a mut QueueState,
}

impl<'a> QueueAuthority<'a> {
    pub fn new(state: &'a mut QueueState) -> Self {
        Self { state }
    }

    /// Apply one request from `requester`
    pub fn handle(&mut self, requester: PlayerId, elevated: bool, request: Request) -> Vec<Action> {
        let name = request.name();
        match request {
            Request::QueueVideo { url, title } => self.queue_video(requester, elevated, url, title),
            Request::RemoveVideo { index } => self.remove_video(requester, elevated, index),
            Request::MoveVideo { index, direction } => {
                self.move_video(requester, elevated, index, direction)
            }
            Request::Clear => {
                if !permissions::can_reconfigure(elevated) {
                    deny(requester, name, "elevated rights required");
                    return Vec::new();
                }
                self.clear()
            }
            Request::SetPerUserLimit { limit } => {
                if !permissions::can_reconfigure(elevated) {
                    deny(requester, name, "elevated rights required");
                    return Vec::new();
                }
                self.set_per_user_limit(requester, limit)
            }
            Request::SetPerUserLimitEnabled { enabled } => {
                if !permissions::can_reconfigure(elevated) {
                    deny(requester, name, "elevated rights required");
                    return Vec::new();
                }
                self.state.config.per_user_limit_enabled = enabled;
                info!("Per-user limit {} by player {}", on_off(enabled), requester);
                vec![
                    Action::Replicate,
                    Action::Notify(QueueEvent::PerUserLimitChanged),
                ]
            }
            Request::SetCustomUrlInputEnabled { enabled } => {
                if !permissions::can_reconfigure(elevated) {
                    deny(requester, name, "elevated rights required");
                    return Vec::new();
                }
                self.state.config.custom_url_input_enabled = enabled;
                info!("Custom URL input {} by player {}", on_off(enabled), requester);
                let event = if enabled {
                    QueueEvent::CustomUrlsEnabled
                } else {
                    QueueEvent::CustomUrlsDisabled
                };
                vec![Action::Replicate, Action::Notify(event)]
            }
            Request::Device { event } => {
                let QueueState {
                    slots, playback, ..
                } = &mut *self.state;
                playback.on_device_event(requester, event, slots)
            }
        }
    }

    fn queue_video(
        &mut self,
        requester: PlayerId,
        elevated: bool,
        url: VideoUrl,
        title: String,
    ) -> Vec<Action> {
        if !permissions::is_valid_url(&url) {
            warn!(
                "Rejected QueueVideo from player {}: implausible URL {:?}",
                requester,
                url.as_str()
            );
            return Vec::new();
        }
        if !permissions::can_queue(self.state, requester, elevated) {
            deny(requester, "QueueVideo", "per-user limit reached");
            return Vec::new();
        }

        let was_empty = self.state.slots.is_empty();
        let slot = QueueSlot::new(VideoUrl::new(url.as_str().trim()), title, requester);
        if !self.state.slots.enqueue(slot) {
            debug!("Queue full, dropping QueueVideo from player {}", requester);
            return Vec::new();
        }
        debug!(
            "Player {} queued {} ({} queued)",
            requester,
            url,
            self.state.queued_count()
        );

        let mut actions = vec![Action::Replicate];
        if was_empty {
            let QueueState {
                slots, playback, ..
            } = &mut *self.state;
            playback.start_front(slots, &mut actions);
        }
        actions
    }

    fn remove_video(&mut self, requester: PlayerId, elevated: bool, index: usize) -> Vec<Action> {
        if index >= self.state.queued_count() {
            return Vec::new();
        }
        if !permissions::can_remove(self.state, requester, index, elevated) {
            deny(requester, "RemoveVideo", "not queued by requester");
            return Vec::new();
        }

        if index == 0 {
            if self.state.playback.is_waiting_for_playback() {
                warn!(
                    "Refused RemoveVideo(0) from player {}: front video is still loading",
                    requester
                );
                return Vec::new();
            }
            let QueueState {
                slots, playback, ..
            } = &mut *self.state;
            return playback.advance(slots, AdvanceReason::Removed);
        }

        self.state.slots.remove(index);
        vec![Action::Replicate]
    }

    fn move_video(
        &mut self,
        requester: PlayerId,
        elevated: bool,
        index: usize,
        direction: Direction,
    ) -> Vec<Action> {
        if !elevated {
            deny(requester, "MoveVideo", "elevated rights required");
            return Vec::new();
        }
        if !permissions::can_move(self.state, index, direction, elevated) {
            debug!("Ignoring MoveVideo({}, {}) out of range", index, direction);
            return Vec::new();
        }

        let moved = match direction {
            Direction::Up => self.state.slots.move_up(index),
            Direction::Down => self.state.slots.move_down(index),
        };
        if moved {
            vec![Action::Replicate]
        } else {
            Vec::new()
        }
    }

    fn clear(&mut self) -> Vec<Action> {
        info!("Clearing {} queued videos", self.state.queued_count());
        self.state.slots.clear();
        self.state.playback.reset();
        vec![
            Action::StopDevice,
            Action::Replicate,
            Action::Notify(QueueEvent::Cleared),
        ]
    }

    fn set_per_user_limit(&mut self, requester: PlayerId, limit: i64) -> Vec<Action> {
        let Ok(limit) = u32::try_from(limit) else {
            warn!(
                "Rejected SetPerUserLimit from player {}: invalid limit {}",
                requester, limit
            );
            return Vec::new();
        };
        self.state.config.per_user_limit = limit;
        info!("Per-user limit set to {} by player {}", limit, requester);
        vec![
            Action::Replicate,
            Action::Notify(QueueEvent::PerUserLimitChanged),
        ]
    }

    /// Drop every video owned by `departed` or by a player no longer present
    ///
    /// Scans last to first so the front is handled after everything behind
    /// it; the front uses the forced advance, which ignores the wait flag.
    pub fn remove_departed(
        &mut self,
        departed: PlayerId,
        is_present: impl Fn(PlayerId) -> bool,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut removed = 0;
        for index in (0..self.state.queued_count()).rev() {
            let Some(owner) = self.state.owner(index) else {
                continue;
            };
            if owner != departed && is_present(owner) {
                continue;
            }
            removed += 1;
            if index == 0 {
                let QueueState {
                    slots, playback, ..
                } = &mut *self.state;
                actions = playback.advance(slots, AdvanceReason::Forced);
            } else {
                self.state.slots.remove(index);
            }
        }

        if removed > 0 {
            info!("Removed {} videos after player {} left", removed, departed);
            if !actions.contains(&Action::Replicate) {
                actions.insert(0, Action::Replicate);
            }
        }
        actions
    }
}

fn deny(requester: PlayerId, request: &str, reason: &str) {
    warn!("Denied {} from player {}: {}", request, requester, reason);
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vq_common::events::DeviceEvent;
    use vq_common::QueueConfiguration;

    fn state(capacity: usize) -> QueueState {
        let mut state = QueueState::new();
        state.ensure_initialized(&QueueConfiguration {
            capacity,
            ..QueueConfiguration::default()
        });
        state
    }

    fn queue(url: &str) -> Request {
        Request::QueueVideo {
            url: VideoUrl::from(url),
            title: url.trim_start_matches("https://").to_string(),
        }
    }

    fn urls(state: &QueueState) -> Vec<&str> {
        state.slots().iter().map(|slot| slot.url.as_str()).collect()
    }

    #[test]
    fn test_queue_three_players() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(1, false, queue("https://a"));
        authority.handle(2, false, queue("https://b"));
        authority.handle(3, false, queue("https://c"));

        assert_eq!(state.queued_count(), 3);
        assert_eq!(urls(&state), vec!["https://a", "https://b", "https://c"]);
        let owners: Vec<_> = state.slots().iter().map(|s| s.queued_by).collect();
        assert_eq!(owners, vec![1, 2, 3]);
    }

    #[test]
    fn test_first_queue_issues_one_play_command() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);

        let actions = authority.handle(7, false, queue("https://a"));
        let plays: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, Action::PlayOn { .. }))
            .collect();
        assert_eq!(
            plays,
            vec![&Action::PlayOn {
                player: 7,
                url: VideoUrl::from("https://a")
            }]
        );

        let actions = authority.handle(8, false, queue("https://b"));
        assert_eq!(actions, vec![Action::Replicate]);
    }

    #[test]
    fn test_per_user_limit() {
        let mut state = state(5);
        state.config.per_user_limit_enabled = true;
        state.config.per_user_limit = 1;
        let mut authority = QueueAuthority::new(&mut state);

        assert!(!authority.handle(1, false, queue("https://a")).is_empty());
        assert!(authority.handle(1, false, queue("https://b")).is_empty());
        assert!(!authority.handle(9, true, queue("https://c")).is_empty());
        assert!(!authority.handle(9, true, queue("https://d")).is_empty());
        assert_eq!(state.queued_count(), 3);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);
        assert!(authority.handle(1, true, queue("not a url")).is_empty());
        assert!(authority.handle(1, true, queue("   ")).is_empty());
        assert!(state.slots().is_empty());
    }

    #[test]
    fn test_full_queue_silent() {
        let mut state = state(1);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(1, false, queue("https://a"));
        assert!(authority.handle(1, false, queue("https://b")).is_empty());
        assert_eq!(urls(&state), vec!["https://a"]);
    }

    #[test]
    fn test_move_semantics() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);
        for url in ["https://a", "https://b", "https://c"] {
            authority.handle(1, false, queue(url));
        }

        assert_eq!(
            authority.handle(9, true, Request::MoveVideo { index: 2, direction: Direction::Up }),
            vec![Action::Replicate]
        );
        assert!(authority
            .handle(9, true, Request::MoveVideo { index: 1, direction: Direction::Up })
            .is_empty());
        assert!(authority
            .handle(9, true, Request::MoveVideo { index: 0, direction: Direction::Down })
            .is_empty());
        assert!(authority
            .handle(1, false, Request::MoveVideo { index: 1, direction: Direction::Down })
            .is_empty());
        assert_eq!(urls(&state), vec!["https://a", "https://c", "https://b"]);
    }

    #[test]
    fn test_remove_other_players_video_denied() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(1, false, queue("https://a"));
        authority.handle(2, false, queue("https://b"));

        assert!(authority.handle(1, false, Request::RemoveVideo { index: 1 }).is_empty());
        assert!(authority.handle(1, false, Request::RemoveVideo { index: 7 }).is_empty());
        assert_eq!(
            authority.handle(2, false, Request::RemoveVideo { index: 1 }),
            vec![Action::Replicate]
        );
        assert_eq!(urls(&state), vec!["https://a"]);
    }

    #[test]
    fn test_remove_front_refused_while_loading() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(1, false, queue("https://a"));
        authority.handle(2, false, queue("https://b"));
        authority.handle(1, false, Request::Device { event: DeviceEvent::LoadStart });

        assert!(authority.handle(1, false, Request::RemoveVideo { index: 0 }).is_empty());
        authority.handle(1, false, Request::Device { event: DeviceEvent::Play });

        let actions = authority.handle(1, false, Request::RemoveVideo { index: 0 });
        assert!(actions.contains(&Action::Notify(QueueEvent::CurrentVideoRemoved)));
        assert!(actions.contains(&Action::PlayOn {
            player: 2,
            url: VideoUrl::from("https://b")
        }));
        assert_eq!(urls(&state), vec!["https://b"]);
    }

    #[test]
    fn test_clear_requires_elevation() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(1, false, queue("https://a"));

        assert!(authority.handle(1, false, Request::Clear).is_empty());
        let actions = authority.handle(2, true, Request::Clear);
        assert_eq!(
            actions,
            vec![
                Action::StopDevice,
                Action::Replicate,
                Action::Notify(QueueEvent::Cleared)
            ]
        );
        assert!(state.slots().is_empty());
        assert_eq!(state.playback().video_owner(), None);
    }

    #[test]
    fn test_config_changes() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);

        assert!(authority
            .handle(1, false, Request::SetPerUserLimit { limit: 5 })
            .is_empty());
        assert!(authority
            .handle(1, true, Request::SetPerUserLimit { limit: -1 })
            .is_empty());
        assert_eq!(
            authority.handle(1, true, Request::SetPerUserLimit { limit: 5 }),
            vec![
                Action::Replicate,
                Action::Notify(QueueEvent::PerUserLimitChanged)
            ]
        );
        assert_eq!(
            authority.handle(1, true, Request::SetCustomUrlInputEnabled { enabled: false }),
            vec![
                Action::Replicate,
                Action::Notify(QueueEvent::CustomUrlsDisabled)
            ]
        );
        authority.handle(1, true, Request::SetPerUserLimitEnabled { enabled: true });

        assert_eq!(state.config().per_user_limit, 5);
        assert!(state.config().per_user_limit_enabled);
        assert!(!state.config().custom_url_input_enabled);
    }

    #[test]
    fn test_remove_departed_while_loading() {
        let mut state = state(5);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(1, false, queue("https://a"));
        authority.handle(2, false, queue("https://b"));
        authority.handle(1, false, Request::Device { event: DeviceEvent::LoadStart });

        let actions = authority.remove_departed(1, |player| player != 1);
        assert_eq!(actions.iter().filter(|a| **a == Action::Replicate).count(), 1);
        assert_eq!(urls(&state), vec!["https://b"]);
        assert_eq!(state.playback().video_owner(), Some(2));
        assert!(!state.playback().is_waiting_for_playback());
    }

    #[test]
    fn test_remove_departed_sweeps_absent_owners() {
        let mut state = state(6);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(3, false, queue("https://a"));
        authority.handle(4, false, queue("https://b"));
        authority.handle(1, false, queue("https://c"));
        authority.handle(3, false, queue("https://d"));

        let actions = authority.remove_departed(1, |player| player == 3);
        assert_eq!(actions, vec![Action::Replicate]);
        assert_eq!(urls(&state), vec!["https://a", "https://d"]);
    }

    #[test]
    fn test_remove_departed_nothing_owned() {
        let mut state = state(3);
        let mut authority = QueueAuthority::new(&mut state);
        authority.handle(2, false, queue("https://a"));
        assert!(authority.remove_departed(1, |_| true).is_empty());
    }
}
