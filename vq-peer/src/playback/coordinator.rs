//! Playback hand-off state machine
//!
//! Tracks which peer's device plays the front video and advances the queue
//! when that device reports the video finished or failed.
//!
//! Phases: `Empty -> Loading -> Playing -> (Ended | Errored) -> Loading | Empty`

use tracing::{debug, info};
use vq_common::events::{DeviceEvent, PlaybackPhase, QueueEvent};
use vq_common::{PlayerId, QueueSlot, SentinelArray};

use crate::queue::Action;

/// Why the front video is leaving the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceReason {
    /// Device owner reported the end of the video
    Ended,
    /// Device owner reported an error
    Errored,
    /// Explicit removal of index 0
    Removed,
    /// Departure cleanup; ignores the wait flag
    Forced,
}

/// Coordinator state, replicated alongside the slots
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackCoordinator {
    phase: PlaybackPhase,
    video_owner: Option<PlayerId>,
    waiting_for_playback: bool,
}

impl PlaybackCoordinator {
    /// Rebuild coordinator state received in a snapshot
    pub fn restore(phase: PlaybackPhase, video_owner: Option<PlayerId>, waiting: bool) -> Self {
        Self {
            phase,
            video_owner,
            waiting_for_playback: waiting,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Peer whose device was last told to play the front video
    pub fn video_owner(&self) -> Option<PlayerId> {
        self.video_owner
    }

    /// True from `LoadStart` until `Play`
    pub fn is_waiting_for_playback(&self) -> bool {
        self.waiting_for_playback
    }

    pub fn is_device_owner(&self, player: PlayerId) -> bool {
        self.video_owner == Some(player)
    }

    /// Back to `Empty` with no device owner
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Hand the front video to the peer that queued it
    ///
    /// Resets to `Empty` when there is no front video.
    pub fn start_front(&mut self, slots: &SentinelArray<QueueSlot>, actions: &mut Vec<Action>) {
        match slots.front() {
            Some(front) => {
                info!(
                    "Handing {} to player {} for playback",
                    front.url, front.queued_by
                );
                self.video_owner = Some(front.queued_by);
                self.phase = PlaybackPhase::Loading;
                self.waiting_for_playback = false;
                actions.push(Action::PlayOn {
                    player: front.queued_by,
                    url: front.url.clone(),
                });
            }
            None => self.reset(),
        }
    }

    /// React to a device event relayed by `from`
    ///
    /// Events from any peer other than the device owner are stale and
    /// ignored.
    pub fn on_device_event(
        &mut self,
        from: PlayerId,
        event: DeviceEvent,
        slots: &mut SentinelArray<QueueSlot>,
    ) -> Vec<Action> {
        if !self.is_device_owner(from) {
            debug!(
                "Ignoring stale {} from player {} (device owner: {:?})",
                event, from, self.video_owner
            );
            return Vec::new();
        }

        match event {
            DeviceEvent::LoadStart => {
                self.waiting_for_playback = true;
                self.phase = PlaybackPhase::Loading;
                vec![Action::Replicate]
            }
            DeviceEvent::Play => {
                self.waiting_for_playback = false;
                self.phase = PlaybackPhase::Playing;
                vec![Action::Replicate, Action::Notify(QueueEvent::PlayingNext)]
            }
            DeviceEvent::End => {
                self.phase = PlaybackPhase::Ended;
                self.advance(slots, AdvanceReason::Ended)
            }
            DeviceEvent::Error => {
                self.waiting_for_playback = false;
                self.phase = PlaybackPhase::Errored;
                let mut actions = self.advance(slots, AdvanceReason::Errored);
                actions.push(Action::Notify(QueueEvent::SkippedDueToError));
                actions
            }
        }
    }

    /// Remove the front video and start the next one
    ///
    /// When the removed video was the last one the device is released and
    /// stopped. Produces exactly one `Replicate`.
    pub fn advance(
        &mut self,
        slots: &mut SentinelArray<QueueSlot>,
        reason: AdvanceReason,
    ) -> Vec<Action> {
        let Some(removed) = slots.remove(0) else {
            self.reset();
            return Vec::new();
        };
        debug!("Advancing past {} ({:?})", removed.url, reason);

        let mut actions = vec![Action::Replicate];
        if slots.is_empty() {
            self.reset();
            actions.push(Action::StopDevice);
            actions.push(Action::Notify(match reason {
                AdvanceReason::Ended | AdvanceReason::Errored => QueueEvent::FinalVideoEnded,
                AdvanceReason::Removed | AdvanceReason::Forced => QueueEvent::CurrentVideoRemoved,
            }));
        } else {
            actions.push(Action::Notify(match reason {
                AdvanceReason::Ended | AdvanceReason::Errored => QueueEvent::VideoEnded,
                AdvanceReason::Removed | AdvanceReason::Forced => QueueEvent::CurrentVideoRemoved,
            }));
            self.start_front(slots, &mut actions);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vq_common::VideoUrl;

    fn slots(entries: &[(&str, PlayerId)]) -> SentinelArray<QueueSlot> {
        let mut slots = SentinelArray::new(4);
        for (url, owner) in entries {
            slots.enqueue(QueueSlot::new(VideoUrl::from(*url), "", *owner));
        }
        slots
    }

    fn started(slots: &SentinelArray<QueueSlot>) -> PlaybackCoordinator {
        let mut coordinator = PlaybackCoordinator::default();
        let mut actions = Vec::new();
        coordinator.start_front(slots, &mut actions);
        coordinator
    }

    #[test]
    fn test_start_front_targets_queuer() {
        let slots = slots(&[("https://a", 5)]);
        let mut coordinator = PlaybackCoordinator::default();
        let mut actions = Vec::new();
        coordinator.start_front(&slots, &mut actions);

        assert_eq!(
            actions,
            vec![Action::PlayOn {
                player: 5,
                url: VideoUrl::from("https://a")
            }]
        );
        assert_eq!(coordinator.phase(), PlaybackPhase::Loading);
        assert_eq!(coordinator.video_owner(), Some(5));
    }

    #[test]
    fn test_stale_event_ignored() {
        let mut slots = slots(&[("https://a", 1), ("https://b", 2)]);
        let mut coordinator = started(&slots);

        let actions = coordinator.on_device_event(2, DeviceEvent::End, &mut slots);
        assert!(actions.is_empty());
        assert_eq!(slots.count(), 2);
    }

    #[test]
    fn test_load_start_then_play() {
        let mut slots = slots(&[("https://a", 1)]);
        let mut coordinator = started(&slots);

        assert_eq!(
            coordinator.on_device_event(1, DeviceEvent::LoadStart, &mut slots),
            vec![Action::Replicate]
        );
        assert!(coordinator.is_waiting_for_playback());

        let actions = coordinator.on_device_event(1, DeviceEvent::Play, &mut slots);
        assert_eq!(
            actions,
            vec![Action::Replicate, Action::Notify(QueueEvent::PlayingNext)]
        );
        assert!(!coordinator.is_waiting_for_playback());
        assert_eq!(coordinator.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_end_with_next_video() {
        let mut slots = slots(&[("https://a", 1), ("https://b", 2)]);
        let mut coordinator = started(&slots);

        let actions = coordinator.on_device_event(1, DeviceEvent::End, &mut slots);
        assert_eq!(
            actions,
            vec![
                Action::Replicate,
                Action::Notify(QueueEvent::VideoEnded),
                Action::PlayOn {
                    player: 2,
                    url: VideoUrl::from("https://b")
                },
            ]
        );
        assert_eq!(coordinator.video_owner(), Some(2));
        assert_eq!(slots.count(), 1);
    }

    #[test]
    fn test_end_of_final_video() {
        let mut slots = slots(&[("https://a", 1)]);
        let mut coordinator = started(&slots);

        let actions = coordinator.on_device_event(1, DeviceEvent::End, &mut slots);
        assert_eq!(
            actions,
            vec![
                Action::Replicate,
                Action::StopDevice,
                Action::Notify(QueueEvent::FinalVideoEnded),
            ]
        );
        assert_eq!(coordinator, PlaybackCoordinator::default());
        assert!(slots.is_empty());
    }

    #[test]
    fn test_error_clears_wait_and_skips() {
        let mut slots = slots(&[("https://a", 1), ("https://b", 1)]);
        let mut coordinator = started(&slots);
        coordinator.on_device_event(1, DeviceEvent::LoadStart, &mut slots);

        let actions = coordinator.on_device_event(1, DeviceEvent::Error, &mut slots);
        assert_eq!(actions.iter().filter(|a| **a == Action::Replicate).count(), 1);
        assert_eq!(
            actions.last(),
            Some(&Action::Notify(QueueEvent::SkippedDueToError))
        );
        assert!(!coordinator.is_waiting_for_playback());
        assert_eq!(slots.front().map(|s| s.url.as_str()), Some("https://b"));
    }

    #[test]
    fn test_advance_on_empty_is_noop() {
        let mut slots = slots(&[]);
        let mut coordinator = PlaybackCoordinator::default();
        assert!(coordinator
            .advance(&mut slots, AdvanceReason::Forced)
            .is_empty());
    }
}
