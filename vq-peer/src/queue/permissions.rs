//! Permission policy for queue mutations
//!
//! Pure functions over the queue state and the requester's elevated-rights
//! flag. The authority consults them before every mutation; peers consult
//! them to decide which controls to offer.

use vq_common::{Direction, PlayerId, VideoUrl};

use super::QueueState;

/// Whether `requester` may add another video
pub fn can_queue(state: &QueueState, requester: PlayerId, elevated: bool) -> bool {
    let config = state.config();
    elevated
        || !config.per_user_limit_enabled
        || state.queued_by_count(requester) < config.per_user_limit as usize
}

pub fn is_valid_url(url: &VideoUrl) -> bool {
    url.is_plausible()
}

/// Whether `requester` may type in arbitrary URLs
pub fn can_queue_custom_videos(state: &QueueState, requester: PlayerId, elevated: bool) -> bool {
    elevated || (state.config().custom_url_input_enabled && can_queue(state, requester, elevated))
}

/// Whether `requester` may remove the slot at `index`
pub fn can_remove(state: &QueueState, requester: PlayerId, index: usize, elevated: bool) -> bool {
    elevated || state.owner(index) == Some(requester)
}

/// Whether the slot at `index` may move one step in `direction`
///
/// Moves never involve the front slot: up is valid for `[2, count-1]`,
/// down for `[1, count-2]`.
pub fn can_move(state: &QueueState, index: usize, direction: Direction, elevated: bool) -> bool {
    elevated && in_move_range(state.queued_count(), index, direction)
}

pub(crate) fn in_move_range(count: usize, index: usize, direction: Direction) -> bool {
    match direction {
        Direction::Up => index >= 2 && index < count,
        Direction::Down => index >= 1 && index + 2 <= count,
    }
}

/// Clear and configuration changes
pub fn can_reconfigure(elevated: bool) -> bool {
    elevated
}
