//! Replicated queue: state, permission policy and authority-side handling

pub mod authority;
pub mod permissions;
pub mod state;

pub use authority::{Action, QueueAuthority};
pub use state::QueueState;
