//! Playback coordination and the device seam

pub mod coordinator;
pub mod device;

pub use coordinator::{AdvanceReason, PlaybackCoordinator};
pub use device::{DeviceCommand, PlaybackDevice, SimulatedDevice};
