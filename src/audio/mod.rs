//! Audio subsystem module

pub mod capture;
pub mod device;
pub mod playback;
pub mod queue;

pub use capture::CaptureEncoder;
pub use playback::PlaybackDecoder;
pub use queue::{PlaybackQueue, SharedPlaybackQueue};
