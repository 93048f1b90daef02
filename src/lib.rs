//! # WS Audio Streamer
//!
//! Low-latency PCM 16-bit audio streaming between a broadcaster and any
//! number of listeners over persistent WebSocket connections.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────── BROADCASTER ────────────────────┐
//! │  Microphone                                         │
//! │      │ f32 samples (cpal callback)                  │
//! │      ▼                                              │
//! │  CaptureEncoder ──codec::encode──► TransportChannel │
//! │                                        │ ws://…/broadcast
//! └────────────────────────────────────────┼────────────┘
//!                                          ▼
//!                                    relay fan-out
//!                                          │
//! ┌────────────────────────────────────────┼────────────┐
//! │                                        ▼ ws://…/listen
//! │  TransportChannel ──► PlaybackDecoder ──codec::decode
//! │                            │                │       │
//! │                      output stream    PlaybackQueue │
//! │                       (speakers)            │       │
//! │                                        Visualizer   │
//! │                                             │       │
//! │                                       WaveformSink  │
//! └──────────────────── LISTENER ───────────────────────┘
//! ```
//!
//! Every session is driven by [`session::SessionController`], which owns
//! the components above and consumes one serialized event queue: user
//! commands, channel lifecycle events, and component faults. Any fault
//! tears the whole session down to `Stopped`; recovery is always an
//! explicit user command.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod visualizer;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Samples per wire frame (mono)
    pub const FRAME_SIZE_SAMPLES: usize = 4096;

    /// Visualizer rolling window in samples
    pub const WAVEFORM_WINDOW: usize = 2048;

    /// Visualizer refresh rate in snapshots per second
    pub const DEFAULT_REFRESH_RATE_HZ: u32 = 60;

    /// Decoded-frame ring capacity between the network task and the
    /// output stream callback
    pub const PLAYBACK_RING_CAPACITY: usize = 256;

    /// Broadcaster endpoint path on the relay
    pub const BROADCAST_PATH: &str = "/broadcast";

    /// Listener endpoint path on the relay
    pub const LISTEN_PATH: &str = "/listen";
}
