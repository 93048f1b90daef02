//! Error types for the audio streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio subsystem errors
///
/// Each variant maps to a distinct user-visible failure; the display
/// strings double as the status message published on teardown.
#[derive(Error, Debug, Clone)]
pub enum AudioError {
    #[error("Microphone access denied, check permissions: {0}")]
    PermissionDenied(String),

    #[error("No capture device available: {0}")]
    DeviceNotFound(String),

    #[error("Device is in use by another application: {0}")]
    DeviceBusy(String),

    #[error("No compatible audio format available ({0}); try a different audio backend")]
    UnsupportedFormat(String),

    #[error("Audio stream failed: {0}")]
    StreamFailed(String),
}

/// Transport channel errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Channel is not open")]
    NotOpen,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Connection dropped: {0}")]
    Dropped(String),
}

/// Wire format errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Binary payload of {0} bytes is not a whole number of 16-bit samples")]
    TruncatedFrame(usize),

    #[error("Malformed control message: {0}")]
    MalformedControl(#[from] serde_json::Error),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
