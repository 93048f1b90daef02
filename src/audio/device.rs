//! Audio device acquisition and cpal error mapping
//!
//! Sessions always use the default devices of the default host; device
//! pickers live outside this core. The mapping functions translate cpal's
//! error taxonomy into the user-visible kinds in [`AudioError`].

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

/// Default capture device together with its native stream config.
pub struct InputDevice {
    pub device: cpal::Device,
    pub config: cpal::StreamConfig,
    pub name: String,
    pub sample_rate: u32,
}

/// Default playback device together with its native stream config.
pub struct OutputDevice {
    pub device: cpal::Device,
    pub config: cpal::StreamConfig,
    pub name: String,
    pub sample_rate: u32,
}

/// Acquire the default input device at its native rate and channel count.
///
/// The native rate is implicit on the wire; it is never negotiated with
/// listeners. Capture extracts channel 0 when the device is multichannel.
pub fn default_input() -> Result<InputDevice, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let default_config = device
        .default_input_config()
        .map_err(map_config_error)?;
    let sample_rate = default_config.sample_rate().0;

    Ok(InputDevice {
        config: default_config.into(),
        device,
        name,
        sample_rate,
    })
}

/// Acquire the default output device at its native rate and channel count.
pub fn default_output() -> Result<OutputDevice, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceNotFound("no default output device".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let default_config = device
        .default_output_config()
        .map_err(map_config_error)?;
    let sample_rate = default_config.sample_rate().0;

    Ok(OutputDevice {
        config: default_config.into(),
        device,
        name,
        sample_rate,
    })
}

pub fn map_config_error(e: cpal::DefaultStreamConfigError) -> AudioError {
    match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            AudioError::DeviceNotFound("device is no longer available".to_string())
        }
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            AudioError::UnsupportedFormat("stream type not supported".to_string())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            classify_backend(err.description)
        }
    }
}

pub fn map_build_error(e: cpal::BuildStreamError) -> AudioError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            AudioError::DeviceNotFound("device is no longer available".to_string())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            AudioError::UnsupportedFormat("stream config not supported".to_string())
        }
        cpal::BuildStreamError::InvalidArgument => {
            AudioError::UnsupportedFormat("invalid stream argument".to_string())
        }
        cpal::BuildStreamError::BackendSpecific { err } => classify_backend(err.description),
        other => AudioError::StreamFailed(other.to_string()),
    }
}

pub fn map_play_error(e: cpal::PlayStreamError) -> AudioError {
    match e {
        cpal::PlayStreamError::DeviceNotAvailable => {
            AudioError::DeviceNotFound("device is no longer available".to_string())
        }
        cpal::PlayStreamError::BackendSpecific { err } => classify_backend(err.description),
    }
}

/// Backend-specific errors arrive as free-form text; recover the
/// user-visible kind from the message where possible.
fn classify_backend(description: String) -> AudioError {
    let lower = description.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("access") {
        AudioError::PermissionDenied(description)
    } else if lower.contains("busy") || lower.contains("in use") || lower.contains("exclusive") {
        AudioError::DeviceBusy(description)
    } else {
        AudioError::StreamFailed(description)
    }
}
