//! Application configuration
//!
//! Defaults match the deployed relay; a TOML file can override any field.

use std::path::Path;

use serde::Deserialize;

use crate::constants;
use crate::error::Error;
use crate::transport::EndpointRole;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub visualizer: VisualizerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file. Missing fields fall back to
    /// their defaults.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Relay endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Relay address as `host:port`
    pub host: String,
    /// Use `wss://` instead of `ws://`
    pub tls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:8000".to_string(),
            tls: false,
        }
    }
}

impl ServerConfig {
    /// Full WebSocket URL for one endpoint role.
    pub fn endpoint_url(&self, role: EndpointRole) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.host, role.path())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per wire frame
    pub frame_size: usize,
    pub hints: CaptureHints,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_size: constants::FRAME_SIZE_SAMPLES,
            hints: CaptureHints::default(),
        }
    }
}

/// Capture processing requested from the platform.
///
/// cpal exposes no portable switches for these, so they are advisory:
/// logged at capture start and applied where the backend honors them.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CaptureHints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureHints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Snapshots per second handed to the rendering collaborator
    pub refresh_rate_hz: u32,
    /// Rolling time-domain window, in samples
    pub window: usize,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: constants::DEFAULT_REFRESH_RATE_HZ,
            window: constants::WAVEFORM_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_urls() {
        let config = ServerConfig::default();
        assert_eq!(
            config.endpoint_url(EndpointRole::Broadcaster),
            "ws://127.0.0.1:8000/broadcast"
        );
        assert_eq!(
            config.endpoint_url(EndpointRole::Listener),
            "ws://127.0.0.1:8000/listen"
        );
    }

    #[test]
    fn test_tls_scheme() {
        let config = ServerConfig {
            host: "relay.example.com:443".to_string(),
            tls: true,
        };
        assert_eq!(
            config.endpoint_url(EndpointRole::Listener),
            "wss://relay.example.com:443/listen"
        );
    }

    #[test]
    fn test_partial_toml_override() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            host = "10.0.0.2:9000"

            [audio]
            frame_size = 2048
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "10.0.0.2:9000");
        assert!(!config.server.tls);
        assert_eq!(config.audio.frame_size, 2048);
        assert!(config.audio.hints.echo_cancellation);
        assert_eq!(config.visualizer.window, 2048);
    }
}
