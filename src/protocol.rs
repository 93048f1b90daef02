//! Wire formats
//!
//! A binary WebSocket message carries exactly one [`PcmFrame`]: mono
//! signed 16-bit samples, little-endian, sample rate implicit (the
//! broadcaster's device rate is never negotiated). A text message carries
//! a JSON [`ControlMessage`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// One wire frame of mono PCM 16-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmFrame {
    samples: Vec<i16>,
}

impl PcmFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Serialize to the little-endian byte payload of one binary message.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        Bytes::from(buf)
    }

    /// Parse a binary message payload. A payload with a dangling byte is
    /// rejected rather than silently truncated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() % 2 != 0 {
            return Err(ProtocolError::TruncatedFrame(bytes.len()));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(Self { samples })
    }
}

/// Text control message from the broadcaster.
///
/// Only `mimeType` is recognized; any other keys are accepted and
/// ignored, so `{"other": 1}` parses into an empty message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ControlMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
