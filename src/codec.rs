//! PCM 16-bit sample codec
//!
//! Pure conversion between normalized f32 samples and the signed 16-bit
//! wire representation. The scaling is intentionally asymmetric: negative
//! samples scale by 32768 and non-negative samples by 32767, which is what
//! deployed listeners expect. [`decode`] divides by 32767.0 throughout, so
//! a full-scale negative sample does not round-trip exactly (error at most
//! 1/32768). Do not "fix" this without versioning the wire format.

use crate::protocol::PcmFrame;

/// Encode normalized samples into a PCM frame.
///
/// Out-of-range input is clamped to [-1.0, 1.0] before scaling. Empty
/// input yields an empty frame.
pub fn encode(samples: &[f32]) -> PcmFrame {
    let pcm = samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect();
    PcmFrame::new(pcm)
}

/// Decode a PCM frame back into normalized samples.
pub fn decode(frame: &PcmFrame) -> Vec<f32> {
    frame
        .samples()
        .iter()
        .map(|&s| s as f32 / 32767.0)
        .collect()
}
