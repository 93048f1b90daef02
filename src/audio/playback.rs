//! Playback of inbound PCM frames
//!
//! Each decoded frame is pushed to a bounded ring feeding the cpal output
//! callback — played as soon as the device asks for samples, with no
//! jitter buffer, so uneven network delivery is audible by design — and
//! mirrored into the visualizer's FIFO queue in the same arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver};

use crate::audio::device::{self, map_build_error, map_play_error};
use crate::audio::queue::{FrameRing, SharedFrameRing, SharedPlaybackQueue};
use crate::codec;
use crate::constants;
use crate::error::AudioError;
use crate::protocol::{ControlMessage, PcmFrame};

/// Decodes inbound binary frames and plays them on the default output
/// device.
pub struct PlaybackDecoder {
    out_ring: SharedFrameRing,
    vis_queue: SharedPlaybackQueue,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    error_rx: Option<Receiver<AudioError>>,
    frames_decoded: u64,
    sample_rate: Option<u32>,
}

impl PlaybackDecoder {
    pub fn new(vis_queue: SharedPlaybackQueue) -> Self {
        Self {
            out_ring: Arc::new(FrameRing::new(constants::PLAYBACK_RING_CAPACITY)),
            vis_queue,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            error_rx: None,
            frames_decoded: 0,
            sample_rate: None,
        }
    }

    /// Acquire the default output device and start draining the ring.
    ///
    /// Device acquisition errors return synchronously; later stream
    /// failures arrive on the receiver from [`take_error_receiver`].
    ///
    /// [`take_error_receiver`]: Self::take_error_receiver
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let output = device::default_output()?;

        tracing::info!(
            device = %output.name,
            sample_rate = output.sample_rate,
            channels = output.config.channels,
            "starting playback"
        );

        self.sample_rate = Some(output.sample_rate);

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let out_ring = self.out_ring.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || {
                let channels = output.config.channels.max(1) as usize;
                // Partially consumed frame carried across callbacks.
                let mut carry: Vec<f32> = Vec::new();
                let mut carry_pos = 0usize;
                let stream_error_tx = error_tx.clone();

                let stream = output.device.build_output_stream(
                    &output.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for group in data.chunks_mut(channels) {
                            if carry_pos >= carry.len() {
                                match out_ring.pop() {
                                    Some(next) => {
                                        carry = next;
                                        carry_pos = 0;
                                    }
                                    None => {
                                        // Ring dry: emit silence rather
                                        // than stalling the device.
                                        for s in group.iter_mut() {
                                            *s = 0.0;
                                        }
                                        continue;
                                    }
                                }
                            }
                            let sample = carry[carry_pos];
                            carry_pos += 1;
                            // Mono source on every output channel.
                            for s in group.iter_mut() {
                                *s = sample;
                            }
                        }
                    },
                    move |err| {
                        let _ = stream_error_tx.try_send(AudioError::StreamFailed(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = error_tx.try_send(map_play_error(e));
                            return;
                        }

                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(std::time::Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        let _ = error_tx.try_send(map_build_error(e));
                    }
                }
            })
            .map_err(|e| AudioError::StreamFailed(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Handle one inbound binary message: decode, schedule for immediate
    /// playback, and mirror to the visualizer queue.
    pub fn handle_binary(&mut self, bytes: &[u8]) {
        let frame = match PcmFrame::from_bytes(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, len = bytes.len(), "dropping malformed frame");
                return;
            }
        };

        let samples = codec::decode(&frame);
        self.frames_decoded += 1;

        // Visualizer first so its FIFO matches decode order even when the
        // playback ring rejects the frame.
        self.vis_queue.push(samples.clone());
        if !self.out_ring.push(samples) {
            tracing::debug!(
                overflows = self.out_ring.overflow_count(),
                "playback ring full, frame dropped"
            );
        }
    }

    /// Handle one inbound text message. Unparseable payloads are logged
    /// and dropped; the session keeps running.
    pub fn handle_text(&self, text: &str) {
        match ControlMessage::parse(text) {
            Ok(msg) => {
                if let Some(mime) = msg.mime_type {
                    tracing::info!(mime_type = %mime, "broadcaster announced mime type");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed control message");
            }
        }
    }

    /// Stop playback and release the device. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        self.out_ring.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Take the stream-thread error receiver; the owner forwards anything
    /// arriving on it into the session event queue.
    pub fn take_error_receiver(&mut self) -> Option<Receiver<AudioError>> {
        self.error_rx.take()
    }
}

impl Drop for PlaybackDecoder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::PlaybackQueue;

    fn decoder() -> PlaybackDecoder {
        PlaybackDecoder::new(Arc::new(PlaybackQueue::new()))
    }

    #[test]
    fn test_binary_frames_reach_visualizer_in_order() {
        let mut decoder = decoder();

        let a = codec::encode(&[0.25]).to_bytes();
        let b = codec::encode(&[0.5]).to_bytes();
        let c = codec::encode(&[0.75]).to_bytes();
        decoder.handle_binary(&a);
        decoder.handle_binary(&b);
        decoder.handle_binary(&c);

        assert_eq!(decoder.frames_decoded(), 3);

        let first = decoder.vis_queue.pop().unwrap();
        let second = decoder.vis_queue.pop().unwrap();
        let third = decoder.vis_queue.pop().unwrap();
        assert!(first[0] < second[0] && second[0] < third[0]);
        assert!(decoder.vis_queue.pop().is_none());
    }

    #[test]
    fn test_malformed_binary_dropped() {
        let mut decoder = decoder();
        decoder.handle_binary(&[0x01, 0x02, 0x03]);
        assert_eq!(decoder.frames_decoded(), 0);
        assert!(decoder.vis_queue.is_empty());
    }

    #[test]
    fn test_text_messages_never_fail() {
        let decoder = decoder();
        decoder.handle_text("not json");
        decoder.handle_text(r#"{"other": 1}"#);
        decoder.handle_text(r#"{"mimeType": "audio/pcm"}"#);
        // No state change and nothing surfaced: playback continues.
        assert_eq!(decoder.frames_decoded(), 0);
        assert!(decoder.vis_queue.is_empty());
    }
}
