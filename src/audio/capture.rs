//! Microphone capture feeding the broadcast channel
//!
//! The cpal stream lives on a dedicated thread because streams are not
//! `Send`. Each hardware buffer delivery appends channel-0 samples to an
//! accumulator; every time a full wire frame is available it is encoded
//! and handed to the transport. A channel that is not open drops the
//! frame on the floor — the capture callback must never wait on the
//! network.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver};

use crate::audio::device::{map_build_error, map_play_error, InputDevice};
use crate::codec;
use crate::config::CaptureHints;
use crate::error::AudioError;
use crate::transport::FrameSender;

/// Captures the default input device and streams encoded frames.
pub struct CaptureEncoder {
    frame_size: usize,
    hints: CaptureHints,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    error_rx: Option<Receiver<AudioError>>,
    frames_sent: Arc<AtomicU64>,
    frames_dropped: Arc<AtomicU64>,
    sample_rate: Option<u32>,
}

impl CaptureEncoder {
    pub fn new(frame_size: usize, hints: CaptureHints) -> Self {
        Self {
            frame_size,
            hints,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            error_rx: None,
            frames_sent: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            sample_rate: None,
        }
    }

    /// Start streaming frames from `input` into `sender`.
    ///
    /// Errors raised while building or running the stream on its thread
    /// arrive on the receiver from [`take_error_receiver`]; this call
    /// only fails if the capture thread itself cannot be spawned.
    ///
    /// [`take_error_receiver`]: Self::take_error_receiver
    pub fn start(&mut self, input: InputDevice, sender: FrameSender) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!(
            device = %input.name,
            sample_rate = input.sample_rate,
            channels = input.config.channels,
            echo_cancellation = self.hints.echo_cancellation,
            noise_suppression = self.hints.noise_suppression,
            auto_gain_control = self.hints.auto_gain_control,
            "starting capture"
        );

        self.sample_rate = Some(input.sample_rate);
        self.frames_sent.store(0, Ordering::SeqCst);
        self.frames_dropped.store(0, Ordering::SeqCst);

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let frames_sent = self.frames_sent.clone();
        let frames_dropped = self.frames_dropped.clone();
        let frame_size = self.frame_size;

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let channels = input.config.channels.max(1) as usize;
                let mut pending: Vec<f32> = Vec::with_capacity(frame_size * 2);
                let stream_error_tx = error_tx.clone();

                let stream = input.device.build_input_stream(
                    &input.config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }

                        // Mono wire format: channel 0 of each interleaved group.
                        pending.extend(data.iter().step_by(channels));

                        while pending.len() >= frame_size {
                            let frame = codec::encode(&pending[..frame_size]);
                            pending.drain(..frame_size);

                            match sender.send(&frame) {
                                Ok(()) => {
                                    frames_sent.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(_) => {
                                    // Channel not open: no retry, no backlog.
                                    frames_dropped.fetch_add(1, Ordering::Relaxed);
                                }
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

                        // Keep the stream alive; delivery cadence comes
                        // from the hardware, not from this loop.
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

    /// Stop capturing and release the device. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
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

impl Drop for CaptureEncoder {
    fn drop(&mut self) {
        self.stop();
    }
}
