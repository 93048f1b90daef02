//! Waveform visualizer
//!
//! Drains decoded frames from the playback queue into a rolling
//! time-domain window and hands fixed-size snapshots to the rendering
//! collaborator once per display refresh. Rendering itself lives outside
//! this core behind [`WaveformSink`]; this path only ever receives sample
//! data, never errors.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio::queue::SharedPlaybackQueue;

/// Rendering collaborator seam. Each call receives exactly `window`
/// normalized samples in [-1.0, 1.0], oldest first; silence is 0.0.
pub trait WaveformSink: Send + Sync {
    fn render(&self, waveform: &[f32]);
}

/// Display-rate snapshot loop over the playback queue.
pub struct Visualizer {
    queue: SharedPlaybackQueue,
    sink: Arc<dyn WaveformSink>,
    window: usize,
    refresh_rate_hz: u32,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Visualizer {
    pub fn new(
        queue: SharedPlaybackQueue,
        sink: Arc<dyn WaveformSink>,
        window: usize,
        refresh_rate_hz: u32,
    ) -> Self {
        Self {
            queue,
            sink,
            window: window.max(1),
            refresh_rate_hz: refresh_rate_hz.max(1),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Begin the cooperative loop. Snapshots of silence are delivered
    /// until audio arrives.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let running = self.running.clone();
        let queue = self.queue.clone();
        let sink = self.sink.clone();
        let window = self.window;
        let period = Duration::from_secs_f64(1.0 / f64::from(self.refresh_rate_hz));

        self.task = Some(tokio::spawn(async move {
            let mut rolling: VecDeque<f32> = VecDeque::from(vec![0.0; window]);
            let mut snapshot = vec![0.0f32; window];
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !running.load(Ordering::Acquire) {
                    break;
                }

                // FIFO drain: frames enter the window in arrival order.
                while let Some(frame) = queue.pop() {
                    for s in frame {
                        rolling.push_back(s);
                    }
                    while rolling.len() > window {
                        rolling.pop_front();
                    }
                }

                for (dst, src) in snapshot.iter_mut().zip(rolling.iter()) {
                    *dst = *src;
                }

                if !running.load(Ordering::Acquire) {
                    break;
                }
                sink.render(&snapshot);
            }
        }));
    }

    /// Cancel the loop. No snapshot is delivered after this returns.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
