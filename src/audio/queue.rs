//! Frame queues between the network task, the output stream, and the
//! visualizer
//!
//! Decoded frames cross threads twice: network task → output stream
//! callback (bounded ring, overflow counted) and network task →
//! visualizer (unbounded FIFO drained at display rate). Both handoffs are
//! single-producer single-consumer and lock-free, so neither side ever
//! blocks inside an audio callback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::queue::{ArrayQueue, SegQueue};

/// Bounded SPSC ring of decoded frames feeding the output stream.
pub struct FrameRing {
    queue: ArrayQueue<Vec<f32>>,
    overflow_count: AtomicUsize,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            overflow_count: AtomicUsize::new(0),
        }
    }

    /// Push a frame. Returns false and drops the frame when the ring is
    /// full; the output callback is the only consumer and must never be
    /// waited on.
    pub fn push(&self, frame: Vec<f32>) -> bool {
        match self.queue.push(frame) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn pop(&self) -> Option<Vec<f32>> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }
}

/// Thread-safe handle to a frame ring
pub type SharedFrameRing = Arc<FrameRing>;

/// Unbounded FIFO of decoded frames awaiting visualization.
///
/// Bounded in practice by the visualizer draining once per display
/// refresh, not by an explicit capacity; ordering is strictly
/// arrival order.
#[derive(Default)]
pub struct PlaybackQueue {
    queue: SegQueue<Vec<f32>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: Vec<f32>) {
        self.queue.push(frame);
    }

    pub fn pop(&self) -> Option<Vec<f32>> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }
}

/// Thread-safe handle to a playback queue
pub type SharedPlaybackQueue = Arc<PlaybackQueue>;
