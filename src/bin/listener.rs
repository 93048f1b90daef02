//! Listener application
//!
//! Connects to the relay's /listen endpoint, plays inbound PCM 16-bit
//! frames on the default output device, and renders the waveform as a
//! terminal peak meter until Ctrl+C.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ws_audio_streamer::config::AppConfig;
use ws_audio_streamer::session::SessionController;
use ws_audio_streamer::visualizer::WaveformSink;

/// Terminal stand-in for the rendering collaborator: logs the waveform
/// peak a couple of times a second.
struct PeakMeterSink {
    last_log: Mutex<Instant>,
}

impl PeakMeterSink {
    fn new() -> Self {
        Self {
            last_log: Mutex::new(Instant::now()),
        }
    }
}

impl WaveformSink for PeakMeterSink {
    fn render(&self, waveform: &[f32]) {
        let mut last = self.last_log.lock();
        if last.elapsed() < Duration::from_millis(500) {
            return;
        }
        *last = Instant::now();

        let peak = waveform.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let bars = (peak.min(1.0) * 40.0) as usize;
        tracing::info!("|{:<40}| peak {:.3}", "#".repeat(bars), peak);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    tracing::info!(relay = %config.server.host, "starting listener");

    let (controller, handle) = SessionController::new(config, Arc::new(PeakMeterSink::new()));
    let controller_task = tokio::spawn(controller.run());

    let mut status = handle.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let snapshot = status.borrow().clone();
            tracing::info!(
                status = %snapshot.message,
                commands_enabled = snapshot.commands_enabled,
                "session status"
            );
        }
    });

    handle.start_listening();

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, stopping");
    handle.stop();
    handle.shutdown();
    let _ = controller_task.await;

    Ok(())
}
