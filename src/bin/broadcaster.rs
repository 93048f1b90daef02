//! Broadcaster application
//!
//! Captures the default input device and streams PCM 16-bit frames to the
//! relay's /broadcast endpoint until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ws_audio_streamer::config::AppConfig;
use ws_audio_streamer::session::SessionController;
use ws_audio_streamer::visualizer::WaveformSink;

/// Broadcasting never feeds the visualizer; a no-op sink satisfies the
/// rendering seam.
struct NullSink;

impl WaveformSink for NullSink {
    fn render(&self, _waveform: &[f32]) {}
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

    tracing::info!(relay = %config.server.host, "starting broadcaster");

    let (controller, handle) = SessionController::new(config, Arc::new(NullSink));
    let controller_task = tokio::spawn(controller.run());

    // Log every status change, standing in for the UI status line.
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

    handle.start_broadcasting();

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, stopping");
    handle.stop();
    handle.shutdown();
    let _ = controller_task.await;

    Ok(())
}
