//! Session controller integration tests
//!
//! Device-free paths only: anything needing real capture or playback
//! hardware is covered by the pure state machine tests instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use ws_audio_streamer::config::AppConfig;
use ws_audio_streamer::session::{SessionController, SessionState, StatusSnapshot};
use ws_audio_streamer::visualizer::WaveformSink;

struct NullSink;

impl WaveformSink for NullSink {
    fn render(&self, _waveform: &[f32]) {}
}

fn controller_with_unreachable_relay() -> (SessionController, ws_audio_streamer::session::SessionHandle) {
    let mut config = AppConfig::default();
    // Nothing listens here; connect attempts fail immediately.
    config.server.host = "127.0.0.1:1".to_string();
    SessionController::new(config, Arc::new(NullSink))
}

async fn wait_for_state(
    status: &mut tokio::sync::watch::Receiver<StatusSnapshot>,
    state: SessionState,
) -> StatusSnapshot {
    timeout(Duration::from_secs(5), status.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for session state")
        .expect("status channel closed")
        .clone()
}

#[tokio::test]
async fn listen_against_unreachable_relay_stops_with_fault_message() {
    let (controller, handle) = controller_with_unreachable_relay();
    let task = tokio::spawn(controller.run());
    let mut status = handle.status();

    handle.start_listening();

    let snapshot = wait_for_state(&mut status, SessionState::Stopped).await;
    assert!(!snapshot.message.is_empty());
    // The fault replaces the plain "Stopped" text with its cause.
    assert_ne!(snapshot.message, "Listening...");
    assert!(snapshot.commands_enabled);

    handle.shutdown();
    let _ = task.await;
}

#[tokio::test]
async fn stop_is_idempotent_from_idle() {
    let (controller, handle) = controller_with_unreachable_relay();
    let task = tokio::spawn(controller.run());
    let mut status = handle.status();

    handle.stop();
    let snapshot = wait_for_state(&mut status, SessionState::Stopped).await;
    assert_eq!(snapshot.message, "Stopped");
    assert!(snapshot.commands_enabled);

    // A second stop must not fail or change anything.
    handle.stop();
    handle.stop();
    let snapshot = wait_for_state(&mut status, SessionState::Stopped).await;
    assert_eq!(snapshot.state, SessionState::Stopped);

    handle.shutdown();
    let _ = task.await;
}

#[tokio::test]
async fn commands_disabled_and_exclusive_while_connecting() {
    use ws_audio_streamer::transport::EndpointRole;

    // Accept the TCP connection but never answer the WebSocket handshake,
    // so the session stays in Connecting until told to stop.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _held = listener.accept().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let mut config = AppConfig::default();
    config.server.host = addr.to_string();
    let (controller, handle) = SessionController::new(config, Arc::new(NullSink));
    let task = tokio::spawn(controller.run());
    let mut status = handle.status();

    handle.start_listening();

    let connecting = SessionState::Connecting(EndpointRole::Listener);
    let snapshot = wait_for_state(&mut status, connecting).await;
    assert_eq!(snapshot.message, "Connecting...");
    assert!(!snapshot.commands_enabled);

    // Entry commands are rejected until the session stops: no second
    // role, no status change.
    handle.start_broadcasting();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(status.borrow().state, connecting);

    handle.stop();
    let snapshot = wait_for_state(&mut status, SessionState::Stopped).await;
    assert!(snapshot.commands_enabled);

    handle.shutdown();
    let _ = task.await;
}
