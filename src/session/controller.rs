//! Session controller runtime
//!
//! Owns the per-session resources (device, channel, capture/playback,
//! visualizer) and consumes a single serialized event queue carrying user
//! commands, channel lifecycle events, and component faults. All state
//! mutation happens on this one task; capture and playback callbacks only
//! touch their lock-free queues.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::audio::device::{self, InputDevice};
use crate::audio::queue::{PlaybackQueue, SharedPlaybackQueue};
use crate::audio::{CaptureEncoder, PlaybackDecoder};
use crate::config::AppConfig;
use crate::error::AudioError;
use crate::session::state::{self, Action, SessionState};
use crate::transport::{ChannelEvent, EndpointRole, TransportChannel};
use crate::visualizer::{Visualizer, WaveformSink};

/// Commands a user (or the embedding UI) can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    StartBroadcasting,
    StartListening,
    Stop,
}

/// Externally visible status surface.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub state: SessionState,
    /// Human-readable status line; names the failure after an error
    /// teardown.
    pub message: String,
    /// Whether the two entry commands are currently accepted.
    pub commands_enabled: bool,
}

impl StatusSnapshot {
    fn initial() -> Self {
        Self {
            state: SessionState::Idle,
            message: SessionState::Idle.status_text().to_string(),
            commands_enabled: true,
        }
    }
}

enum SessionEvent {
    Command(SessionCommand),
    /// Channel event tagged with the session generation that produced it,
    /// so a stale connection can never drive the current session.
    Channel(u64, ChannelEvent),
    ComponentFault(u64, AudioError),
    /// Tear down and exit the run loop (process shutdown, not a session
    /// state).
    Shutdown,
}

/// Cloneable handle for issuing commands and watching status.
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    status: watch::Receiver<StatusSnapshot>,
}

impl SessionHandle {
    pub fn start_broadcasting(&self) {
        let _ = self
            .events
            .send(SessionEvent::Command(SessionCommand::StartBroadcasting));
    }

    pub fn start_listening(&self) {
        let _ = self
            .events
            .send(SessionEvent::Command(SessionCommand::StartListening));
    }

    pub fn stop(&self) {
        let _ = self.events.send(SessionEvent::Command(SessionCommand::Stop));
    }

    /// Tear everything down and end the controller task.
    pub fn shutdown(&self) {
        let _ = self.events.send(SessionEvent::Shutdown);
    }

    pub fn status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }
}

/// Resources owned for the lifetime of one active session. Released
/// together, unconditionally, on every exit path.
struct ActiveSession {
    channel: TransportChannel,
    /// Device acquired when entering Connecting; consumed by the capture
    /// encoder once the broadcaster channel opens.
    input: Option<InputDevice>,
    capture: Option<CaptureEncoder>,
    playback: Option<PlaybackDecoder>,
    visualizer: Option<Visualizer>,
}

/// Top-level state machine driving capture, transport, and playback.
pub struct SessionController {
    config: AppConfig,
    sink: Arc<dyn WaveformSink>,
    state: SessionState,
    session: Option<ActiveSession>,
    session_seq: u64,
    vis_queue: SharedPlaybackQueue,
    last_fault: Option<String>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    status_tx: watch::Sender<StatusSnapshot>,
}

impl SessionController {
    pub fn new(config: AppConfig, sink: Arc<dyn WaveformSink>) -> (Self, SessionHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::initial());

        let handle = SessionHandle {
            events: events_tx.clone(),
            status: status_rx,
        };

        let controller = Self {
            config,
            sink,
            state: SessionState::Idle,
            session: None,
            session_seq: 0,
            vis_queue: Arc::new(PlaybackQueue::new()),
            last_fault: None,
            events_tx,
            events_rx,
            status_tx,
        };

        (controller, handle)
    }

    /// Drive the session until [`SessionHandle::shutdown`] is called.
    pub async fn run(mut self) {
        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        self.teardown().await;
        tracing::debug!("session controller exited");
    }

    /// Returns false when the run loop should exit.
    async fn handle_event(&mut self, event: SessionEvent) -> bool {
        let machine_event = match event {
            SessionEvent::Command(SessionCommand::StartBroadcasting) => {
                state::Event::StartBroadcasting
            }
            SessionEvent::Command(SessionCommand::StartListening) => state::Event::StartListening,
            SessionEvent::Command(SessionCommand::Stop) => state::Event::Stop,
            SessionEvent::Shutdown => return false,

            SessionEvent::Channel(seq, event) => {
                if seq != self.session_seq {
                    tracing::debug!(seq, current = self.session_seq, "ignoring stale channel event");
                    return true;
                }
                match event {
                    ChannelEvent::Opened => match self.session.as_ref() {
                        Some(session) => state::Event::ChannelOpened(session.channel.role()),
                        None => return true,
                    },
                    ChannelEvent::Binary(bytes) => {
                        if let Some(playback) =
                            self.session.as_mut().and_then(|s| s.playback.as_mut())
                        {
                            playback.handle_binary(&bytes);
                        }
                        return true;
                    }
                    ChannelEvent::Text(text) => {
                        if let Some(playback) =
                            self.session.as_ref().and_then(|s| s.playback.as_ref())
                        {
                            playback.handle_text(&text);
                        }
                        return true;
                    }
                    ChannelEvent::Error(cause) => state::Event::Fault(cause),
                    ChannelEvent::Closed => state::Event::ChannelClosed,
                }
            }

            SessionEvent::ComponentFault(seq, error) => {
                if seq != self.session_seq {
                    return true;
                }
                state::Event::Fault(error.to_string())
            }
        };

        self.step(machine_event).await;
        true
    }

    /// Run one transition plus its actions. An action that fails feeds a
    /// fault back into the machine until it settles.
    async fn step(&mut self, mut event: state::Event) {
        loop {
            if let state::Event::Fault(cause) = &event {
                tracing::warn!(%cause, "component fault");
                self.last_fault = Some(cause.clone());
            }

            let (next, actions) = state::transition(self.state, &event);
            if next != self.state {
                tracing::info!(from = ?self.state, to = ?next, "session transition");
            }
            self.state = next;

            let mut fault = None;
            for action in actions {
                if let Err(cause) = self.perform(action).await {
                    fault = Some(cause);
                    break;
                }
            }

            match fault {
                Some(cause) => event = state::Event::Fault(cause),
                None => break,
            }
        }
    }

    async fn perform(&mut self, action: Action) -> Result<(), String> {
        match action {
            Action::Connect(role) => self.connect(role).map_err(|e| e.to_string()),
            Action::StartCapture => self.start_capture().map_err(|e| e.to_string()),
            Action::StartPlayback => self.start_playback().map_err(|e| e.to_string()),
            Action::Teardown => {
                self.teardown().await;
                Ok(())
            }
            Action::PublishStatus => {
                self.publish_status();
                Ok(())
            }
        }
    }

    /// Acquire the role's audio resources and begin opening its channel.
    /// The open outcome arrives later as a channel event.
    fn connect(&mut self, role: EndpointRole) -> Result<(), AudioError> {
        // Broadcasting is pointless without a capture device; fail before
        // the connection is attempted.
        let input = match role {
            EndpointRole::Broadcaster => Some(device::default_input()?),
            EndpointRole::Listener => None,
        };

        let url = self.config.server.endpoint_url(role);
        tracing::info!(%url, ?role, "opening channel");

        self.session_seq += 1;
        let seq = self.session_seq;

        let (channel, mut channel_events) = TransportChannel::open(role, url);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = channel_events.recv().await {
                if events_tx.send(SessionEvent::Channel(seq, event)).is_err() {
                    break;
                }
            }
        });

        self.session = Some(ActiveSession {
            channel,
            input,
            capture: None,
            playback: None,
            visualizer: None,
        });
        Ok(())
    }

    fn start_capture(&mut self) -> Result<(), AudioError> {
        let (input, frame_sender) = {
            let session = self
                .session
                .as_mut()
                .ok_or_else(|| AudioError::StreamFailed("no active session".to_string()))?;
            let input = match session.input.take() {
                Some(input) => input,
                // The device handle went stale between Connecting and
                // now; reacquire.
                None => device::default_input()?,
            };
            (input, session.channel.frame_sender())
        };

        let mut capture =
            CaptureEncoder::new(self.config.audio.frame_size, self.config.audio.hints);
        capture.start(input, frame_sender)?;
        self.spawn_fault_forwarder(capture.take_error_receiver());

        if let Some(session) = self.session.as_mut() {
            session.capture = Some(capture);
        }
        Ok(())
    }

    fn start_playback(&mut self) -> Result<(), AudioError> {
        if self.session.is_none() {
            return Err(AudioError::StreamFailed("no active session".to_string()));
        }

        let mut playback = PlaybackDecoder::new(self.vis_queue.clone());
        playback.start()?;
        self.spawn_fault_forwarder(playback.take_error_receiver());

        let mut visualizer = Visualizer::new(
            self.vis_queue.clone(),
            self.sink.clone(),
            self.config.visualizer.window,
            self.config.visualizer.refresh_rate_hz,
        );
        visualizer.start();

        if let Some(session) = self.session.as_mut() {
            session.playback = Some(playback);
            session.visualizer = Some(visualizer);
        }
        Ok(())
    }

    /// Forward errors from a component's stream thread into the event
    /// queue. The forwarder ends when the component drops its sender.
    fn spawn_fault_forwarder(&self, error_rx: Option<crossbeam_channel::Receiver<AudioError>>) {
        let Some(error_rx) = error_rx else {
            return;
        };
        let events_tx = self.events_tx.clone();
        let seq = self.session_seq;
        tokio::task::spawn_blocking(move || {
            while let Ok(error) = error_rx.recv() {
                if events_tx
                    .send(SessionEvent::ComponentFault(seq, error))
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    /// Release everything the current session owns. Partial teardown is
    /// never valid: every component present is stopped, the channel is
    /// closed, and the visualizer queue is drained.
    async fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            tracing::info!("tearing down session");

            if let Some(mut capture) = session.capture.take() {
                capture.stop();
            }
            if let Some(mut visualizer) = session.visualizer.take() {
                visualizer.stop().await;
            }
            if let Some(mut playback) = session.playback.take() {
                playback.stop();
            }
            session.channel.close();
        }
        self.vis_queue.clear();
    }

    fn publish_status(&mut self) {
        let message = match (&self.state, self.last_fault.take()) {
            (SessionState::Stopped, Some(fault)) => fault,
            (state, _) => state.status_text().to_string(),
        };
        let snapshot = StatusSnapshot {
            state: self.state,
            message,
            commands_enabled: self.state.is_quiescent(),
        };
        tracing::info!(state = ?snapshot.state, status = %snapshot.message, "status");
        let _ = self.status_tx.send(snapshot);
    }
}
