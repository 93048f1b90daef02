//! WebSocket transport channel
//!
//! One channel per session, connected to a role-specific endpoint on the
//! relay. The connection is driven by a spawned task; the owner observes
//! the lifecycle and inbound traffic as [`ChannelEvent`]s in the order the
//! connection produced them. Outbound frames go through an in-memory
//! queue so [`TransportChannel::send`] never blocks the caller: when the
//! channel is not open it fails immediately instead of queueing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::constants;
use crate::error::TransportError;
use crate::protocol::PcmFrame;

/// Which relay endpoint a channel connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Broadcaster,
    Listener,
}

impl EndpointRole {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Broadcaster => constants::BROADCAST_PATH,
            Self::Listener => constants::LISTEN_PATH,
        }
    }
}

/// Lifecycle and traffic events, delivered in connection arrival order.
#[derive(Debug)]
pub enum ChannelEvent {
    Opened,
    Binary(Vec<u8>),
    Text(String),
    Error(String),
    Closed,
}

enum Outbound {
    Frame(bytes::Bytes),
    Close,
}

/// Cloneable handle for pushing frames into a channel from another thread
/// (the capture callback). Fails fast when the channel is not open.
#[derive(Clone)]
pub struct FrameSender {
    open: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl FrameSender {
    /// Queue one frame as a single binary message.
    pub fn send(&self, frame: &PcmFrame) -> Result<(), TransportError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::NotOpen);
        }
        self.outbound
            .send(Outbound::Frame(frame.to_bytes()))
            .map_err(|_| TransportError::NotOpen)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// A persistent, message-framed connection to one relay endpoint.
pub struct TransportChannel {
    role: EndpointRole,
    open: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TransportChannel {
    /// Begin connecting to `url` (a full `ws://` or `wss://` address).
    ///
    /// Returns immediately; the outcome arrives on the event receiver as
    /// `Opened` or as `Error` followed by `Closed`.
    pub fn open(
        role: EndpointRole,
        url: String,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let open = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_connection(url, open.clone(), outbound_rx, events_tx));

        (
            Self {
                role,
                open,
                outbound: outbound_tx,
            },
            events_rx,
        )
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Handle for sending frames without holding the channel itself.
    pub fn frame_sender(&self) -> FrameSender {
        FrameSender {
            open: self.open.clone(),
            outbound: self.outbound.clone(),
        }
    }

    /// Send one frame as a single binary message. Fails if the channel is
    /// not open; nothing is queued for later delivery.
    pub fn send(&self, frame: &PcmFrame) -> Result<(), TransportError> {
        self.frame_sender().send(frame)
    }

    /// Close the channel. Idempotent; safe on a channel that never
    /// finished connecting.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        let _ = self.outbound.send(Outbound::Close);
    }
}

async fn run_connection(
    url: String,
    open: Arc<AtomicBool>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let ws = match connect_async(&url).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!(%url, error = %e, "websocket connect failed");
            let _ = events.send(ChannelEvent::Error(e.to_string()));
            let _ = events.send(ChannelEvent::Closed);
            return;
        }
    };

    open.store(true, Ordering::Release);
    let _ = events.send(ChannelEvent::Opened);
    tracing::debug!(%url, "websocket connected");

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Frame(bytes)) => {
                    if let Err(e) = sink.send(Message::Binary(bytes.to_vec())).await {
                        open.store(false, Ordering::Release);
                        let _ = events.send(ChannelEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    let _ = events.send(ChannelEvent::Binary(data));
                }
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(ChannelEvent::Text(text));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    let _ = events.send(ChannelEvent::Error(e.to_string()));
                    break;
                }
            },
        }
    }

    open.store(false, Ordering::Release);
    let _ = events.send(ChannelEvent::Closed);
    tracing::debug!(%url, "websocket closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_paths() {
        assert_eq!(EndpointRole::Broadcaster.path(), "/broadcast");
        assert_eq!(EndpointRole::Listener.path(), "/listen");
    }
}
