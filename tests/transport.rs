//! Transport channel integration tests
//!
//! Each test runs a minimal in-process WebSocket endpoint and checks the
//! channel's event contract: lifecycle ordering, fail-fast sends, and
//! idempotent close.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use ws_audio_streamer::codec;
use ws_audio_streamer::transport::{ChannelEvent, EndpointRole, TransportChannel};

struct Endpoint {
    url: String,
    /// Messages the endpoint received from the channel under test
    inbound: mpsc::UnboundedReceiver<Message>,
    /// Messages to push to the channel under test; dropping this sender
    /// makes the endpoint close the connection
    inject: mpsc::UnboundedSender<Message>,
}

/// Accept exactly one connection and bridge it to a pair of channels.
async fn spawn_endpoint(path: &str) -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (inject_tx, mut inject_rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut source) = ws.split();

        loop {
            tokio::select! {
                msg = source.next() => match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(msg)) => {
                        let _ = inbound_tx.send(msg);
                    }
                },
                msg = inject_rx.recv() => match msg {
                    Some(msg) => {
                        if sink.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                },
            }
        }
    });

    Endpoint {
        url: format!("ws://127.0.0.1:{}{}", addr.port(), path),
        inbound: inbound_rx,
        inject: inject_tx,
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for channel event")
        .expect("event stream ended unexpectedly")
}

#[tokio::test]
async fn opened_then_frame_reaches_endpoint() {
    let mut endpoint = spawn_endpoint("/broadcast").await;
    let (channel, mut events) = TransportChannel::open(EndpointRole::Broadcaster, endpoint.url);

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Opened));
    assert!(channel.is_open());

    let frame = codec::encode(&[0.0, 0.5, -0.5, 1.0]);
    channel.send(&frame).unwrap();

    let received = timeout(Duration::from_secs(5), endpoint.inbound.recv())
        .await
        .unwrap()
        .unwrap();
    match received {
        Message::Binary(bytes) => assert_eq!(bytes, frame.to_bytes().to_vec()),
        other => panic!("expected binary message, got {other:?}"),
    }
}

#[tokio::test]
async fn inbound_events_preserve_arrival_order() {
    let endpoint = spawn_endpoint("/listen").await;
    let (_channel, mut events) = TransportChannel::open(EndpointRole::Listener, endpoint.url);

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Opened));

    endpoint
        .inject
        .send(Message::Binary(vec![0x01, 0x00]))
        .unwrap();
    endpoint
        .inject
        .send(Message::Text(r#"{"mimeType":"audio/pcm"}"#.to_string()))
        .unwrap();
    endpoint
        .inject
        .send(Message::Binary(vec![0x02, 0x00]))
        .unwrap();

    match next_event(&mut events).await {
        ChannelEvent::Binary(bytes) => assert_eq!(bytes, vec![0x01, 0x00]),
        other => panic!("expected first binary, got {other:?}"),
    }
    match next_event(&mut events).await {
        ChannelEvent::Text(text) => assert!(text.contains("mimeType")),
        other => panic!("expected text, got {other:?}"),
    }
    match next_event(&mut events).await {
        ChannelEvent::Binary(bytes) => assert_eq!(bytes, vec![0x02, 0x00]),
        other => panic!("expected second binary, got {other:?}"),
    }
}

#[tokio::test]
async fn send_fails_fast_when_never_opened() {
    // Nothing listens on this address; the connect attempt fails.
    let (channel, mut events) =
        TransportChannel::open(EndpointRole::Broadcaster, "ws://127.0.0.1:1/broadcast".into());

    let frame = codec::encode(&[0.1]);
    assert!(channel.send(&frame).is_err());

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Error(_)));
    assert!(matches!(next_event(&mut events).await, ChannelEvent::Closed));
    assert!(!channel.is_open());
}

#[tokio::test]
async fn close_is_idempotent_and_send_fails_after() {
    let endpoint = spawn_endpoint("/broadcast").await;
    let (channel, mut events) = TransportChannel::open(EndpointRole::Broadcaster, endpoint.url);

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Opened));

    channel.close();
    channel.close();

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Closed));
    assert!(channel.send(&codec::encode(&[0.1])).is_err());

    // A third close on a fully closed channel is still fine.
    channel.close();
}

#[tokio::test]
async fn remote_close_emits_closed() {
    let endpoint = spawn_endpoint("/listen").await;
    let (channel, mut events) = TransportChannel::open(EndpointRole::Listener, endpoint.url);

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Opened));

    // Dropping the inject side makes the endpoint close the connection.
    drop(endpoint.inject);

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Closed));
    assert!(channel.send(&codec::encode(&[0.1])).is_err());
}
