//! WebSocket relay transport using `tokio-tungstenite`.
//!
//! For deployments without a peer-to-peer stack, both logical channels ride
//! on one WebSocket. Each binary frame is the channel tag followed by the
//! packet:
//!
//! ```text
//! ┌─────┬──────────────────────┐
//! │ tag │ packet bytes ...     │   tag 0 = reliable, 1 = unreliable
//! └─────┴──────────────────────┘
//! ```
//!
//! A WebSocket is itself reliable and ordered, so the unreliable channel
//! simply gets stronger guarantees than it asks for. No signaling is needed:
//! the socket comes up as soon as the HTTP upgrade completes.

use std::sync::{Arc, Mutex};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    lock, Channel, ChannelEvent, ChannelTransport, PeerState, TransportError,
    TransportEvent, TransportEvents,
};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Prefixes a packet with its channel tag.
pub fn encode_frame(channel: Channel, packet: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(packet.len() + 1);
    frame.push(channel.tag());
    frame.extend_from_slice(packet);
    frame
}

/// Splits a frame into its channel and packet. `None` for an empty frame or
/// an unknown tag.
pub fn decode_frame(frame: &[u8]) -> Option<(Channel, &[u8])> {
    let (&tag, packet) = frame.split_first()?;
    Some((Channel::from_tag(tag)?, packet))
}

#[derive(Debug, Default)]
struct WsState {
    started: bool,
    writer: Option<mpsc::UnboundedSender<Message>>,
}

/// A [`ChannelTransport`] that connects to a WebSocket relay.
pub struct WebSocketTransport {
    url: String,
    state: Arc<Mutex<WsState>>,
}

impl WebSocketTransport {
    /// Creates a transport for the given `ws://` or `wss://` URL.
    /// Nothing happens on the network until [`connect`](ChannelTransport::connect).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: Arc::new(Mutex::new(WsState::default())),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChannelTransport for WebSocketTransport {
    async fn connect(&self) -> Result<TransportEvents, TransportError> {
        {
            let mut state = lock(&self.state);
            if state.started {
                return Err(TransportError::AlreadyConnected);
            }
            state.started = true;
        }

        let (ws, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let (sink, stream) = ws.split();

        // The upgrade completing means both channels are usable.
        for event in [
            TransportEvent::Peer(PeerState::Connecting),
            TransportEvent::Peer(PeerState::Connected),
            TransportEvent::Channel {
                channel: Channel::ReliableOrdered,
                event: ChannelEvent::Open,
            },
            TransportEvent::Channel {
                channel: Channel::Unreliable,
                event: ChannelEvent::Open,
            },
        ] {
            let _ = events_tx.send(event);
        }

        lock(&self.state).writer = Some(writer_tx);
        tokio::spawn(write_loop(sink, writer_rx));
        tokio::spawn(read_loop(stream, events_tx, Arc::clone(&self.state)));

        tracing::info!(url = %self.url, "websocket transport connected");
        Ok(events_rx)
    }

    fn send(&self, channel: Channel, data: &[u8]) -> Result<(), TransportError> {
        let state = lock(&self.state);
        let writer = state.writer.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("websocket not connected".into())
        })?;
        writer
            .send(Message::Binary(encode_frame(channel, data).into()))
            .map_err(|_| {
                TransportError::ConnectionClosed("websocket writer stopped".into())
            })
    }

    fn close(&self) {
        if let Some(writer) = lock(&self.state).writer.take() {
            tracing::debug!(url = %self.url, "closing websocket transport");
            let _ = writer.send(Message::Close(None));
        }
    }
}

/// Drains queued frames into the socket until a close frame goes out or the
/// transport drops its sender.
async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = outbound.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if let Err(e) = sink.send(msg).await {
            tracing::debug!(error = %e, "websocket write failed");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Turns incoming frames into transport events until the socket ends.
async fn read_loop(
    mut stream: SplitStream<WsStream>,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<Mutex<WsState>>,
) {
    loop {
        match stream.next().await {
            Some(Ok(Message::Binary(frame))) => match decode_frame(&frame) {
                Some((channel, packet)) => {
                    let _ = events.send(TransportEvent::Message {
                        channel,
                        data: packet.to_vec(),
                    });
                }
                None => {
                    tracing::warn!(
                        len = frame.len(),
                        "dropping websocket frame without a valid channel tag"
                    );
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                for channel in Channel::ALL {
                    let _ = events.send(TransportEvent::Channel {
                        channel,
                        event: ChannelEvent::Close,
                    });
                }
                let _ = events.send(TransportEvent::Peer(PeerState::Closed));
                break;
            }
            Some(Ok(_)) => continue, // text, ping, pong
            Some(Err(e)) => {
                tracing::warn!(error = %e, "websocket read failed");
                let _ = events.send(TransportEvent::Peer(PeerState::Failed));
                break;
            }
        }
    }
    lock(&state).writer = None;
}
