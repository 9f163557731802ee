//! In-process transport pair.
//!
//! [`memory_pair`] returns the two ends of a fake peer connection:
//!
//! - [`MemoryTransport`] implements [`ChannelTransport`] and is handed to
//!   the session layer like any real transport.
//! - [`MemoryPeer`] plays the remote side. It decides when the connection
//!   comes up or fails, delivers inbound packets, and sees every packet the
//!   local side sent, tagged with its channel.
//!
//! Events the peer injects before `connect()` is called are buffered, so a
//! test can script the whole remote behaviour up front.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::{
    lock, Channel, ChannelEvent, ChannelTransport, PeerState,
    SessionDescription, SignalingAnswer, Signaler, TransportError,
    TransportEvent, TransportEvents,
};

/// Connection status shared by both ends.
#[derive(Debug, Default)]
struct LinkState {
    open: [bool; 2],
    closed: bool,
}

/// Creates a connected transport/peer pair that signals through `signaler`.
pub fn memory_pair<S: Signaler>(signaler: S) -> (MemoryTransport<S>, MemoryPeer) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let link = Arc::new(Mutex::new(LinkState::default()));

    let transport = MemoryTransport {
        signaler,
        events_tx: events_tx.clone(),
        events_rx: Mutex::new(Some(events_rx)),
        outbound_tx,
        link: Arc::clone(&link),
    };
    let peer = MemoryPeer {
        events_tx,
        outbound_rx,
        link,
    };
    (transport, peer)
}

// ---------------------------------------------------------------------------
// MemoryTransport
// ---------------------------------------------------------------------------

/// The local end of an in-process connection. See [`memory_pair`].
pub struct MemoryTransport<S> {
    signaler: S,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<TransportEvents>>,
    outbound_tx: mpsc::UnboundedSender<(Channel, Vec<u8>)>,
    link: Arc<Mutex<LinkState>>,
}

impl<S: Signaler> ChannelTransport for MemoryTransport<S> {
    async fn connect(&self) -> Result<TransportEvents, TransportError> {
        let events = lock(&self.events_rx)
            .take()
            .ok_or(TransportError::AlreadyConnected)?;

        let offer = SessionDescription::offer("v=0 peerchat-memory");
        match self.signaler.exchange(offer).await {
            Ok(answer) => {
                tracing::debug!(
                    candidates = answer.candidates.len(),
                    "memory transport signaling complete"
                );
                Ok(events)
            }
            Err(e) => {
                lock(&self.link).closed = true;
                Err(e)
            }
        }
    }

    fn send(&self, channel: Channel, data: &[u8]) -> Result<(), TransportError> {
        {
            let link = lock(&self.link);
            if link.closed {
                return Err(TransportError::ConnectionClosed(
                    "memory transport closed".into(),
                ));
            }
            if !link.open[channel.index()] {
                return Err(TransportError::ChannelNotOpen(channel));
            }
        }
        self.outbound_tx
            .send((channel, data.to_vec()))
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    fn close(&self) {
        let mut link = lock(&self.link);
        if link.closed {
            return;
        }
        link.closed = true;
        for channel in Channel::ALL {
            if std::mem::take(&mut link.open[channel.index()]) {
                let _ = self.events_tx.send(TransportEvent::Channel {
                    channel,
                    event: ChannelEvent::Close,
                });
            }
        }
        let _ = self.events_tx.send(TransportEvent::Peer(PeerState::Closed));
        tracing::trace!("memory transport closed");
    }
}

// ---------------------------------------------------------------------------
// MemoryPeer
// ---------------------------------------------------------------------------

/// The remote end of an in-process connection. See [`memory_pair`].
pub struct MemoryPeer {
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    outbound_rx: mpsc::UnboundedReceiver<(Channel, Vec<u8>)>,
    link: Arc<Mutex<LinkState>>,
}

impl MemoryPeer {
    /// Reports a peer-connection state change to the local side.
    ///
    /// `Failed` and `Closed` also shut the link, so later local sends fail.
    pub fn set_peer_state(&self, state: PeerState) {
        if matches!(state, PeerState::Failed | PeerState::Closed) {
            lock(&self.link).closed = true;
        }
        self.emit(TransportEvent::Peer(state));
    }

    pub fn open_channel(&self, channel: Channel) {
        lock(&self.link).open[channel.index()] = true;
        self.emit(TransportEvent::Channel {
            channel,
            event: ChannelEvent::Open,
        });
    }

    pub fn close_channel(&self, channel: Channel) {
        lock(&self.link).open[channel.index()] = false;
        self.emit(TransportEvent::Channel {
            channel,
            event: ChannelEvent::Close,
        });
    }

    /// Brings the connection fully up: `connecting`, `connected`, then both
    /// channels open.
    pub fn establish(&self) {
        self.set_peer_state(PeerState::Connecting);
        self.set_peer_state(PeerState::Connected);
        self.open_channel(Channel::ReliableOrdered);
        self.open_channel(Channel::Unreliable);
    }

    /// Delivers a packet to the local side.
    pub fn deliver(&self, channel: Channel, data: impl Into<Vec<u8>>) {
        self.emit(TransportEvent::Message {
            channel,
            data: data.into(),
        });
    }

    /// Waits for the next packet the local side sent.
    ///
    /// Returns `None` once the local transport has been dropped.
    pub async fn recv(&mut self) -> Option<(Channel, Vec<u8>)> {
        self.outbound_rx.recv().await
    }

    /// Returns the next already-sent packet without waiting.
    pub fn try_recv(&mut self) -> Option<(Channel, Vec<u8>)> {
        self.outbound_rx.try_recv().ok()
    }

    /// Takes every packet sent so far.
    pub fn drain(&mut self) -> Vec<(Channel, Vec<u8>)> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Whether either side has closed the link.
    pub fn is_closed(&self) -> bool {
        lock(&self.link).closed
    }

    fn emit(&self, event: TransportEvent) {
        let _ = self.events_tx.send(event);
    }
}

// ---------------------------------------------------------------------------
// LoopbackSignaler
// ---------------------------------------------------------------------------

/// A [`Signaler`] that answers every offer immediately, with no candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackSignaler;

impl Signaler for LoopbackSignaler {
    async fn exchange(
        &self,
        offer: SessionDescription,
    ) -> Result<SignalingAnswer, TransportError> {
        Ok(SignalingAnswer {
            description: SessionDescription::answer(offer.sdp),
            candidates: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingSignaler;

    impl Signaler for RejectingSignaler {
        async fn exchange(
            &self,
            _offer: SessionDescription,
        ) -> Result<SignalingAnswer, TransportError> {
            Err(TransportError::Signaling("503 from /connect".into()))
        }
    }

    #[tokio::test]
    async fn test_events_injected_before_connect_are_buffered() {
        let (transport, peer) = memory_pair(LoopbackSignaler);
        peer.establish();

        let mut events = transport.connect().await.expect("should connect");
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Peer(PeerState::Connecting))
        );
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Peer(PeerState::Connected))
        );
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Channel {
                channel: Channel::ReliableOrdered,
                event: ChannelEvent::Open,
            })
        );
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let (transport, _peer) = memory_pair(LoopbackSignaler);
        transport.connect().await.expect("first connect");
        let second = transport.connect().await;
        assert!(matches!(second, Err(TransportError::AlreadyConnected)));
    }

    #[tokio::test]
    async fn test_signaling_failure_closes_link() {
        let (transport, peer) = memory_pair(RejectingSignaler);
        let result = transport.connect().await;
        assert!(matches!(result, Err(TransportError::Signaling(_))));
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_send_requires_open_channel() {
        let (transport, peer) = memory_pair(LoopbackSignaler);
        let _events = transport.connect().await.unwrap();

        let err = transport.send(Channel::ReliableOrdered, &[1]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ChannelNotOpen(Channel::ReliableOrdered)
        ));

        peer.open_channel(Channel::ReliableOrdered);
        transport.send(Channel::ReliableOrdered, &[1]).unwrap();
        assert!(transport.send(Channel::Unreliable, &[2]).is_err());
    }

    #[tokio::test]
    async fn test_peer_sees_sent_packets_with_channel() {
        let (transport, mut peer) = memory_pair(LoopbackSignaler);
        peer.establish();
        let _events = transport.connect().await.unwrap();

        transport.send(Channel::ReliableOrdered, b"chat").unwrap();
        transport.send(Channel::Unreliable, &[4, 1]).unwrap();

        assert_eq!(
            peer.recv().await,
            Some((Channel::ReliableOrdered, b"chat".to_vec()))
        );
        assert_eq!(peer.drain(), vec![(Channel::Unreliable, vec![4, 1])]);
    }

    #[tokio::test]
    async fn test_close_emits_channel_close_and_peer_closed_once() {
        let (transport, peer) = memory_pair(LoopbackSignaler);
        peer.open_channel(Channel::ReliableOrdered);
        let mut events = transport.connect().await.unwrap();
        let _ = events.recv().await; // reliable open

        transport.close();
        transport.close();

        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Channel {
                channel: Channel::ReliableOrdered,
                event: ChannelEvent::Close,
            })
        );
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Peer(PeerState::Closed))
        );
        assert!(events.try_recv().is_err());
        assert!(peer.is_closed());
        assert!(matches!(
            transport.send(Channel::ReliableOrdered, &[0]),
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_peer_failure_blocks_sends() {
        let (transport, peer) = memory_pair(LoopbackSignaler);
        peer.establish();
        let _events = transport.connect().await.unwrap();

        peer.set_peer_state(PeerState::Failed);
        assert!(transport.send(Channel::ReliableOrdered, &[0]).is_err());
    }
}
