//! Transport abstraction layer for peerchat.
//!
//! A peerchat session runs over a transport that multiplexes two logical
//! channels with different delivery guarantees:
//!
//! - [`Channel::ReliableOrdered`]: every packet arrives, in order.
//! - [`Channel::Unreliable`]: packets may be lost or reordered.
//!
//! The [`ChannelTransport`] trait is the seam between the session layer and
//! whatever actually moves bytes (a WebRTC peer connection, a WebSocket
//! relay, an in-process pipe). Transports report what happens to them as a
//! stream of [`TransportEvent`]s, and the [`ConnectionStateMachine`] folds
//! those raw events into a small lifecycle:
//!
//! ```text
//! Connecting ──→ Connected ──→ ClosedGraceful
//!     ↑  │           │
//!     └──┼───────────┘ (disconnected)
//!        └──────────────────→ ClosedAbnormal
//! ```
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket relay transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
pub mod memory;
mod signaling;
mod state;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{memory_pair, LoopbackSignaler, MemoryPeer, MemoryTransport};
pub use signaling::{
    IceCandidate, SdpType, SessionDescription, SignalingAnswer, Signaler,
};
pub use state::{ConnectionState, ConnectionStateMachine};
#[cfg(feature = "websocket")]
pub use websocket::{decode_frame, encode_frame, WebSocketTransport};

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// One of the two logical streams carried by a transport.
///
/// Ordering and delivery are whatever the underlying channel provides.
/// Nothing in peerchat retransmits or reorders on top of it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Delivered in order, no loss. Handshake, chat and name changes.
    #[default]
    ReliableOrdered,

    /// May be lost, may arrive out of order. Input-state heartbeats, where
    /// only the latest value matters.
    Unreliable,
}

impl Channel {
    /// Both channels, reliable first.
    pub const ALL: [Channel; 2] = [Channel::ReliableOrdered, Channel::Unreliable];

    /// Returns `true` for the reliable-ordered channel.
    pub fn is_reliable(self) -> bool {
        matches!(self, Self::ReliableOrdered)
    }

    /// Single-byte tag used by transports that multiplex both channels
    /// over one stream.
    pub fn tag(self) -> u8 {
        match self {
            Self::ReliableOrdered => 0,
            Self::Unreliable => 1,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::ReliableOrdered),
            1 => Some(Self::Unreliable),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.tag() as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReliableOrdered => write!(f, "reliable"),
            Self::Unreliable => write!(f, "unreliable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Peer-connection states as reported by the underlying transport.
///
/// These mirror the WebRTC `RTCPeerConnectionState` values. Transports that
/// aren't WebRTC map their own lifecycle onto the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    /// Connectivity was lost; the transport may still recover.
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Open/close notifications for a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEvent {
    Open,
    Close,
}

/// Everything a transport can tell its owner.
///
/// Events for one transport are delivered in the order the transport
/// observed them. Messages on [`Channel::Unreliable`] carry no ordering
/// guarantee relative to each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The peer connection changed state.
    Peer(PeerState),

    /// A channel opened or closed.
    Channel {
        channel: Channel,
        event: ChannelEvent,
    },

    /// A complete packet arrived. Packet boundaries come from the channel;
    /// there is no length prefix on the wire.
    Message { channel: Channel, data: Vec<u8> },
}

/// Receiving half of a transport's event stream.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// A connection to one remote peer carrying a reliable and an unreliable
/// channel.
///
/// `send` and `close` never block: implementations queue outbound data and
/// return immediately. Only [`connect`](Self::connect) suspends, while the
/// out-of-band signaling exchange runs.
pub trait ChannelTransport: Send + Sync + 'static {
    /// Starts connecting to the remote peer.
    ///
    /// Performs signaling (if the transport needs it) and returns the event
    /// stream for this connection. Channel-open events arrive on that
    /// stream; `connect` does not wait for them.
    ///
    /// # Errors
    /// - [`TransportError::AlreadyConnected`] if called twice.
    /// - [`TransportError::Signaling`] / [`TransportError::ConnectFailed`]
    ///   if the connection attempt fails outright.
    async fn connect(&self) -> Result<TransportEvents, TransportError>;

    /// Queues a packet on the given channel.
    ///
    /// # Errors
    /// Returns [`TransportError::ChannelNotOpen`] if the channel hasn't
    /// opened yet, or [`TransportError::ConnectionClosed`] once the
    /// transport is closed.
    fn send(&self, channel: Channel, data: &[u8]) -> Result<(), TransportError>;

    /// Tears down both channels and the peer connection.
    ///
    /// Idempotent: closing an already-closed transport does nothing.
    fn close(&self);
}

/// Locks a std mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
