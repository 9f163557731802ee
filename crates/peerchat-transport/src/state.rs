//! Connection lifecycle derived from raw transport events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Channel, ChannelEvent, PeerState, TransportEvent};

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session's connection.
///
/// ```text
///   Connecting ──(connected / reliable open)──→ Connected
///       ↑                                          │
///       └──────────────(disconnected)──────────────┘
///
///   any ──(closed / reliable close / local shutdown)──→ ClosedGraceful
///   any ──(failed)──────────────────────────────────→ ClosedAbnormal
/// ```
///
/// Both closed states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Initial state, and the state while recovering from a transient
    /// disconnect.
    Connecting,
    Connected,
    /// Expected close: local shutdown or a clean remote close.
    ClosedGraceful,
    /// The transport reported a failure.
    ClosedAbnormal,
}

impl ConnectionState {
    /// Returns `true` for either terminal state.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::ClosedGraceful | Self::ClosedAbnormal)
    }

    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::ClosedGraceful => write!(f, "ClosedGraceful"),
            Self::ClosedAbnormal => write!(f, "ClosedAbnormal"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionStateMachine
// ---------------------------------------------------------------------------

/// Folds peer and channel events into a [`ConnectionState`].
///
/// Every input method returns `Some(new_state)` only when the state actually
/// changed, so a subscriber notified from those return values hears about
/// each change exactly once no matter how many raw events caused it.
///
/// The machine also remembers which channels are open. Channel readiness is
/// tracked separately from the lifecycle state: the unreliable channel
/// opening or closing never changes the state.
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    open: [bool; 2],
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            open: [false; 2],
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the given channel has reported `open` and not yet `close`.
    pub fn is_channel_open(&self, channel: Channel) -> bool {
        self.open[channel.index()]
    }

    /// Applies any transport event. Messages never change the state.
    pub fn apply(&mut self, event: &TransportEvent) -> Option<ConnectionState> {
        match event {
            TransportEvent::Peer(peer) => self.on_peer_state(*peer),
            TransportEvent::Channel { channel, event } => {
                self.on_channel_event(*channel, *event)
            }
            TransportEvent::Message { .. } => None,
        }
    }

    /// Applies a peer-connection state change.
    pub fn on_peer_state(&mut self, peer: PeerState) -> Option<ConnectionState> {
        let next = match peer {
            PeerState::New | PeerState::Connecting | PeerState::Disconnected => {
                ConnectionState::Connecting
            }
            PeerState::Connected => ConnectionState::Connected,
            PeerState::Failed => ConnectionState::ClosedAbnormal,
            PeerState::Closed => ConnectionState::ClosedGraceful,
        };
        self.transition(next)
    }

    /// Applies a channel open/close.
    ///
    /// Only the reliable channel drives the lifecycle: its `open` means
    /// `Connected`, its `close` means the session is over.
    pub fn on_channel_event(
        &mut self,
        channel: Channel,
        event: ChannelEvent,
    ) -> Option<ConnectionState> {
        self.open[channel.index()] = matches!(event, ChannelEvent::Open);

        if !channel.is_reliable() {
            return None;
        }
        match event {
            ChannelEvent::Open => self.transition(ConnectionState::Connected),
            ChannelEvent::Close => {
                self.transition(ConnectionState::ClosedGraceful)
            }
        }
    }

    /// Records an intentional local close.
    pub fn close_gracefully(&mut self) -> Option<ConnectionState> {
        self.open = [false; 2];
        self.transition(ConnectionState::ClosedGraceful)
    }

    fn transition(&mut self, next: ConnectionState) -> Option<ConnectionState> {
        if self.state.is_closed() || self.state == next {
            return None;
        }
        tracing::debug!(from = %self.state, to = %next, "connection state changed");
        self.state = next;
        Some(next)
    }
}
