//! The message catalog.
//!
//! Every packet starts with one kind byte. Client→server and server→client
//! messages have separate id spaces that overlap numerically, so a packet
//! can only be decoded by a reader that knows which direction it travelled.
//!
//! ```text
//!   C2S                                   S2C
//!   0x00 Hello      [sid: 8]?             0x00 HelloReply   sid: 8, name: rest
//!   0x01 SendMsg    text: rest            0x01 ReceiveMsg   text: lp
//!   0x02 SetName    name: rest            0x02 SetNameReply name: lp
//!   0x03 Goodbye                          0x03 LobbyInfo    count, name: lp ...
//!   0x04 Buttons    pressed: u8
//!
//!   rest = every remaining byte as UTF-8
//!   lp   = varint byte length + UTF-8
//! ```
//!
//! Kinds are closed enums, so encode and decode are exhaustive matches and
//! adding a kind is a compile-time change on both sides.
//!
//! Fields a message doesn't declare are ignored: bytes after the last
//! declared field are not an error.

use std::fmt;

use peerchat_transport::Channel;
use serde::{Deserialize, Serialize};

use crate::{Packet, PacketDecoder, PacketEncoder, ProtocolError};

/// Width of a session id on the wire.
pub const SESSION_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque identifier the server issues in [`ServerMessage::HelloReply`].
///
/// A client keeps it and offers it in a later [`ClientMessage::Hello`] to
/// pick up the same session. Displayed as 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub [u8; SESSION_ID_LEN]);

impl SessionId {
    pub fn as_bytes(&self) -> &[u8; SESSION_ID_LEN] {
        &self.0
    }
}

impl From<[u8; SESSION_ID_LEN]> for SessionId {
    fn from(bytes: [u8; SESSION_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WireMessage
// ---------------------------------------------------------------------------

/// A message that has a binary packet form.
pub trait WireMessage: Sized {
    /// Encodes the kind byte followed by the payload.
    fn encode(&self) -> Packet;

    /// Decodes a whole packet.
    ///
    /// # Errors
    /// - [`ProtocolError::OutOfBounds`] for an empty packet or a field that
    ///   runs past the end.
    /// - [`ProtocolError::UnknownMessageKind`] if the kind byte is not in
    ///   this direction's id space.
    /// - [`ProtocolError::InvalidUtf8`] or [`ProtocolError::Truncated`] for
    ///   a malformed field.
    fn decode(packet: &[u8]) -> Result<Self, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Kind ids for client→server messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClientKind {
    Hello = 0x00,
    SendMsg = 0x01,
    SetName = 0x02,
    Goodbye = 0x03,
    Buttons = 0x04,
}

impl ClientKind {
    pub const ALL: [ClientKind; 5] = [
        Self::Hello,
        Self::SendMsg,
        Self::SetName,
        Self::Goodbye,
        Self::Buttons,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Opens the session, optionally resuming an earlier one.
    Hello { session_id: Option<SessionId> },
    /// A chat line.
    SendMsg { text: String },
    /// Asks for a new display name. The server answers with
    /// [`ServerMessage::SetNameReply`].
    SetName { name: String },
    /// The client is leaving on purpose.
    Goodbye,
    /// Current input state. Sent repeatedly on the unreliable channel, so
    /// only the latest one matters.
    Buttons { pressed: bool },
}

impl ClientMessage {
    pub fn kind(&self) -> ClientKind {
        match self {
            Self::Hello { .. } => ClientKind::Hello,
            Self::SendMsg { .. } => ClientKind::SendMsg,
            Self::SetName { .. } => ClientKind::SetName,
            Self::Goodbye => ClientKind::Goodbye,
            Self::Buttons { .. } => ClientKind::Buttons,
        }
    }

    /// The channel this message travels on.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Buttons { .. } => Channel::Unreliable,
            _ => Channel::ReliableOrdered,
        }
    }
}

impl WireMessage for ClientMessage {
    fn encode(&self) -> Packet {
        let mut enc = PacketEncoder::new();
        enc.append_u8(self.kind().id());
        match self {
            Self::Hello { session_id } => {
                if let Some(id) = session_id {
                    enc.append_bytes(id.as_bytes());
                }
            }
            Self::SendMsg { text } => {
                enc.append_exhaustive_string(text);
            }
            Self::SetName { name } => {
                enc.append_exhaustive_string(name);
            }
            Self::Goodbye => {}
            Self::Buttons { pressed } => {
                enc.append_u8(u8::from(*pressed));
            }
        }
        enc.finish()
    }

    fn decode(packet: &[u8]) -> Result<Self, ProtocolError> {
        let mut dec = PacketDecoder::new(packet);
        let id = dec.read_u8()?;
        let kind =
            ClientKind::from_id(id).ok_or(ProtocolError::UnknownMessageKind(id))?;
        Ok(match kind {
            ClientKind::Hello => {
                // The id is either all there or absent.
                let session_id = if dec.is_empty() {
                    None
                } else {
                    Some(SessionId(dec.read_array_bytes()?))
                };
                Self::Hello { session_id }
            }
            ClientKind::SendMsg => Self::SendMsg {
                text: dec.read_exhaustive_string()?,
            },
            ClientKind::SetName => Self::SetName {
                name: dec.read_exhaustive_string()?,
            },
            ClientKind::Goodbye => Self::Goodbye,
            ClientKind::Buttons => Self::Buttons {
                pressed: dec.read_u8()? != 0,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Kind ids for server→client messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ServerKind {
    HelloReply = 0x00,
    ReceiveMsg = 0x01,
    SetNameReply = 0x02,
    LobbyInfo = 0x03,
}

impl ServerKind {
    pub const ALL: [ServerKind; 4] = [
        Self::HelloReply,
        Self::ReceiveMsg,
        Self::SetNameReply,
        Self::LobbyInfo,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Accepts a `Hello`: the session id to keep and the assigned name.
    HelloReply {
        session_id: SessionId,
        username: String,
    },
    /// A chat line to show.
    ReceiveMsg { text: String },
    /// The name the server settled on after a `SetName`.
    SetNameReply { username: String },
    /// Everyone currently present, in display order.
    LobbyInfo { usernames: Vec<String> },
}

impl ServerMessage {
    pub fn kind(&self) -> ServerKind {
        match self {
            Self::HelloReply { .. } => ServerKind::HelloReply,
            Self::ReceiveMsg { .. } => ServerKind::ReceiveMsg,
            Self::SetNameReply { .. } => ServerKind::SetNameReply,
            Self::LobbyInfo { .. } => ServerKind::LobbyInfo,
        }
    }
}

impl WireMessage for ServerMessage {
    fn encode(&self) -> Packet {
        let mut enc = PacketEncoder::new();
        enc.append_u8(self.kind().id());
        match self {
            Self::HelloReply {
                session_id,
                username,
            } => {
                enc.append_bytes(session_id.as_bytes())
                    .append_exhaustive_string(username);
            }
            Self::ReceiveMsg { text } => {
                enc.append_length_prefixed_string(text);
            }
            Self::SetNameReply { username } => {
                enc.append_length_prefixed_string(username);
            }
            Self::LobbyInfo { usernames } => {
                enc.append_array(usernames, |enc, name| {
                    enc.append_length_prefixed_string(name);
                });
            }
        }
        enc.finish()
    }

    fn decode(packet: &[u8]) -> Result<Self, ProtocolError> {
        let mut dec = PacketDecoder::new(packet);
        let id = dec.read_u8()?;
        let kind =
            ServerKind::from_id(id).ok_or(ProtocolError::UnknownMessageKind(id))?;
        Ok(match kind {
            ServerKind::HelloReply => Self::HelloReply {
                session_id: SessionId(dec.read_array_bytes()?),
                username: dec.read_exhaustive_string()?,
            },
            ServerKind::ReceiveMsg => Self::ReceiveMsg {
                text: dec.read_length_prefixed_string()?,
            },
            ServerKind::SetNameReply => Self::SetNameReply {
                username: dec.read_length_prefixed_string()?,
            },
            ServerKind::LobbyInfo => Self::LobbyInfo {
                usernames: dec.read_array(|d| d.read_length_prefixed_string())?,
            },
        })
    }
}
