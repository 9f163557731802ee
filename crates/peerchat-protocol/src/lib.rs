//! Binary wire protocol for peerchat.
//!
//! This crate defines the bytes that travel over each channel:
//!
//! - **Varints** ([`encode_varint`], [`decode_varint`]): base-128 lengths
//!   and counts, capped at four bytes.
//! - **Packet I/O** ([`PacketEncoder`], [`Packet`], [`PacketDecoder`]):
//!   fixed, length-prefixed, rest-of-packet and repeated fields.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`WireMessage`]):
//!   the catalog and its exact layouts.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (channels of raw packets)
//! and the session (identity, roster, heartbeat). It knows nothing about
//! connections, only how a message becomes a packet and back.
//!
//! ```text
//! Transport (packets per channel) → Protocol (messages) → Session
//! ```
//!
//! There's no outer framing: a channel delivers whole packets, so message
//! boundaries are the channel's job.

mod decoder;
mod encoder;
mod error;
mod message;
mod varint;

pub use decoder::PacketDecoder;
pub use encoder::{grown_capacity, Packet, PacketEncoder, GROWTH_STEP, INITIAL_CAPACITY};
pub use error::ProtocolError;
pub use message::{
    ClientKind, ClientMessage, ServerKind, ServerMessage, SessionId, WireMessage,
    SESSION_ID_LEN,
};
pub use varint::{
    decode_varint, encode_varint, varint_len, MAX_VARINT_BYTES, MAX_VARINT_VALUE,
    VARINT_VALUE_BITS,
};
