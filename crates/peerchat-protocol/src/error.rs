//! Error types for the protocol layer.
//!
//! Every decoding failure is local: the caller drops the one bad packet and
//! carries on. Encoding cannot fail.

use std::str::Utf8Error;

/// Errors that can occur while decoding a packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended in the middle of a varint.
    #[error("varint truncated after {read} bytes")]
    Truncated { read: usize },

    /// A read asked for more bytes than remain in the packet.
    #[error("read of {requested} bytes exceeds the {remaining} remaining")]
    OutOfBounds { requested: usize, remaining: usize },

    /// String bytes are not valid UTF-8.
    #[error("invalid utf-8 in string field: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    /// The leading id byte names no message kind in this direction.
    #[error("unknown message kind: {0:#04x}")]
    UnknownMessageKind(u8),
}
