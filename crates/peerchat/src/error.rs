//! Unified error type for peerchat.

use peerchat_protocol::ProtocolError;
use peerchat_session::SessionError;
use peerchat_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// With the `peerchat` meta-crate you handle this one type instead of
/// importing each sub-crate's error. The `#[from]` conversions let `?`
/// lift sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PeerchatError {
    /// Connecting, signaling or sending failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A packet could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session operation was refused or the handshake failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}
