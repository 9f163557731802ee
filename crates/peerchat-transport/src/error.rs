use crate::Channel;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Establishing the underlying connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The out-of-band signaling exchange failed.
    #[error("signaling failed: {0}")]
    Signaling(String),

    /// `connect` was called on a transport that already started connecting.
    #[error("transport already connected")]
    AlreadyConnected,

    /// A send was attempted on a channel that hasn't opened.
    #[error("{0} channel is not open")]
    ChannelNotOpen(Channel),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
}
