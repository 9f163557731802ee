//! Error types for the session layer.

use peerchat_transport::TransportError;

/// Errors returned by [`SessionController`](crate::SessionController)
/// operations.
///
/// Inbound decoding problems never show up here: a bad packet is logged and
/// dropped, and the session carries on.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A send was attempted while the reliable channel isn't open, or after
    /// shutdown.
    #[error("session is not connected")]
    NotConnected,

    /// The transport failed or closed before the session opened.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// [`connect`](crate::SessionController::connect) was already called on
    /// this controller.
    #[error("session already started")]
    AlreadyStarted,

    /// The controller has been shut down and can't be reused.
    #[error("session has been shut down")]
    ShutDown,

    /// The transport refused a send.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
