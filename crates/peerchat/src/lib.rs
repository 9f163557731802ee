//! # peerchat
//!
//! Real-time chat session layer over a transport with a reliable and an
//! unreliable channel.
//!
//! A client connects through a [`ChannelTransport`](peerchat_transport::ChannelTransport),
//! performs a small binary handshake, and then exchanges chat lines, name
//! changes and roster updates on the reliable channel while a heartbeat
//! reports input state on the unreliable one.
//!
//! The layers are separate crates, re-exported here:
//!
//! - [`transport`]: channels, transport events, connection state machine,
//!   in-process and WebSocket transports.
//! - [`protocol`]: varints, packet encoder/decoder, the message catalog.
//! - [`session`]: the session controller, heartbeat and presenter hooks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peerchat::prelude::*;
//!
//! # async fn demo() -> Result<(), PeerchatError> {
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PresenterEvent>();
//! let mut client = PeerchatClientBuilder::new()
//!     .url("ws://127.0.0.1:3000/session")
//!     .connect(tx)
//!     .await?;
//!
//! client.send_message("hi all")?;
//! while client.process_next_event().await {
//!     while let Ok(event) = rx.try_recv() {
//!         println!("{event:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{PeerchatClient, PeerchatClientBuilder, DEFAULT_URL};
pub use error::PeerchatError;

pub use peerchat_protocol as protocol;
pub use peerchat_session as session;
pub use peerchat_transport as transport;

/// Everything a typical client needs.
pub mod prelude {
    pub use crate::{PeerchatClient, PeerchatClientBuilder, PeerchatError};
    pub use peerchat_protocol::{ClientMessage, ServerMessage, SessionId, WireMessage};
    pub use peerchat_session::{
        Presenter, PresenterEvent, SessionConfig, SessionController, SessionError,
    };
    pub use peerchat_transport::{
        Channel, ChannelTransport, ConnectionState, TransportError, WebSocketTransport,
    };
}
