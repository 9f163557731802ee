//! Client session layer for peerchat.
//!
//! This crate turns a [`ChannelTransport`](peerchat_transport::ChannelTransport)
//! into a chat session:
//!
//! - **Controller** ([`SessionController`]): connect and handshake, inbound
//!   dispatch, outbound sends, shutdown.
//! - **Heartbeat** ([`Heartbeat`]): the periodic input-state broadcast on
//!   the unreliable channel.
//! - **Presentation** ([`Presenter`], [`PresenterEvent`]): one-way
//!   notifications for whatever draws the UI.
//! - **Config** ([`SessionConfig`]) and **errors** ([`SessionError`]).
//!
//! # Handshake
//!
//! ```text
//! client                                   server
//!   │── connect (signaling, channels open) ──│
//!   │── Hello { cached session id? } ───────→│
//!   │←──────── HelloReply { sid, username } ─│   heartbeat starts
//!   │←──────────────── LobbyInfo { names } ──│
//!   │── Buttons { pressed } (unreliable) ───→│   every interval
//!   │   ...                                  │
//!   │── Goodbye ────────────────────────────→│   shutdown
//! ```

mod config;
mod controller;
mod error;
mod heartbeat;
mod presenter;
mod roster;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use error::SessionError;
pub use heartbeat::Heartbeat;
pub use presenter::{Presenter, PresenterEvent};
pub use roster::Roster;

pub use peerchat_transport::ConnectionState;
