//! Client builder.
//!
//! Wires the WebSocket relay transport to a [`SessionController`], the
//! common setup for a native client. Custom transports can build a
//! controller directly with [`SessionController::new`].

use peerchat_session::{Presenter, SessionConfig, SessionController};
use peerchat_transport::WebSocketTransport;
use tracing::debug;

use crate::PeerchatError;

/// A session over the WebSocket relay transport.
pub type PeerchatClient<P> = SessionController<WebSocketTransport, P>;

/// Default relay endpoint.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:3000/session";

/// Builder for a [`PeerchatClient`].
///
/// # Example
///
/// ```rust,no_run
/// use peerchat::prelude::*;
///
/// # async fn demo() -> Result<(), PeerchatError> {
/// let mut client = PeerchatClientBuilder::new()
///     .url("ws://chat.example.com/session")
///     .connect(Vec::<PresenterEvent>::new())
///     .await?;
/// client.send_message("hello")?;
/// client.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PeerchatClientBuilder {
    url: String,
    session_config: SessionConfig,
}

impl PeerchatClientBuilder {
    /// Creates a builder pointing at [`DEFAULT_URL`] with default settings.
    pub fn new() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the relay URL (`ws://` or `wss://`).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds an unconnected client reporting to `presenter`.
    pub fn build<P: Presenter>(self, presenter: P) -> PeerchatClient<P> {
        debug!(url = %self.url, "building peerchat client");
        SessionController::new(
            WebSocketTransport::new(self.url),
            presenter,
            self.session_config,
        )
    }

    /// Builds a client and connects it. Returns once `Hello` has been sent.
    ///
    /// # Errors
    /// Whatever [`SessionController::connect`] returns, wrapped in
    /// [`PeerchatError::Session`].
    pub async fn connect<P: Presenter>(
        self,
        presenter: P,
    ) -> Result<PeerchatClient<P>, PeerchatError> {
        let mut client = self.build(presenter);
        client.connect().await?;
        Ok(client)
    }
}

impl Default for PeerchatClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
