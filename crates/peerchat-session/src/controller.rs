//! The session controller.
//!
//! [`SessionController`] owns one connection to a server and everything the
//! client knows about it: the lifecycle state, the session id and username
//! the server assigned, the roster, and the heartbeat.
//!
//! # Event model
//!
//! The controller is a single actor. Transport events arrive on one stream
//! and are handled one at a time by [`process_next_event`] (or [`run`]),
//! so identity and roster have a single writer and need no locking. Only
//! [`connect`] and [`shutdown`] suspend. Sends and inbound dispatch run to
//! completion synchronously.
//!
//! ```text
//!  transport ──events──→ ConnectionStateMachine ──changes──→ Presenter
//!                 │
//!                 └──packets──→ ServerMessage::decode ──→ identity / roster / log
//! ```
//!
//! [`process_next_event`]: SessionController::process_next_event
//! [`run`]: SessionController::run
//! [`connect`]: SessionController::connect
//! [`shutdown`]: SessionController::shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use peerchat_protocol::{ClientMessage, ServerMessage, SessionId, WireMessage};
use peerchat_transport::{
    Channel, ChannelEvent, ChannelTransport, ConnectionState, ConnectionStateMachine,
    PeerState, TransportEvent, TransportEvents,
};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::{Heartbeat, Presenter, Roster, SessionConfig, SessionError};

/// Drives one client session over a [`ChannelTransport`].
///
/// ```rust,no_run
/// use peerchat_session::{PresenterEvent, SessionConfig, SessionController};
/// use peerchat_transport::{memory_pair, LoopbackSignaler};
///
/// # async fn demo() -> Result<(), peerchat_session::SessionError> {
/// let (transport, _peer) = memory_pair(LoopbackSignaler);
/// let mut session =
///     SessionController::new(transport, Vec::<PresenterEvent>::new(), SessionConfig::default());
///
/// session.connect().await?;
/// session.send_message("hello")?;
/// session.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionController<T: ChannelTransport, P: Presenter> {
    transport: Arc<T>,
    presenter: P,
    config: SessionConfig,
    machine: ConnectionStateMachine,
    events: Option<TransportEvents>,

    session_id: Option<SessionId>,
    username: Option<String>,
    roster: Roster,

    /// Input state read by the heartbeat task.
    buttons: Arc<AtomicBool>,
    heartbeat: Option<Heartbeat>,

    started: bool,
    shut_down: bool,
}

impl<T: ChannelTransport, P: Presenter> SessionController<T, P> {
    /// Creates a controller. Nothing happens on the network until
    /// [`connect`](Self::connect).
    pub fn new(transport: T, presenter: P, config: SessionConfig) -> Self {
        let config = config.validated();
        Self {
            transport: Arc::new(transport),
            presenter,
            session_id: config.cached_session_id,
            config,
            machine: ConnectionStateMachine::new(),
            events: None,
            username: None,
            roster: Roster::new(),
            buttons: Arc::new(AtomicBool::new(false)),
            heartbeat: None,
            started: false,
            shut_down: false,
        }
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Connects and sends `Hello`.
    ///
    /// Waits until the reliable channel is open (and the unreliable one too
    /// if [`SessionConfig::await_unreliable_open`] is set), then sends
    /// `Hello` with the cached session id, if any. Events that arrive in the
    /// meantime are handled as usual. The server's reply is picked up later
    /// by [`process_next_event`](Self::process_next_event).
    ///
    /// # Errors
    /// - [`SessionError::ConnectionFailed`] if the transport fails or closes
    ///   before the session opens, or if `Hello` can't be sent. The state
    ///   becomes `ClosedAbnormal` when the transport reported a failure.
    /// - [`SessionError::AlreadyStarted`] on a second call.
    /// - [`SessionError::ShutDown`] after [`shutdown`](Self::shutdown).
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.shut_down {
            return Err(SessionError::ShutDown);
        }
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        self.started = true;

        info!(resume = self.session_id.is_some(), "session connecting");
        let events = match self.transport.connect().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "transport connect failed");
                self.fail();
                return Err(SessionError::ConnectionFailed(e.to_string()));
            }
        };
        self.events = Some(events);

        while !self.is_ready() {
            if !self.process_next_event().await {
                self.fail();
                return Err(SessionError::ConnectionFailed(
                    "transport ended before the session opened".into(),
                ));
            }
            let state = self.state();
            if state.is_closed() {
                return Err(SessionError::ConnectionFailed(format!(
                    "connection {state} before the session opened"
                )));
            }
        }

        let hello = ClientMessage::Hello {
            session_id: self.session_id,
        };
        if let Err(e) = self.send(&hello) {
            warn!(error = %e, "hello send failed");
            self.fail();
            return Err(SessionError::ConnectionFailed(format!("hello not sent: {e}")));
        }
        debug!(resume = self.session_id.is_some(), "hello sent");
        Ok(())
    }

    /// Waits for the next transport event and handles it.
    ///
    /// Returns `false` once there are no more events: the stream ended, the
    /// controller was never connected, or it was shut down. Cancel-safe:
    /// dropping the future before it completes loses no event, so it can
    /// sit in a `tokio::select!` loop.
    pub async fn process_next_event(&mut self) -> bool {
        let Some(events) = self.events.as_mut() else {
            return false;
        };
        match events.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => {
                self.events = None;
                false
            }
        }
    }

    /// Handles every event that has already arrived, without waiting.
    /// Returns how many were handled.
    ///
    /// For callers that poll once per frame instead of awaiting
    /// [`process_next_event`](Self::process_next_event).
    pub fn process_pending_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(events) = self.events.as_mut() {
            match events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.events = None,
            }
        }
        handled
    }

    /// Handles events until the connection reaches a closed state or the
    /// event stream ends.
    pub async fn run(&mut self) {
        while !self.state().is_closed() && self.process_next_event().await {}
    }

    /// Ends the session.
    ///
    /// Stops the heartbeat, sends `Goodbye` if the reliable channel is still
    /// open (without waiting for delivery), closes the transport and moves
    /// to `ClosedGraceful` unless the connection already failed. Afterwards
    /// every send returns [`SessionError::NotConnected`].
    ///
    /// Safe to call at any time and any number of times: before connect,
    /// after an abnormal close, or twice in a row.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.cancel().await;
        }

        if !self.state().is_closed() && self.machine.is_channel_open(Channel::ReliableOrdered) {
            match self.send(&ClientMessage::Goodbye) {
                Ok(()) => debug!("goodbye sent"),
                Err(e) => debug!(error = %e, "goodbye not sent"),
            }
        }

        if self.started {
            self.transport.close();
        }
        if let Some(state) = self.machine.close_gracefully() {
            self.on_state_change(state);
        }
        self.events = None;
        info!(state = %self.state(), "session shut down");
    }

    // -- Outbound -----------------------------------------------------------

    /// Sends a chat line on the reliable channel.
    ///
    /// # Errors
    /// [`SessionError::NotConnected`] unless the session is connected with
    /// the reliable channel open.
    pub fn send_message(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.send(&ClientMessage::SendMsg {
            text: text.to_owned(),
        })
    }

    /// Asks the server for a new display name. The confirmed name arrives
    /// later as a `SetNameReply`.
    ///
    /// # Errors
    /// [`SessionError::NotConnected`] unless the session is connected with
    /// the reliable channel open.
    pub fn send_name_change(&mut self, name: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        debug!(name, "requesting name change");
        self.send(&ClientMessage::SetName {
            name: name.to_owned(),
        })
    }

    /// Sets the input state the heartbeat reports from its next beat on.
    pub fn set_buttons(&self, pressed: bool) {
        self.buttons.store(pressed, Ordering::Relaxed);
    }

    // -- Accessors ----------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// The name the server assigned, once known.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The session id the server issued, or the cached one from the config
    /// until the server replies.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn roster(&self) -> &[String] {
        self.roster.names()
    }

    pub fn buttons(&self) -> bool {
        self.buttons.load(Ordering::Relaxed)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Whether the heartbeat task is currently running.
    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat.as_ref().is_some_and(Heartbeat::is_running)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    // -- Internals ----------------------------------------------------------

    fn is_ready(&self) -> bool {
        self.machine.is_channel_open(Channel::ReliableOrdered)
            && (!self.config.await_unreliable_open
                || self.machine.is_channel_open(Channel::Unreliable))
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.shut_down
            || !self.state().is_connected()
            || !self.machine.is_channel_open(Channel::ReliableOrdered)
        {
            return Err(SessionError::NotConnected);
        }
        Ok(())
    }

    fn send(&self, msg: &ClientMessage) -> Result<(), SessionError> {
        self.transport.send(msg.channel(), &msg.encode())?;
        Ok(())
    }

    /// Marks the connection failed and releases the transport.
    fn fail(&mut self) {
        if let Some(state) = self.machine.on_peer_state(PeerState::Failed) {
            self.on_state_change(state);
        }
        self.transport.close();
    }

    fn handle_event(&mut self, event: TransportEvent) {
        if let Some(state) = self.machine.apply(&event) {
            self.on_state_change(state);
        }

        match event {
            TransportEvent::Channel {
                channel: Channel::ReliableOrdered,
                event: ChannelEvent::Close,
            } => {
                // Without the reliable channel the session is over, so take
                // the rest of the connection down too.
                self.transport.close();
            }
            TransportEvent::Message { channel, data } => self.on_packet(channel, &data),
            _ => {}
        }
    }

    fn on_state_change(&mut self, state: ConnectionState) {
        info!(%state, "connection state changed");
        if state.is_closed() {
            if let Some(heartbeat) = self.heartbeat.take() {
                // Dropping aborts the task.
                drop(heartbeat);
                debug!("heartbeat stopped on close");
            }
        }
        self.presenter.connection_state(state);
    }

    fn on_packet(&mut self, channel: Channel, data: &[u8]) {
        match ServerMessage::decode(data) {
            Ok(msg) => self.dispatch(msg),
            Err(e) => warn!(
                %channel,
                len = data.len(),
                error = %e,
                "dropping undecodable packet"
            ),
        }
    }

    fn dispatch(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::HelloReply {
                session_id,
                username,
            } => {
                info!(%session_id, %username, "session accepted");
                self.session_id = Some(session_id);
                self.adopt_username(username);
                self.start_heartbeat();
            }
            ServerMessage::ReceiveMsg { text } => {
                self.presenter.log_line(&text);
            }
            ServerMessage::SetNameReply { username } => {
                debug!(%username, "name confirmed");
                self.adopt_username(username);
            }
            ServerMessage::LobbyInfo { usernames } => {
                if self.roster.replace(usernames) {
                    debug!(peers = self.roster.len(), "roster changed");
                    self.presenter.roster(self.roster.names());
                }
            }
        }
    }

    fn adopt_username(&mut self, username: String) {
        self.presenter.username(&username);
        self.username = Some(username);
    }

    /// Starts the heartbeat unless it's already running or the session is
    /// over. A repeated `HelloReply` never adds a second timer.
    fn start_heartbeat(&mut self) {
        if self.heartbeat.is_some() || self.shut_down || self.state().is_closed() {
            return;
        }
        self.heartbeat = Some(Heartbeat::start(
            Arc::clone(&self.transport),
            Arc::clone(&self.buttons),
            self.config.heartbeat_interval,
            self.config.heartbeat_jitter,
        ));
    }
}

impl<T: ChannelTransport, P: Presenter> Drop for SessionController<T, P> {
    fn drop(&mut self) {
        if !self.shut_down && self.started {
            debug!("session dropped without shutdown");
            self.transport.close();
        }
    }
}
