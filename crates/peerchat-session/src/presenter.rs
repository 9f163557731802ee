//! Presentation hooks.
//!
//! The controller reports to whatever draws the UI through [`Presenter`].
//! Every call is a one-way notification: the presenter can't veto or answer
//! anything, and a slow presenter only slows down the caller's own loop.

use peerchat_transport::ConnectionState;
use tokio::sync::mpsc;

/// Receives display updates from a [`SessionController`](crate::SessionController).
pub trait Presenter {
    /// The connection moved to a new lifecycle state. Called once per
    /// change.
    fn connection_state(&mut self, state: ConnectionState);

    /// The local display name was assigned or confirmed.
    ///
    /// Called on every confirmation, even when the name didn't change,
    /// since the UI may be showing a pending placeholder.
    fn username(&mut self, name: &str);

    /// The roster changed. Not called when an update repeats the current
    /// list.
    fn roster(&mut self, names: &[String]);

    /// A line for the chat log.
    fn log_line(&mut self, line: &str);
}

/// One presenter notification, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    ConnectionState(ConnectionState),
    Username(String),
    Roster(Vec<String>),
    LogLine(String),
}

impl PresenterEvent {
    /// Replays this event onto another presenter.
    pub fn apply_to<P: Presenter + ?Sized>(&self, presenter: &mut P) {
        match self {
            Self::ConnectionState(state) => presenter.connection_state(*state),
            Self::Username(name) => presenter.username(name),
            Self::Roster(names) => presenter.roster(names),
            Self::LogLine(line) => presenter.log_line(line),
        }
    }
}

/// Records every notification in order.
impl Presenter for Vec<PresenterEvent> {
    fn connection_state(&mut self, state: ConnectionState) {
        self.push(PresenterEvent::ConnectionState(state));
    }

    fn username(&mut self, name: &str) {
        self.push(PresenterEvent::Username(name.to_owned()));
    }

    fn roster(&mut self, names: &[String]) {
        self.push(PresenterEvent::Roster(names.to_vec()));
    }

    fn log_line(&mut self, line: &str) {
        self.push(PresenterEvent::LogLine(line.to_owned()));
    }
}

/// Forwards notifications to another task. Dropped silently once the
/// receiver is gone.
impl Presenter for mpsc::UnboundedSender<PresenterEvent> {
    fn connection_state(&mut self, state: ConnectionState) {
        let _ = self.send(PresenterEvent::ConnectionState(state));
    }

    fn username(&mut self, name: &str) {
        let _ = self.send(PresenterEvent::Username(name.to_owned()));
    }

    fn roster(&mut self, names: &[String]) {
        let _ = self.send(PresenterEvent::Roster(names.to_vec()));
    }

    fn log_line(&mut self, line: &str) {
        let _ = self.send(PresenterEvent::LogLine(line.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_records_in_order() {
        let mut events: Vec<PresenterEvent> = Vec::new();
        events.connection_state(ConnectionState::Connected);
        events.username("guest1");
        events.roster(&["a".to_owned()]);
        events.log_line("hello");

        assert_eq!(
            events,
            vec![
                PresenterEvent::ConnectionState(ConnectionState::Connected),
                PresenterEvent::Username("guest1".into()),
                PresenterEvent::Roster(vec!["a".into()]),
                PresenterEvent::LogLine("hello".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_channel_presenter_forwards() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        tx.log_line("hi");
        tx.username("bob");
        assert_eq!(rx.recv().await, Some(PresenterEvent::LogLine("hi".into())));
        assert_eq!(rx.recv().await, Some(PresenterEvent::Username("bob".into())));

        drop(rx);
        // No receiver: still doesn't panic.
        tx.log_line("lost");
    }

    #[test]
    fn test_apply_to_replays() {
        let mut replayed: Vec<PresenterEvent> = Vec::new();
        let event = PresenterEvent::Roster(vec!["x".into(), "y".into()]);
        event.apply_to(&mut replayed);
        assert_eq!(replayed, vec![event]);
    }
}
