//! Session configuration.

use std::time::Duration;

use peerchat_protocol::SessionId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tunables for a [`SessionController`](crate::SessionController).
///
/// Deserializes from partial input: missing fields take their defaults.
///
/// ```rust
/// use std::time::Duration;
/// use peerchat_session::SessionConfig;
///
/// let config = SessionConfig {
///     heartbeat_interval: Duration::from_millis(50),
///     ..Default::default()
/// };
/// assert!(!config.await_unreliable_open);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often the input state is sent on the unreliable channel.
    /// Default: 100 ms.
    pub heartbeat_interval: Duration,

    /// Upper bound of a random delay added to the first heartbeat only, so
    /// many clients started together don't beat in lockstep. Default: none.
    pub heartbeat_jitter: Duration,

    /// Whether [`connect`](crate::SessionController::connect) also waits for
    /// the unreliable channel to open before sending `Hello`.
    ///
    /// Off by default: only the reliable channel is awaited, and heartbeats
    /// sent before the unreliable channel opens are lost.
    pub await_unreliable_open: bool,

    /// Session id from an earlier session, offered in `Hello` so the server
    /// can resume it.
    pub cached_session_id: Option<SessionId>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_jitter: Duration::ZERO,
            await_unreliable_open: false,
            cached_session_id: None,
        }
    }
}

impl SessionConfig {
    pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

    /// Shortest heartbeat interval allowed.
    pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10);

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`SessionController::new`](crate::SessionController::new).
    /// `heartbeat_interval` is raised to [`Self::MIN_HEARTBEAT_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.heartbeat_interval < Self::MIN_HEARTBEAT_INTERVAL {
            warn!(
                interval_ms = self.heartbeat_interval.as_secs_f64() * 1000.0,
                min_ms = Self::MIN_HEARTBEAT_INTERVAL.as_millis() as u64,
                "heartbeat_interval below minimum, clamping"
            );
            self.heartbeat_interval = Self::MIN_HEARTBEAT_INTERVAL;
        }
        self
    }

    pub fn with_cached_session_id(mut self, session_id: SessionId) -> Self {
        self.cached_session_id = Some(session_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_millis(100));
        assert_eq!(config.heartbeat_jitter, Duration::ZERO);
        assert!(!config.await_unreliable_open);
        assert_eq!(config.cached_session_id, None);
    }

    #[test]
    fn test_validated_clamps_interval() {
        let config = SessionConfig {
            heartbeat_interval: Duration::ZERO,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.heartbeat_interval, SessionConfig::MIN_HEARTBEAT_INTERVAL);
    }

    #[test]
    fn test_validated_keeps_valid_interval() {
        let config = SessionConfig::default().validated();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "await_unreliable_open": true }"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert!(config.await_unreliable_open);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_json_roundtrip_with_session_id() {
        let config =
            SessionConfig::default().with_cached_session_id(SessionId([9; 8]));
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
