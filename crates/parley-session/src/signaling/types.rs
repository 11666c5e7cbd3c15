//! Configuration and connection status for the signaling channel.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the signaling channel.
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// WebSocket URL of the signaling server (ws:// or wss://).
    pub url: String,
    /// Upper bound for a single connection attempt.
    pub connect_timeout: Duration,
    /// Interval between WebSocket pings while connected.
    pub heartbeat_interval: Duration,
    /// Delay before the first reconnect attempt; doubles per attempt.
    pub reconnect_delay: Duration,
    /// Cap for the reconnect delay.
    pub max_reconnect_delay: Duration,
    /// Reconnect attempts after an unexpected drop before giving up.
    pub max_reconnect_attempts: u32,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(25),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: 5,
        }
    }
}

impl SignalingConfig {
    /// Build the authenticated WebSocket URL.
    pub(crate) fn ws_url(&self, token: &str) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}token={token}", self.url)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Why the channel stopped trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    AuthFailed,
    ServerUnreachable,
    GaveUp,
}

/// Connectivity as observed by the sessions and the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32, max_attempts: u32 },
    Failed(FailureReason),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// True when only a manual `connect`/`reconnect` can recover.
    pub fn needs_manual_reconnect(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting {
                attempt,
                max_attempts,
            } => write!(
                f,
                "network issue, retrying (attempt {attempt} of {max_attempts})"
            ),
            Self::Failed(FailureReason::AuthFailed) => write!(f, "authentication failed"),
            Self::Failed(FailureReason::ServerUnreachable) => write!(f, "server unreachable"),
            Self::Failed(FailureReason::GaveUp) => write!(f, "gave up, reconnect manually"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_appends_token() {
        let config = SignalingConfig {
            url: "wss://rtc.example.com/ws".into(),
            ..Default::default()
        };
        assert_eq!(config.ws_url("abc"), "wss://rtc.example.com/ws?token=abc");

        let config = SignalingConfig {
            url: "wss://rtc.example.com/ws?v=2".into(),
            ..Default::default()
        };
        assert_eq!(config.ws_url("abc"), "wss://rtc.example.com/ws?v=2&token=abc");
    }

    #[test]
    fn status_strings_are_distinct() {
        let statuses = [
            ConnectionStatus::Failed(FailureReason::AuthFailed),
            ConnectionStatus::Failed(FailureReason::ServerUnreachable),
            ConnectionStatus::Reconnecting {
                attempt: 2,
                max_attempts: 5,
            },
            ConnectionStatus::Failed(FailureReason::GaveUp),
        ];
        let rendered: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered[0], "authentication failed");
        assert_eq!(rendered[1], "server unreachable");
        assert_eq!(rendered[2], "network issue, retrying (attempt 2 of 5)");
        assert_eq!(rendered[3], "gave up, reconnect manually");
    }

    #[test]
    fn only_failed_needs_manual_reconnect() {
        assert!(ConnectionStatus::Failed(FailureReason::GaveUp).needs_manual_reconnect());
        assert!(!ConnectionStatus::Reconnecting {
            attempt: 1,
            max_attempts: 3
        }
        .needs_manual_reconnect());
        assert!(!ConnectionStatus::Disconnected.is_connected());
    }

    #[test]
    fn defaults_bound_connect_time() {
        let config = SignalingConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.max_reconnect_attempts, 5);
    }
}
