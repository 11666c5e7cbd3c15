//! Signaling server and session registry endpoints.

use serde::{Deserialize, Serialize};

/// WebSocket signaling channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingSection {
    /// ws:// or wss:// URL of the signaling server.
    pub url: String,
    /// Valid range: 1-120.
    pub connect_timeout_secs: u32,
    /// Valid range: 5-300.
    pub heartbeat_interval_secs: u32,
    pub reconnect_delay_ms: u32,
    pub max_reconnect_delay_ms: u32,
    /// Valid range: 0-50.
    pub max_reconnect_attempts: u32,
}

impl Default for SignalingSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_secs: 10,
            heartbeat_interval_secs: 25,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30_000,
            max_reconnect_attempts: 5,
        }
    }
}

/// REST API that persists calls and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// http:// or https:// base URL.
    pub base_url: String,
    /// Valid range: 1-120.
    pub request_timeout_secs: u32,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            request_timeout_secs: 15,
        }
    }
}
