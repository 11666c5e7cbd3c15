//! Chat, call and media tuning.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Idle time before the typing indicator clears (valid range: 500-30000).
    pub typing_idle_ms: u32,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            typing_idle_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallSection {
    /// Early remote candidates kept before negotiation (valid range: 0-1024).
    pub ice_candidate_buffer: u32,
}

impl Default for CallSection {
    fn default() -> Self {
        Self {
            ice_candidate_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSection {
    pub video: bool,
    pub audio_fallback: bool,
    /// stun:, stuns:, turn: or turns: URLs.
    pub ice_servers: Vec<String>,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            video: true,
            audio_fallback: true,
            ice_servers: vec!["stun:stun.l.google.com:19302".into()],
        }
    }
}
