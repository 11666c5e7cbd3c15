//! Call state, configuration, events, and errors.

use std::fmt;

use parley_common::{CallId, MediaAccessError, NegotiationError, ParleyError, PersistenceError};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStatus {
    Idle,
    Initiating,
    Ringing,
    Connecting,
    Connected,
    Ended,
    Error,
}

impl CallStatus {
    /// Statuses that hold (or are about to hold) local media.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Initiating | Self::Ringing | Self::Connecting | Self::Connected
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Error)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initiating => "initiating",
            Self::Ringing => "ringing",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ended => "ended",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Which side of the call this client is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    Caller,
    Callee,
}

/// Read-only view of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    pub status: CallStatus,
    pub role: Option<CallRole>,
    pub call_id: Option<CallId>,
    pub remote_user_id: Option<String>,
    pub error_detail: Option<String>,
    pub room_hint: Option<String>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Remote ICE candidates held until a remote description is applied.
    /// The oldest is dropped when full.
    pub ice_candidate_buffer: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice_candidate_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the call session for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    StatusChanged(CallSnapshot),
    /// An invite arrived while idle; answer with `accept_call` or
    /// `decline_call`.
    IncomingCall { call_id: CallId, from: String },
    /// The callee was already in another call.
    RemoteBusy { call_id: CallId },
    /// A remote track arrived.
    RemoteMedia,
    Error(String),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("cannot {operation} while {status}")]
    InvalidState {
        operation: &'static str,
        status: CallStatus,
    },

    #[error("signaling channel is not connected")]
    NotConnected,

    #[error("no pending invite for this call")]
    NoPendingInvite,

    #[error("call was ended while the operation was in progress")]
    Cancelled,

    #[error(transparent)]
    Media(#[from] MediaAccessError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<CallError> for ParleyError {
    fn from(error: CallError) -> Self {
        match error {
            CallError::Media(e) => ParleyError::Media(e),
            CallError::Negotiation(e) => ParleyError::Negotiation(e),
            CallError::Persistence(e) => ParleyError::Persistence(e),
            other => ParleyError::Call(other.to_string()),
        }
    }
}
