//! Wire protocol for the signaling channel.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Outbound call events address the peer with `to`; the server relays them
//! with `from` filled in. Chat notifications (`new_message`, `typing`, ...)
//! are produced by the server itself.

use parley_common::CallId;
use serde::{Deserialize, Serialize};

use crate::chat::{Message, MessageKind};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event names used on the signaling channel.
pub mod events {
    pub const CALL_INVITE: &str = "call:invite";
    pub const CALL_ACCEPTED: &str = "call:accepted";
    pub const CALL_OFFER: &str = "call:offer";
    pub const CALL_ANSWER: &str = "call:answer";
    pub const CALL_ICE_CANDIDATE: &str = "call:ice-candidate";
    pub const CALL_END: &str = "call:end";
    pub const CALL_BUSY: &str = "call:busy";

    pub const MESSAGE_NEW: &str = "message:new";
    pub const MESSAGE_READ: &str = "message:read";
    pub const TYPING_START: &str = "typing:start";
    pub const TYPING_STOP: &str = "typing:stop";

    pub const NEW_MESSAGE: &str = "new_message";
    pub const MESSAGE_NOTIFICATION: &str = "message_notification";
    pub const MESSAGES_READ: &str = "messages_read";
    pub const TYPING: &str = "typing";
    pub const ERROR: &str = "error";

    /// Every call event a `CallSession` consumes.
    pub const CALL_EVENTS: &[&str] = &[
        CALL_INVITE,
        CALL_ACCEPTED,
        CALL_OFFER,
        CALL_ANSWER,
        CALL_ICE_CANDIDATE,
        CALL_END,
        CALL_BUSY,
    ];

    /// Every notification a `ChatSession` consumes.
    pub const CHAT_EVENTS: &[&str] = &[NEW_MESSAGE, MESSAGE_NOTIFICATION, MESSAGES_READ, TYPING, ERROR];
}

// ---------------------------------------------------------------------------
// Shared payload types
// ---------------------------------------------------------------------------

/// ICE candidate for NAT traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Events this client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "call:invite", rename_all = "camelCase")]
    CallInvite {
        to: String,
        call_id: CallId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_hint: Option<String>,
    },
    #[serde(rename = "call:accepted", rename_all = "camelCase")]
    CallAccepted { to: String, call_id: CallId },
    #[serde(rename = "call:offer", rename_all = "camelCase")]
    CallOffer {
        to: String,
        sdp: String,
        call_id: CallId,
    },
    #[serde(rename = "call:answer", rename_all = "camelCase")]
    CallAnswer {
        to: String,
        sdp: String,
        call_id: CallId,
    },
    #[serde(rename = "call:ice-candidate", rename_all = "camelCase")]
    CallIceCandidate {
        to: String,
        candidate: IceCandidate,
        call_id: CallId,
    },
    #[serde(rename = "call:end", rename_all = "camelCase")]
    CallEnd { to: String, call_id: CallId },
    #[serde(rename = "call:busy", rename_all = "camelCase")]
    CallBusy { to: String, call_id: CallId },
    #[serde(rename = "message:new", rename_all = "camelCase")]
    MessageNew {
        conversation_id: String,
        content: String,
        message_type: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_url: Option<String>,
        /// Present when the message is already persisted; peers must not
        /// create a second copy.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    #[serde(rename = "message:read", rename_all = "camelCase")]
    MessageRead { conversation_id: String },
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { conversation_id: String },
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { conversation_id: String },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallInvite { .. } => events::CALL_INVITE,
            Self::CallAccepted { .. } => events::CALL_ACCEPTED,
            Self::CallOffer { .. } => events::CALL_OFFER,
            Self::CallAnswer { .. } => events::CALL_ANSWER,
            Self::CallIceCandidate { .. } => events::CALL_ICE_CANDIDATE,
            Self::CallEnd { .. } => events::CALL_END,
            Self::CallBusy { .. } => events::CALL_BUSY,
            Self::MessageNew { .. } => events::MESSAGE_NEW,
            Self::MessageRead { .. } => events::MESSAGE_READ,
            Self::TypingStart { .. } => events::TYPING_START,
            Self::TypingStop { .. } => events::TYPING_STOP,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events the server delivers to this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "call:invite", rename_all = "camelCase")]
    CallInvite {
        from: String,
        call_id: CallId,
        #[serde(default)]
        room_hint: Option<String>,
    },
    #[serde(rename = "call:accepted", rename_all = "camelCase")]
    CallAccepted { from: String, call_id: CallId },
    #[serde(rename = "call:offer", rename_all = "camelCase")]
    CallOffer {
        from: String,
        sdp: String,
        call_id: CallId,
    },
    #[serde(rename = "call:answer", rename_all = "camelCase")]
    CallAnswer {
        from: String,
        sdp: String,
        call_id: CallId,
    },
    #[serde(rename = "call:ice-candidate", rename_all = "camelCase")]
    CallIceCandidate {
        from: String,
        candidate: IceCandidate,
        call_id: CallId,
    },
    #[serde(rename = "call:end", rename_all = "camelCase")]
    CallEnd { from: String, call_id: CallId },
    #[serde(rename = "call:busy", rename_all = "camelCase")]
    CallBusy { from: String, call_id: CallId },
    /// A message in any conversation the user belongs to.
    #[serde(rename = "new_message")]
    NewMessage(Message),
    /// A message for a conversation that is not open on this client.
    #[serde(rename = "message_notification", rename_all = "camelCase")]
    MessageNotification {
        conversation_id: String,
        message: Message,
    },
    #[serde(rename = "messages_read", rename_all = "camelCase")]
    MessagesRead {
        conversation_id: String,
        reader_id: String,
    },
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing {
        conversation_id: String,
        user_id: String,
        is_typing: bool,
    },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(other)]
    Unknown,
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallInvite { .. } => events::CALL_INVITE,
            Self::CallAccepted { .. } => events::CALL_ACCEPTED,
            Self::CallOffer { .. } => events::CALL_OFFER,
            Self::CallAnswer { .. } => events::CALL_ANSWER,
            Self::CallIceCandidate { .. } => events::CALL_ICE_CANDIDATE,
            Self::CallEnd { .. } => events::CALL_END,
            Self::CallBusy { .. } => events::CALL_BUSY,
            Self::NewMessage(_) => events::NEW_MESSAGE,
            Self::MessageNotification { .. } => events::MESSAGE_NOTIFICATION,
            Self::MessagesRead { .. } => events::MESSAGES_READ,
            Self::Typing { .. } => events::TYPING,
            Self::Error { .. } => events::ERROR,
            Self::Unknown => "unknown",
        }
    }

    /// The call this event belongs to, for call events.
    pub fn call_id(&self) -> Option<&CallId> {
        match self {
            Self::CallInvite { call_id, .. }
            | Self::CallAccepted { call_id, .. }
            | Self::CallOffer { call_id, .. }
            | Self::CallAnswer { call_id, .. }
            | Self::CallIceCandidate { call_id, .. }
            | Self::CallEnd { call_id, .. }
            | Self::CallBusy { call_id, .. } => Some(call_id),
            _ => None,
        }
    }
}
