//! Chat data model, configuration, and events.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// Which side of the conversation a sender is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Candidate,
    Employer,
}

/// Kind of message body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

/// A persisted chat message. Only `is_read` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// May be absent when the enclosing event already names the
    /// conversation; filled in on delivery.
    #[serde(default)]
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_role: SenderRole,
    pub content: String,
    /// Authoritative creation time. `None` when the server sent nothing
    /// parseable; such messages order as "now".
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub message_type: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

/// Accepts RFC 3339 strings or epoch milliseconds; anything else is `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

/// The other participant of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: SenderRole,
}

/// Summary row of a conversation, persisted by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationThread {
    pub id: String,
    pub other_party: Participant,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a chat session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Idle window after which the typing indicator clears itself.
    pub typing_idle: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_idle: Duration::from_secs(3),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the chat session for the UI.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// A message was inserted into the open conversation.
    MessageAdded(Message),
    /// A conversation summary changed (last message, unread count).
    ThreadUpdated(ConversationThread),
    /// The other party read our messages in the open conversation.
    MessagesRead {
        conversation_id: String,
        reader_id: String,
    },
    Typing {
        conversation_id: String,
        user_id: String,
        is_typing: bool,
    },
    Error(String),
}

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Inserted into the open conversation.
    Inserted,
    /// Already present in the open conversation.
    Duplicate,
    /// Sent by the local user; already reflected by the send path.
    OwnMessage,
    /// Belongs to another conversation; only its summary was updated.
    Summarized,
}
