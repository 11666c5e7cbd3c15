//! Session registry: the REST collaborator that persists call records and
//! messages.
//!
//! The sessions only talk to the [`SessionRegistry`] trait; [`HttpRegistry`]
//! is the reqwest-backed implementation.

mod http;

use async_trait::async_trait;
use parley_common::{CallId, PersistenceError};
use serde::{Deserialize, Serialize};

use crate::chat::Message;

pub use http::{HttpRegistry, RegistryConfig};

/// A freshly created call record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: CallId,
    #[serde(default, alias = "roomId")]
    pub room_hint: Option<String>,
}

#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn create_call(&self, remote_user_id: &str) -> Result<CallRecord, PersistenceError>;

    async fn join_call(&self, call_id: &CallId) -> Result<(), PersistenceError>;

    async fn end_call(&self, call_id: &CallId) -> Result<(), PersistenceError>;

    /// Persist a text message. The returned message carries the
    /// authoritative id and timestamp.
    async fn create_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<Message, PersistenceError>;

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, PersistenceError>;

    async fn mark_read(&self, conversation_id: &str) -> Result<(), PersistenceError>;
}
