//! Chat delivery for the open conversation plus conversation summaries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, Weak};

use parley_common::{ParleyError, PersistenceError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::history::MessageHistory;
use super::types::{ChatConfig, ChatEvent, ConversationThread, Delivery, Message, Participant};
use crate::protocol::{events, InboundEvent, OutboundEvent};
use crate::registry::SessionRegistry;
use crate::signaling::{Pump, SignalSender, SignalingChannel};

const EVENT_QUEUE: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message content is empty")]
    EmptyMessage,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<ChatError> for ParleyError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::Persistence(e) => ParleyError::Persistence(e),
            other => ParleyError::Chat(other.to_string()),
        }
    }
}

#[derive(Default)]
struct ChatState {
    open: Option<MessageHistory>,
    threads: HashMap<String, ConversationThread>,
}

impl ChatState {
    fn open_history(&mut self, conversation_id: &str) -> Option<&mut MessageHistory> {
        self.open
            .as_mut()
            .filter(|h| h.conversation_id() == conversation_id)
    }
}

struct TypingTimer {
    token: u64,
    task: JoinHandle<()>,
}

struct ChatInner {
    config: ChatConfig,
    local_user_id: String,
    registry: Arc<dyn SessionRegistry>,
    signaling: Arc<dyn SignalSender>,
    state: Mutex<ChatState>,
    typing: std::sync::Mutex<HashMap<String, TypingTimer>>,
    typing_seq: AtomicU64,
    events: mpsc::Sender<ChatEvent>,
}

impl ChatInner {
    fn emit(&self, event: ChatEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "Chat event queue full, dropping"),
        }
    }

    fn typing_timers(&self) -> std::sync::MutexGuard<'_, HashMap<String, TypingTimer>> {
        self.typing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the indicator. Returns false when it was not set.
    fn stop_typing(&self, conversation_id: &str) -> bool {
        let Some(timer) = self.typing_timers().remove(conversation_id) else {
            return false;
        };
        timer.task.abort();
        self.signaling.send(&OutboundEvent::TypingStop {
            conversation_id: conversation_id.to_string(),
        });
        true
    }

    /// Called by the idle timer; a newer keystroke owns the indicator when
    /// the token no longer matches.
    fn expire_typing(&self, conversation_id: &str, token: u64) {
        let expired = {
            let mut timers = self.typing_timers();
            let current = timers
                .get(conversation_id)
                .is_some_and(|timer| timer.token == token);
            if current {
                timers.remove(conversation_id);
            }
            current
        };
        if expired {
            debug!(conversation_id, "Typing indicator idle, clearing");
            self.signaling.send(&OutboundEvent::TypingStop {
                conversation_id: conversation_id.to_string(),
            });
        }
    }

    /// Record `message` as the latest activity of its conversation.
    fn touch_thread(&self, state: &mut ChatState, message: &Message, unread: bool) {
        let thread = state
            .threads
            .entry(message.conversation_id.clone())
            .or_insert_with(|| ConversationThread {
                id: message.conversation_id.clone(),
                other_party: Participant {
                    id: message.sender_id.clone(),
                    display_name: None,
                    role: message.sender_role,
                },
                last_message: None,
                unread_count: 0,
            });
        if thread.last_message.as_ref().is_some_and(|m| m.id == message.id) {
            return;
        }
        thread.last_message = Some(message.clone());
        if unread {
            thread.unread_count += 1;
        }
        self.emit(ChatEvent::ThreadUpdated(thread.clone()));
    }

    async fn deliver(&self, message: Message) -> Delivery {
        if message.sender_id == self.local_user_id {
            return Delivery::OwnMessage;
        }

        let mut state = self.state.lock().await;
        let Some(history) = state.open_history(&message.conversation_id) else {
            self.touch_thread(&mut state, &message, true);
            return Delivery::Summarized;
        };
        if !history.insert(message.clone()) {
            debug!(message_id = %message.id, "Duplicate message suppressed");
            return Delivery::Duplicate;
        }
        self.touch_thread(&mut state, &message, false);
        drop(state);

        self.emit(ChatEvent::MessageAdded(message));
        Delivery::Inserted
    }
}

// ---------------------------------------------------------------------------
// ChatSession
// ---------------------------------------------------------------------------

/// Message history and delivery for the user's conversations.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<ChatInner>,
}

impl ChatSession {
    pub fn new(
        config: ChatConfig,
        local_user_id: impl Into<String>,
        registry: Arc<dyn SessionRegistry>,
        signaling: Arc<dyn SignalSender>,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (events, events_rx) = mpsc::channel(EVENT_QUEUE);
        let inner = Arc::new(ChatInner {
            config,
            local_user_id: local_user_id.into(),
            registry,
            signaling,
            state: Mutex::new(ChatState::default()),
            typing: std::sync::Mutex::new(HashMap::new()),
            typing_seq: AtomicU64::new(0),
            events,
        });
        (Self { inner }, events_rx)
    }

    /// Fetch the conversation's messages, open it, and return the ordered,
    /// de-duplicated history. Safe to repeat.
    pub async fn load_history(&self, conversation_id: &str) -> Result<Vec<Message>, ChatError> {
        let batch = self.inner.registry.list_messages(conversation_id).await?;
        let mut history = MessageHistory::from_batch(conversation_id, batch);

        let mut state = self.inner.state.lock().await;
        // Keep anything delivered while the fetch was in flight.
        if let Some(previous) = state.open.take() {
            if previous.conversation_id() == conversation_id {
                for message in previous.messages() {
                    history.insert(message.clone());
                }
            }
        }
        if let (Some(thread), Some(last)) = (state.threads.get_mut(conversation_id), history.last()) {
            thread.last_message = Some(last.clone());
        }
        let messages = history.messages().to_vec();
        state.open = Some(history);
        drop(state);

        info!(conversation_id, count = messages.len(), "History loaded");
        Ok(messages)
    }

    /// Persist, insert locally, then broadcast `message:new`.
    pub async fn send(&self, conversation_id: &str, content: &str) -> Result<Message, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let message = self
            .inner
            .registry
            .create_message(conversation_id, content)
            .await?;

        {
            let mut state = self.inner.state.lock().await;
            let inserted = state
                .open_history(conversation_id)
                .is_some_and(|history| history.insert(message.clone()));
            if state.threads.contains_key(conversation_id) {
                self.inner.touch_thread(&mut state, &message, false);
            }
            if inserted {
                self.inner.emit(ChatEvent::MessageAdded(message.clone()));
            }
        }

        let broadcast = OutboundEvent::MessageNew {
            conversation_id: conversation_id.to_string(),
            content: message.content.clone(),
            message_type: message.message_type,
            file_url: message.file_url.clone(),
            message_id: Some(message.id.clone()),
        };
        if !self.inner.signaling.send(&broadcast) {
            warn!(
                conversation_id,
                message_id = %message.id,
                "Message saved but not broadcast"
            );
        }
        self.inner.stop_typing(conversation_id);
        Ok(message)
    }

    /// Apply a message pushed by the server.
    pub async fn on_remote_message(&self, message: Message) -> Delivery {
        self.inner.deliver(message).await
    }

    /// Report a keystroke (`true`) or an explicit stop (`false`). The
    /// indicator clears itself after `typing_idle` without keystrokes.
    pub fn set_typing(&self, conversation_id: &str, is_typing: bool) {
        if !is_typing {
            self.inner.stop_typing(conversation_id);
            return;
        }

        let token = self.inner.typing_seq.fetch_add(1, Ordering::Relaxed);
        let task = {
            let inner: Weak<ChatInner> = Arc::downgrade(&self.inner);
            let conversation_id = conversation_id.to_string();
            let idle = self.inner.config.typing_idle;
            tokio::spawn(async move {
                tokio::time::sleep(idle).await;
                if let Some(inner) = inner.upgrade() {
                    inner.expire_typing(&conversation_id, token);
                }
            })
        };

        let previous = self
            .inner
            .typing_timers()
            .insert(conversation_id.to_string(), TypingTimer { token, task });
        match previous {
            Some(previous) => previous.task.abort(),
            None => {
                self.inner.signaling.send(&OutboundEvent::TypingStart {
                    conversation_id: conversation_id.to_string(),
                });
            }
        }
    }

    /// Mark the conversation read for the local user.
    pub async fn mark_read(&self, conversation_id: &str) -> Result<(), ChatError> {
        self.inner.registry.mark_read(conversation_id).await?;

        {
            let mut state = self.inner.state.lock().await;
            if let Some(history) = state.open_history(conversation_id) {
                history.mark_read_except(&self.inner.local_user_id);
            }
            if let Some(thread) = state.threads.get_mut(conversation_id) {
                if thread.unread_count > 0 {
                    thread.unread_count = 0;
                    let thread = thread.clone();
                    self.inner.emit(ChatEvent::ThreadUpdated(thread));
                }
            }
        }

        self.inner.signaling.send(&OutboundEvent::MessageRead {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    /// Apply one inbound chat notification. Call events are ignored.
    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::NewMessage(message) => {
                self.inner.deliver(message).await;
            }
            InboundEvent::MessageNotification {
                conversation_id,
                mut message,
            } => {
                if message.conversation_id.is_empty() {
                    message.conversation_id = conversation_id;
                }
                self.inner.deliver(message).await;
            }
            InboundEvent::MessagesRead {
                conversation_id,
                reader_id,
            } => {
                if reader_id == self.inner.local_user_id {
                    return;
                }
                let mut state = self.inner.state.lock().await;
                if let Some(history) = state.open_history(&conversation_id) {
                    history.mark_read_from(&self.inner.local_user_id);
                }
                drop(state);
                self.inner.emit(ChatEvent::MessagesRead {
                    conversation_id,
                    reader_id,
                });
            }
            InboundEvent::Typing {
                conversation_id,
                user_id,
                is_typing,
            } => {
                if user_id != self.inner.local_user_id {
                    self.inner.emit(ChatEvent::Typing {
                        conversation_id,
                        user_id,
                        is_typing,
                    });
                }
            }
            InboundEvent::Error { message } => {
                warn!(message = %message, "Server reported an error");
                self.inner.emit(ChatEvent::Error(message));
            }
            other => debug!(event = other.name(), "Ignoring non-chat event"),
        }
    }

    /// Seed conversation summaries, typically from a REST listing.
    pub async fn set_threads(&self, threads: Vec<ConversationThread>) {
        let mut state = self.inner.state.lock().await;
        state.threads = threads.into_iter().map(|t| (t.id.clone(), t)).collect();
    }

    /// Conversation summaries, most recent activity first.
    pub async fn threads(&self) -> Vec<ConversationThread> {
        let state = self.inner.state.lock().await;
        let mut threads: Vec<ConversationThread> = state.threads.values().cloned().collect();
        threads.sort_by(|a, b| {
            let at = |t: &ConversationThread| t.last_message.as_ref().and_then(|m| m.created_at);
            at(b).cmp(&at(a)).then_with(|| a.id.cmp(&b.id))
        });
        threads
    }

    /// Messages of the open conversation.
    pub async fn messages(&self) -> Vec<Message> {
        let state = self.inner.state.lock().await;
        state
            .open
            .as_ref()
            .map(|h| h.messages().to_vec())
            .unwrap_or_default()
    }

    pub async fn open_conversation(&self) -> Option<String> {
        let state = self.inner.state.lock().await;
        state.open.as_ref().map(|h| h.conversation_id().to_string())
    }

    /// Consume chat notifications from `channel` until the returned pump is
    /// dropped.
    pub fn attach(&self, channel: &SignalingChannel) -> Pump {
        let session = self.clone();
        channel.pump(events::CHAT_EVENTS, move |event| {
            let session = session.clone();
            async move { session.handle_event(event).await }
        })
    }
}

impl Drop for ChatInner {
    fn drop(&mut self) {
        for (_, timer) in self.typing_timers().drain() {
            timer.task.abort();
        }
    }
}
