//! Subcommand implementations.

use std::sync::Arc;

use parley_common::ParleyError;
use parley_session::protocol::events;
use parley_session::{
    ChatEvent, ChatSession, ConnectionStatus, HttpRegistry, InboundEvent, Message,
    SignalingChannel,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::settings::Settings;

type ChatHandle = (ChatSession, mpsc::Receiver<ChatEvent>);

fn chat_session(settings: &Settings, channel: &SignalingChannel) -> Result<ChatHandle, ParleyError> {
    let registry = HttpRegistry::new(settings.registry.clone())?;
    Ok(ChatSession::new(
        settings.chat.clone(),
        settings.identity.user_id.clone(),
        Arc::new(registry),
        Arc::new(channel.clone()),
    ))
}

fn format_message(message: &Message) -> String {
    let at = message
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".repeat(19));
    let read = if message.is_read { ' ' } else { '*' };
    format!("{at} {read} {}: {}", message.sender_id, message.content)
}

/// Connect and log connectivity plus inbound events until Ctrl-C.
pub async fn watch(settings: &Settings) -> Result<(), ParleyError> {
    settings.require(true, true)?;
    let channel = SignalingChannel::new(settings.signaling.clone());
    let (chat, mut chat_events) = chat_session(settings, &channel)?;

    let mut status = channel.watch_status();
    let status_task = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            match current {
                ConnectionStatus::Failed(_) => warn!(status = %current, "Signaling"),
                _ => info!(status = %current, "Signaling"),
            }
        }
    });

    let call_handlers: Vec<_> = events::CALL_EVENTS
        .iter()
        .map(|&name| {
            let id = channel.on(name, |event: &InboundEvent| match event {
                InboundEvent::CallInvite { from, call_id, .. } => {
                    println!("incoming call {call_id} from {from}");
                }
                other => info!(event = other.name(), call_id = ?other.call_id(), "Call event"),
            });
            (name, id)
        })
        .collect();
    let _pump = chat.attach(&channel);

    channel.connect(&settings.identity).await?;
    println!("watching as {} (Ctrl-C to stop)", settings.identity.user_id);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(event) = chat_events.recv() => match event {
                ChatEvent::MessageAdded(message) => {
                    println!("[{}] {}", message.conversation_id, format_message(&message));
                }
                ChatEvent::ThreadUpdated(thread) => {
                    if let Some(message) = &thread.last_message {
                        println!(
                            "[{}] ({} unread) {}",
                            thread.id,
                            thread.unread_count,
                            format_message(message)
                        );
                    }
                }
                ChatEvent::Typing { conversation_id, user_id, is_typing: true } => {
                    println!("[{conversation_id}] {user_id} is typing...");
                }
                ChatEvent::MessagesRead { conversation_id, reader_id } => {
                    println!("[{conversation_id}] read by {reader_id}");
                }
                ChatEvent::Error(message) => warn!(message = %message, "Server error"),
                _ => {}
            },
        }
    }

    for (name, id) in call_handlers {
        channel.off(name, id);
    }
    channel.disconnect().await;
    status_task.abort();
    Ok(())
}

/// Print the ordered history of one conversation.
pub async fn history(settings: &Settings, conversation_id: &str) -> Result<(), ParleyError> {
    settings.require(false, true)?;
    let channel = SignalingChannel::new(settings.signaling.clone());
    let (chat, _events) = chat_session(settings, &channel)?;

    let messages = chat.load_history(conversation_id).await?;
    if messages.is_empty() {
        println!("no messages in {conversation_id}");
    }
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}

/// Persist a message and broadcast it when the channel is reachable.
pub async fn send(
    settings: &Settings,
    conversation_id: &str,
    content: &str,
) -> Result<(), ParleyError> {
    settings.require(false, true)?;
    let channel = SignalingChannel::new(settings.signaling.clone());
    let (chat, _events) = chat_session(settings, &channel)?;

    if !settings.signaling.url.is_empty() {
        if let Err(e) = channel.connect(&settings.identity).await {
            warn!(error = %e, "Signaling unavailable, the message will not be broadcast");
        }
    }

    let message = chat.send(conversation_id, content).await?;
    println!("sent {}", message.id);
    channel.disconnect().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use parley_session::{MessageKind, SenderRole};

    fn message(secs: Option<i64>, is_read: bool) -> Message {
        Message {
            id: "m1".into(),
            conversation_id: "conv".into(),
            sender_id: "u2".into(),
            sender_role: SenderRole::Employer,
            content: "hello".into(),
            created_at: secs.and_then(|s| DateTime::from_timestamp(s, 0)),
            is_read,
            message_type: MessageKind::Text,
            file_url: None,
        }
    }

    #[test]
    fn formats_timestamp_and_unread_marker() {
        assert_eq!(
            format_message(&message(Some(0), false)),
            "1970-01-01 00:00:00 * u2: hello"
        );
        assert_eq!(
            format_message(&message(Some(0), true)),
            "1970-01-01 00:00:00   u2: hello"
        );
    }

    #[test]
    fn missing_timestamp_keeps_columns() {
        let line = format_message(&message(None, true));
        assert!(line.starts_with("-------------------   u2"));
    }
}
