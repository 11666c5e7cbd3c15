//! Ordered, de-duplicated message history for one conversation.
//!
//! Messages are ordered by their authoritative creation time. Messages with
//! no usable timestamp sort as "now", i.e. after everything already known.
//! Ties keep insertion order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::types::Message;

fn sort_key(msg: &Message, now: DateTime<Utc>) -> DateTime<Utc> {
    msg.created_at.unwrap_or(now)
}

/// In-memory history of a single conversation.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    conversation_id: String,
    messages: Vec<Message>,
    ids: HashSet<String>,
}

impl MessageHistory {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Build a history from an unordered batch: first occurrence of each id
    /// wins, then a stable sort by timestamp.
    pub fn from_batch(conversation_id: impl Into<String>, batch: Vec<Message>) -> Self {
        let mut history = Self::new(conversation_id);
        for msg in batch {
            if history.ids.insert(msg.id.clone()) {
                history.messages.push(msg);
            }
        }
        let now = Utc::now();
        history.messages.sort_by_key(|m| sort_key(m, now));
        history
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Insert at the chronological position. Returns false for a duplicate id.
    pub fn insert(&mut self, msg: Message) -> bool {
        if self.ids.contains(&msg.id) {
            return false;
        }
        let now = Utc::now();
        let key = sort_key(&msg, now);
        // Upper bound: after every message with an equal key.
        let pos = self
            .messages
            .partition_point(|existing| sort_key(existing, now) <= key);
        self.ids.insert(msg.id.clone());
        self.messages.insert(pos, msg);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message by order.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Mark messages sent by `sender_id` as read. Returns how many flipped.
    pub fn mark_read_from(&mut self, sender_id: &str) -> usize {
        let mut flipped = 0;
        for msg in self.messages.iter_mut().filter(|m| m.sender_id == sender_id) {
            if !msg.is_read {
                msg.is_read = true;
                flipped += 1;
            }
        }
        flipped
    }

    /// Mark every message not sent by `user_id` as read.
    pub fn mark_read_except(&mut self, user_id: &str) -> usize {
        let mut flipped = 0;
        for msg in self.messages.iter_mut().filter(|m| m.sender_id != user_id) {
            if !msg.is_read {
                msg.is_read = true;
                flipped += 1;
            }
        }
        flipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::{MessageKind, SenderRole};

    fn msg(id: &str, secs: Option<i64>) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "conv".to_string(),
            sender_id: "u2".to_string(),
            sender_role: SenderRole::Employer,
            content: format!("body of {id}"),
            created_at: secs.and_then(|s| DateTime::from_timestamp(s, 0)),
            is_read: false,
            message_type: MessageKind::Text,
            file_url: None,
        }
    }

    fn ids(history: &MessageHistory) -> Vec<&str> {
        history.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn duplicate_arrivals_collapse_in_time_order() {
        let mut history = MessageHistory::new("conv");
        assert!(history.insert(msg("m2", Some(10))));
        assert!(history.insert(msg("m1", Some(5))));
        assert!(!history.insert(msg("m2", Some(10))));
        assert_eq!(ids(&history), vec!["m1", "m2"]);
    }

    #[test]
    fn batch_keeps_first_occurrence() {
        let mut later_copy = msg("a", Some(1));
        later_copy.content = "second copy".into();
        let history =
            MessageHistory::from_batch("conv", vec![msg("a", Some(1)), later_copy, msg("b", Some(0))]);
        assert_eq!(ids(&history), vec!["b", "a"]);
        assert_eq!(history.messages()[1].content, "body of a");
    }

    #[test]
    fn batch_is_idempotent() {
        let batch = vec![msg("c", Some(3)), msg("a", Some(1)), msg("b", Some(2)), msg("a", Some(1))];
        let first = MessageHistory::from_batch("conv", batch.clone());
        let second = MessageHistory::from_batch("conv", batch);
        assert_eq!(first.messages(), second.messages());
    }

    #[test]
    fn missing_timestamps_sort_last() {
        let history = MessageHistory::from_batch(
            "conv",
            vec![msg("x", None), msg("b", Some(20)), msg("a", Some(10))],
        );
        assert_eq!(ids(&history), vec!["a", "b", "x"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut history = MessageHistory::new("conv");
        history.insert(msg("first", Some(7)));
        history.insert(msg("second", Some(7)));
        history.insert(msg("third", Some(7)));
        assert_eq!(ids(&history), vec!["first", "second", "third"]);
    }

    #[test]
    fn late_arrival_slots_into_place() {
        let mut history = MessageHistory::from_batch(
            "conv",
            vec![msg("a", Some(1)), msg("c", Some(3))],
        );
        history.insert(msg("b", Some(2)));
        assert_eq!(ids(&history), vec!["a", "b", "c"]);
        assert_eq!(history.last().map(|m| m.id.as_str()), Some("c"));
    }

    #[test]
    fn mark_read_filters_by_sender() {
        let mut history = MessageHistory::from_batch("conv", vec![msg("a", Some(1))]);
        let mut mine = msg("b", Some(2));
        mine.sender_id = "me".into();
        history.insert(mine);

        assert_eq!(history.mark_read_from("me"), 1);
        assert_eq!(history.mark_read_from("me"), 0);
        assert_eq!(history.mark_read_except("me"), 1);
        assert!(history.messages().iter().all(|m| m.is_read));
    }
}
