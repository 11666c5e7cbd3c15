//! Conversation messaging: history, delivery, typing, and read receipts.

mod history;
mod session;
mod types;


pub use history::MessageHistory;
pub use session::{ChatError, ChatSession};
pub use types::{
    ChatConfig, ChatEvent, ConversationThread, Delivery, Message, MessageKind, Participant,
    SenderRole,
};
