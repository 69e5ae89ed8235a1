//! Conversation aggregate: conversations and their messages.

mod types;

pub use types::{Conversation, ConversationStats, Message, MessageRole};
