use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Parses a role string. Returns `None` for anything outside the closed
    /// set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// A single message inside a conversation.
///
/// The wire form carries the role twice, as `role` and as the legacy `type`
/// field, so older consumers keep working. The domain model stores it once;
/// the duplication exists only in (de)serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Map<String, Value>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
            metadata: Map::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Wire representation of a message.
#[derive(Serialize, Deserialize)]
struct MessageWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    /// Legacy mirror of `role`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MessageWire {
            role: Some(self.role.as_str().to_string()),
            kind: Some(self.role.as_str().to_string()),
            content: self.content.clone(),
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = MessageWire::deserialize(deserializer)?;
        // `role` wins over the legacy `type`; neither present defaults to
        // a user message, matching what older payloads contained.
        let role = match wire.role.as_deref().or(wire.kind.as_deref()) {
            Some(s) => {
                MessageRole::parse(s).ok_or_else(|| D::Error::custom(format!("unknown role: {s}")))?
            }
            None => MessageRole::User,
        };
        Ok(Message {
            role,
            content: wire.content,
            timestamp: wire.timestamp,
            metadata: wire.metadata,
        })
    }
}

/// A conversation between a user and an engine.
///
/// `conversation_id`, `created_at`, and `updated_at` are assigned by the
/// repository on first save; the identifier never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub conversation_id: Option<String>,
    pub user_id: String,
    pub engine_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Conversation {
    /// Creates an unsaved conversation for a user and engine.
    pub fn new(user_id: impl Into<String>, engine_type: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            user_id: user_id.into(),
            engine_type: engine_type.into(),
            title: None,
            messages: Vec::new(),
            created_at: None,
            updated_at: None,
            metadata: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Appends a message, preserving insertion order.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// Aggregated per-user conversation usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub by_engine: HashMap<String, usize>,
    pub total_messages: usize,
    pub avg_messages_per_conversation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(MessageRole::parse("user"), Some(MessageRole::User));
        assert_eq!(MessageRole::parse("assistant"), Some(MessageRole::Assistant));
        assert_eq!(MessageRole::parse("system"), None);
        assert_eq!(MessageRole::User.as_str(), "user");
    }

    #[test]
    fn test_message_serializes_role_and_legacy_type() {
        let msg = Message::new(MessageRole::Assistant, "Hi there!");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["type"], "assistant");
        assert_eq!(json["content"], "Hi there!");
    }

    #[test]
    fn test_message_deserializes_from_role_or_type() {
        let from_role: Message =
            serde_json::from_str(r#"{"role": "assistant", "content": "a"}"#).unwrap();
        assert_eq!(from_role.role, MessageRole::Assistant);

        let from_type: Message =
            serde_json::from_str(r#"{"type": "assistant", "content": "b"}"#).unwrap();
        assert_eq!(from_type.role, MessageRole::Assistant);

        // `role` wins when the two disagree.
        let both: Message =
            serde_json::from_str(r#"{"role": "user", "type": "assistant", "content": "c"}"#)
                .unwrap();
        assert_eq!(both.role, MessageRole::User);

        // Neither present defaults to user.
        let neither: Message = serde_json::from_str(r#"{"content": "d"}"#).unwrap();
        assert_eq!(neither.role, MessageRole::User);
    }

    #[test]
    fn test_message_rejects_unknown_role() {
        let result: Result<Message, _> =
            serde_json::from_str(r#"{"role": "narrator", "content": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_conversation_wire_field_names() {
        let mut conv = Conversation::new("user-123", "C1").with_title("Test Chat");
        conv.push_message(Message::new(MessageRole::User, "Hello"));

        let json = serde_json::to_value(&conv).unwrap();

        assert_eq!(json["userId"], "user-123");
        assert_eq!(json["engineType"], "C1");
        assert_eq!(json["title"], "Test Chat");
        assert_eq!(json["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_conversation_preserves_message_order() {
        let mut conv = Conversation::new("u", "C1");
        for i in 0..5 {
            conv.push_message(Message::new(MessageRole::User, format!("m{i}")));
        }

        let contents: Vec<_> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m0", "m1", "m2", "m3", "m4"]);
    }
}
