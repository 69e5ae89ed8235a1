//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB AttributeValue maps and
//! domain types. These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use nexus_core::chat::{Conversation, Message, MessageRole};
use nexus_core::prompt::{Prompt, PromptConfig, PromptFile};
use nexus_core::storage::RepositoryError;

/// Formats a timestamp as fixed-width RFC 3339 UTC.
///
/// Fixed width keeps `createdAt`/`updatedAt` index sort keys
/// lexicographically ordered by time.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ============================================================================
// Conversation conversions
// ============================================================================

/// Convert a Conversation to a DynamoDB item.
///
/// The conversation must already carry its identifier and timestamps; the
/// repository populates them before converting.
pub fn conversation_to_item(
    conversation: &Conversation,
) -> Result<HashMap<String, AttributeValue>, RepositoryError> {
    let id = conversation
        .conversation_id
        .as_deref()
        .ok_or_else(|| RepositoryError::InvalidData("conversation has no identifier".to_string()))?;
    let created_at = conversation
        .created_at
        .ok_or_else(|| RepositoryError::InvalidData("conversation has no createdAt".to_string()))?;
    let updated_at = conversation
        .updated_at
        .ok_or_else(|| RepositoryError::InvalidData("conversation has no updatedAt".to_string()))?;

    let mut item = HashMap::new();
    item.insert(
        "conversationId".to_string(),
        AttributeValue::S(id.to_string()),
    );
    item.insert(
        "userId".to_string(),
        AttributeValue::S(conversation.user_id.clone()),
    );
    item.insert(
        "engineType".to_string(),
        AttributeValue::S(conversation.engine_type.clone()),
    );
    if let Some(title) = &conversation.title {
        item.insert("title".to_string(), AttributeValue::S(title.clone()));
    }
    item.insert(
        "messages".to_string(),
        AttributeValue::L(conversation.messages.iter().map(message_to_attr).collect()),
    );
    item.insert(
        "createdAt".to_string(),
        AttributeValue::S(format_timestamp(created_at)),
    );
    item.insert(
        "updatedAt".to_string(),
        AttributeValue::S(format_timestamp(updated_at)),
    );
    if !conversation.metadata.is_empty() {
        item.insert(
            "metadata".to_string(),
            AttributeValue::S(metadata_to_string(&conversation.metadata)),
        );
    }

    Ok(item)
}

/// Convert a DynamoDB item to a Conversation.
pub fn item_to_conversation(
    item: &HashMap<String, AttributeValue>,
) -> Result<Conversation, RepositoryError> {
    let messages = match item.get("messages") {
        Some(attr) => {
            let list = attr.as_l().map_err(|_| {
                RepositoryError::InvalidData("messages is not a list".to_string())
            })?;
            list.iter().map(attr_to_message).collect::<Result<_, _>>()?
        }
        None => Vec::new(),
    };

    Ok(Conversation {
        conversation_id: Some(get_string(item, "conversationId")?),
        user_id: get_string(item, "userId")?,
        engine_type: get_string(item, "engineType")?,
        title: get_optional_string(item, "title"),
        messages,
        created_at: get_optional_datetime(item, "createdAt")?,
        updated_at: get_optional_datetime(item, "updatedAt")?,
        metadata: get_metadata(item, "metadata")?,
    })
}

/// Convert a Message to a DynamoDB map attribute.
///
/// The role is written twice, as `role` and the legacy `type`, for
/// backward-compatible consumers.
pub fn message_to_attr(message: &Message) -> AttributeValue {
    let mut map = HashMap::new();
    map.insert(
        "role".to_string(),
        AttributeValue::S(message.role.as_str().to_string()),
    );
    map.insert(
        "type".to_string(),
        AttributeValue::S(message.role.as_str().to_string()),
    );
    map.insert(
        "content".to_string(),
        AttributeValue::S(message.content.clone()),
    );
    if let Some(timestamp) = message.timestamp {
        map.insert(
            "timestamp".to_string(),
            AttributeValue::S(format_timestamp(timestamp)),
        );
    }
    if !message.metadata.is_empty() {
        map.insert(
            "metadata".to_string(),
            AttributeValue::S(metadata_to_string(&message.metadata)),
        );
    }
    AttributeValue::M(map)
}

/// Convert a DynamoDB map attribute to a Message.
///
/// Accepts the role under either `role` or the legacy `type` field,
/// defaulting to a user message when neither is present.
pub fn attr_to_message(attr: &AttributeValue) -> Result<Message, RepositoryError> {
    let map = attr
        .as_m()
        .map_err(|_| RepositoryError::InvalidData("message is not a map".to_string()))?;

    let role_str = get_optional_string(map, "role").or_else(|| get_optional_string(map, "type"));
    let role = match role_str {
        Some(s) => MessageRole::parse(&s)
            .ok_or_else(|| RepositoryError::InvalidData(format!("unknown role: {s}")))?,
        None => MessageRole::User,
    };

    Ok(Message {
        role,
        content: get_optional_string(map, "content").unwrap_or_default(),
        timestamp: get_optional_datetime(map, "timestamp")?,
        metadata: get_metadata(map, "metadata")?,
    })
}

// ============================================================================
// Prompt conversions
// ============================================================================

/// Convert a Prompt to a DynamoDB item.
pub fn prompt_to_item(prompt: &Prompt) -> Result<HashMap<String, AttributeValue>, RepositoryError> {
    let id = prompt
        .prompt_id
        .as_deref()
        .ok_or_else(|| RepositoryError::InvalidData("prompt has no identifier".to_string()))?;
    let created_at = prompt
        .created_at
        .ok_or_else(|| RepositoryError::InvalidData("prompt has no createdAt".to_string()))?;
    let updated_at = prompt
        .updated_at
        .ok_or_else(|| RepositoryError::InvalidData("prompt has no updatedAt".to_string()))?;

    let mut item = HashMap::new();
    item.insert(
        "engineType".to_string(),
        AttributeValue::S(prompt.engine_type.clone()),
    );
    item.insert("promptId".to_string(), AttributeValue::S(id.to_string()));
    item.insert(
        "userId".to_string(),
        AttributeValue::S(prompt.user_id.clone()),
    );
    item.insert(
        "promptName".to_string(),
        AttributeValue::S(prompt.prompt_name.clone()),
    );
    item.insert(
        "description".to_string(),
        AttributeValue::S(prompt.config.description.clone()),
    );
    item.insert(
        "instruction".to_string(),
        AttributeValue::S(prompt.config.instruction.clone()),
    );
    item.insert(
        "files".to_string(),
        AttributeValue::L(prompt.files.iter().map(file_to_attr).collect()),
    );
    item.insert("isPublic".to_string(), AttributeValue::Bool(prompt.is_public));
    item.insert(
        "createdAt".to_string(),
        AttributeValue::S(format_timestamp(created_at)),
    );
    item.insert(
        "updatedAt".to_string(),
        AttributeValue::S(format_timestamp(updated_at)),
    );

    Ok(item)
}

/// Convert a DynamoDB item to a Prompt.
pub fn item_to_prompt(item: &HashMap<String, AttributeValue>) -> Result<Prompt, RepositoryError> {
    let files = match item.get("files") {
        Some(attr) => {
            let list = attr
                .as_l()
                .map_err(|_| RepositoryError::InvalidData("files is not a list".to_string()))?;
            list.iter().map(attr_to_file).collect::<Result<_, _>>()?
        }
        None => Vec::new(),
    };

    Ok(Prompt {
        prompt_id: Some(get_string(item, "promptId")?),
        user_id: get_optional_string(item, "userId").unwrap_or_default(),
        engine_type: get_string(item, "engineType")?,
        prompt_name: get_optional_string(item, "promptName").unwrap_or_default(),
        config: PromptConfig {
            description: get_optional_string(item, "description").unwrap_or_default(),
            instruction: get_optional_string(item, "instruction").unwrap_or_default(),
        },
        files,
        is_public: get_bool(item, "isPublic", false),
        created_at: get_optional_datetime(item, "createdAt")?,
        updated_at: get_optional_datetime(item, "updatedAt")?,
    })
}

/// Convert a PromptFile to a DynamoDB map attribute.
pub fn file_to_attr(file: &PromptFile) -> AttributeValue {
    let mut map = HashMap::new();
    map.insert(
        "fileName".to_string(),
        AttributeValue::S(file.file_name.clone()),
    );
    map.insert(
        "fileContent".to_string(),
        AttributeValue::S(file.file_content.clone()),
    );
    map.insert(
        "fileType".to_string(),
        AttributeValue::S(file.file_type.clone()),
    );
    AttributeValue::M(map)
}

/// Convert a DynamoDB map attribute to a PromptFile.
pub fn attr_to_file(attr: &AttributeValue) -> Result<PromptFile, RepositoryError> {
    let map = attr
        .as_m()
        .map_err(|_| RepositoryError::InvalidData("file is not a map".to_string()))?;

    Ok(PromptFile {
        file_name: get_optional_string(map, "fileName").unwrap_or_default(),
        file_content: get_optional_string(map, "fileContent").unwrap_or_default(),
        file_type: get_optional_string(map, "fileType").unwrap_or_else(|| "text".to_string()),
    })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Serialize a free-form metadata map as a JSON string attribute.
fn metadata_to_string(metadata: &Map<String, Value>) -> String {
    Value::Object(metadata.clone()).to_string()
}

/// Get a required string attribute.
fn get_string(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get an optional string attribute.
fn get_optional_string(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

/// Get a boolean attribute with a default.
fn get_bool(item: &HashMap<String, AttributeValue>, key: &str, default: bool) -> bool {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(default)
}

/// Get an optional datetime attribute (RFC 3339). Present but malformed is
/// an error; absent is `None`.
fn get_optional_datetime(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    match item.get(key).and_then(|v| v.as_s().ok()) {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| RepositoryError::InvalidData(format!("Invalid datetime {}: {}", key, e))),
        None => Ok(None),
    }
}

/// Get a free-form metadata map stored as a JSON string attribute. Absent
/// defaults to empty.
fn get_metadata(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> Result<Map<String, Value>, RepositoryError> {
    match item.get(key).and_then(|v| v.as_s().ok()) {
        Some(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(RepositoryError::InvalidData(format!(
                "{} is not a JSON object",
                key
            ))),
            Err(e) => Err(RepositoryError::Serialization(e.to_string())),
        },
        None => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::chat::MessageRole;

    fn timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sample_conversation() -> Conversation {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::String("api".to_string()));

        Conversation {
            conversation_id: Some("conv-123".to_string()),
            user_id: "user-123".to_string(),
            engine_type: "C1".to_string(),
            title: Some("Test Conversation".to_string()),
            messages: vec![
                Message::new(MessageRole::User, "Hello")
                    .with_timestamp(timestamp("2024-01-01T00:00:00Z")),
                Message::new(MessageRole::Assistant, "Hi there!")
                    .with_timestamp(timestamp("2024-01-01T00:00:01Z")),
            ],
            created_at: Some(timestamp("2024-01-01T00:00:00Z")),
            updated_at: Some(timestamp("2024-01-01T00:00:01Z")),
            metadata,
        }
    }

    fn sample_prompt() -> Prompt {
        Prompt {
            prompt_id: Some("prompt-1".to_string()),
            user_id: "user-123".to_string(),
            engine_type: "C1".to_string(),
            prompt_name: "Summarizer".to_string(),
            config: PromptConfig {
                description: "General purpose assistant".to_string(),
                instruction: "You are a helpful assistant.".to_string(),
            },
            files: vec![PromptFile::new("notes.txt", "file body")],
            is_public: true,
            created_at: Some(timestamp("2024-01-01T00:00:00Z")),
            updated_at: Some(timestamp("2024-01-02T00:00:00Z")),
        }
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = format_timestamp(timestamp("2024-01-01T00:00:00Z"));
        let b = format_timestamp(timestamp("2024-01-01T00:00:00.5Z"));

        assert_eq!(a.len(), b.len());
        assert!(a.ends_with('Z'));
        assert!(a < b);
    }

    #[test]
    fn test_conversation_round_trip() {
        let conversation = sample_conversation();
        let item = conversation_to_item(&conversation).unwrap();
        let parsed = item_to_conversation(&item).unwrap();

        assert_eq!(parsed, conversation);
    }

    #[test]
    fn test_conversation_item_attribute_names() {
        let conversation = sample_conversation();
        let item = conversation_to_item(&conversation).unwrap();

        assert_eq!(item.get("conversationId").unwrap().as_s().unwrap(), "conv-123");
        assert_eq!(item.get("userId").unwrap().as_s().unwrap(), "user-123");
        assert_eq!(item.get("engineType").unwrap().as_s().unwrap(), "C1");
        assert!(item.contains_key("createdAt"));
        assert!(item.contains_key("updatedAt"));
    }

    #[test]
    fn test_message_attr_carries_role_and_legacy_type() {
        let message = Message::new(MessageRole::Assistant, "Hi");
        let attr = message_to_attr(&message);

        let map = attr.as_m().unwrap();
        assert_eq!(map.get("role").unwrap().as_s().unwrap(), "assistant");
        assert_eq!(map.get("type").unwrap().as_s().unwrap(), "assistant");
    }

    #[test]
    fn test_message_reads_legacy_type_only_items() {
        let mut map = HashMap::new();
        map.insert(
            "type".to_string(),
            AttributeValue::S("assistant".to_string()),
        );
        map.insert("content".to_string(), AttributeValue::S("Hi".to_string()));

        let message = attr_to_message(&AttributeValue::M(map)).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
    }

    #[test]
    fn test_message_without_role_defaults_to_user() {
        let mut map = HashMap::new();
        map.insert("content".to_string(), AttributeValue::S("Hi".to_string()));

        let message = attr_to_message(&AttributeValue::M(map)).unwrap();
        assert_eq!(message.role, MessageRole::User);
    }

    #[test]
    fn test_message_rejects_unknown_role() {
        let mut map = HashMap::new();
        map.insert("role".to_string(), AttributeValue::S("narrator".to_string()));
        map.insert("content".to_string(), AttributeValue::S("Hi".to_string()));

        assert!(attr_to_message(&AttributeValue::M(map)).is_err());
    }

    #[test]
    fn test_unsaved_conversation_is_rejected() {
        let conversation = Conversation::new("user-1", "C1");
        assert!(conversation_to_item(&conversation).is_err());
    }

    #[test]
    fn test_prompt_round_trip() {
        let prompt = sample_prompt();
        let item = prompt_to_item(&prompt).unwrap();
        let parsed = item_to_prompt(&item).unwrap();

        assert_eq!(parsed, prompt);
    }

    #[test]
    fn test_prompt_item_composite_key() {
        let prompt = sample_prompt();
        let item = prompt_to_item(&prompt).unwrap();

        assert_eq!(item.get("engineType").unwrap().as_s().unwrap(), "C1");
        assert_eq!(item.get("promptId").unwrap().as_s().unwrap(), "prompt-1");
        assert!(*item.get("isPublic").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_prompt_defaults_for_sparse_items() {
        let mut item = HashMap::new();
        item.insert("engineType".to_string(), AttributeValue::S("C1".to_string()));
        item.insert("promptId".to_string(), AttributeValue::S("p-1".to_string()));

        let prompt = item_to_prompt(&item).unwrap();
        assert_eq!(prompt.user_id, "");
        assert_eq!(prompt.prompt_name, "");
        assert!(!prompt.is_public);
        assert!(prompt.files.is_empty());
    }

    #[test]
    fn test_metadata_round_trip() {
        let conversation = sample_conversation();
        let item = conversation_to_item(&conversation).unwrap();
        let parsed = item_to_conversation(&item).unwrap();

        assert_eq!(parsed.metadata.get("source").unwrap(), "api");
    }

    #[test]
    fn test_get_string_missing_field() {
        let item = HashMap::new();
        assert!(get_string(&item, "missing").is_err());
    }
}
