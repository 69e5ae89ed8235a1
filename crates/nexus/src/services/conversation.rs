use chrono::Utc;
use serde_json::{Map, Value};

use nexus_core::chat::{Conversation, ConversationStats, Message, MessageRole};
use nexus_core::storage::ConversationRepository;

use super::error::{Result, ServiceError};

/// Default cap on the number of conversations returned by a listing.
pub const DEFAULT_CONVERSATION_LIMIT: usize = 1000;

/// Default lookback window for recent-conversation queries, in days.
pub const DEFAULT_RECENT_DAYS: i64 = 30;

/// Conversations sampled for per-user statistics.
const STATS_SAMPLE_LIMIT: usize = 100;

/// Maximum generated title length, in characters.
const TITLE_MAX_CHARS: usize = 30;

/// Conversation business logic.
pub struct ConversationService<R> {
    repository: R,
}

impl<R: ConversationRepository> ConversationService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Creates and persists a new conversation, optionally seeded with a
    /// first user message. A missing title defaults to a timestamped one.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        engine_type: &str,
        title: Option<String>,
        initial_message: Option<String>,
    ) -> Result<Conversation> {
        let title = title
            .unwrap_or_else(|| format!("New conversation - {}", Utc::now().format("%Y-%m-%d %H:%M")));
        let mut conversation = Conversation::new(user_id, engine_type).with_title(title);

        if let Some(content) = initial_message {
            conversation.push_message(
                Message::new(MessageRole::User, content).with_timestamp(Utc::now()),
            );
        }

        let saved = self.repository.save(conversation).await?;
        tracing::info!(
            conversation_id = saved.conversation_id.as_deref().unwrap_or_default(),
            user_id,
            "conversation created"
        );
        Ok(saved)
    }

    /// Fetches a conversation. Absent is `Ok(None)`.
    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self.repository.find_by_id(conversation_id).await?)
    }

    /// Lists a user's conversations, most recent first, up to `limit`.
    pub async fn get_user_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Conversation>> {
        Ok(self.repository.find_by_user(user_id, limit).await?)
    }

    /// Appends a message to an existing conversation.
    ///
    /// Returns `Err(NotFound)` when the conversation does not exist, and
    /// `Ok(false)` when the storage write failed (the caller decides
    /// whether to retry).
    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<bool> {
        let mut conversation = self
            .repository
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity_type: "Conversation",
                id: conversation_id.to_string(),
            })?;

        let mut message = Message::new(role, content).with_timestamp(Utc::now());
        if let Some(metadata) = metadata {
            message.metadata = metadata;
        }
        conversation.push_message(message);

        Ok(self
            .repository
            .update_messages(conversation_id, &conversation.messages)
            .await?)
    }

    /// Renames a conversation.
    pub async fn update_title(&self, conversation_id: &str, title: &str) -> Result<bool> {
        Ok(self.repository.update_title(conversation_id, title).await?)
    }

    /// Deletes a conversation. Idempotent.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.repository.delete(conversation_id).await?)
    }

    /// Lists a user's conversations from the last `days` days, optionally
    /// filtered by engine type.
    ///
    /// The recent-conversations index has no scan fallback; on a repository
    /// error this logs and returns an empty list rather than failing the
    /// caller.
    pub async fn get_recent_conversations(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        days: i64,
    ) -> Vec<Conversation> {
        match self.repository.find_recent(user_id, engine_type, days).await {
            Ok(conversations) => conversations,
            Err(error) => {
                tracing::error!(%error, user_id, "failed to list recent conversations");
                Vec::new()
            }
        }
    }

    /// Derives a display title from the first non-empty user message.
    pub fn generate_title_from_messages(&self, messages: &[Message]) -> String {
        for message in messages {
            if message.role == MessageRole::User && !message.content.trim().is_empty() {
                let content = message.content.trim();
                if content.chars().count() > TITLE_MAX_CHARS {
                    let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
                    return format!("{truncated}...");
                }
                return content.to_string();
            }
        }
        "New conversation".to_string()
    }

    /// Checks whether `user_id` owns the conversation.
    ///
    /// Absent conversations and lookup errors are both `false`; this is a
    /// gate, not a diagnostic.
    pub async fn validate_conversation_access(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> bool {
        match self.repository.find_by_id(conversation_id).await {
            Ok(Some(conversation)) => conversation.user_id == user_id,
            Ok(None) => false,
            Err(error) => {
                tracing::error!(%error, conversation_id, "failed to validate access");
                false
            }
        }
    }

    /// Tallies per-user conversation statistics over a bounded sample.
    pub async fn get_conversation_statistics(&self, user_id: &str) -> Result<ConversationStats> {
        let conversations = self
            .repository
            .find_by_user(user_id, STATS_SAMPLE_LIMIT)
            .await?;

        let mut stats = ConversationStats {
            total_conversations: conversations.len(),
            ..Default::default()
        };

        for conversation in &conversations {
            *stats
                .by_engine
                .entry(conversation.engine_type.clone())
                .or_insert(0) += 1;
            stats.total_messages += conversation.messages.len();
        }

        if stats.total_conversations > 0 {
            stats.avg_messages_per_conversation =
                stats.total_messages as f64 / stats.total_conversations as f64;
        }

        Ok(stats)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::storage::inmemory::InMemoryConversationRepository;

    fn service() -> ConversationService<InMemoryConversationRepository> {
        ConversationService::new(InMemoryConversationRepository::new())
    }

    #[tokio::test]
    async fn test_create_conversation_defaults_title() {
        let service = service();

        let conversation = service
            .create_conversation("user-1", "C1", None, None)
            .await
            .unwrap();

        assert!(conversation
            .title
            .as_deref()
            .unwrap()
            .starts_with("New conversation - "));
        assert!(conversation.conversation_id.is_some());
    }

    #[tokio::test]
    async fn test_create_conversation_with_initial_message() {
        let service = service();

        let conversation = service
            .create_conversation("user-1", "C1", Some("Chat".to_string()), Some("Hi".to_string()))
            .await
            .unwrap();

        assert_eq!(conversation.title.as_deref(), Some("Chat"));
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].role, MessageRole::User);
        assert!(conversation.messages[0].timestamp.is_some());
    }

    #[tokio::test]
    async fn test_add_message_appends_in_order() {
        let service = service();
        let conversation = service
            .create_conversation("user-1", "C1", None, Some("Hello".to_string()))
            .await
            .unwrap();
        let id = conversation.conversation_id.unwrap();

        assert!(service
            .add_message(&id, MessageRole::Assistant, "Hi there!", None)
            .await
            .unwrap());

        let found = service.get_conversation(&id).await.unwrap().unwrap();
        assert_eq!(found.messages.len(), 2);
        assert_eq!(found.messages[1].role, MessageRole::Assistant);
        assert_eq!(found.messages[1].content, "Hi there!");
    }

    #[tokio::test]
    async fn test_add_message_to_missing_conversation() {
        let service = service();

        let result = service
            .add_message("missing", MessageRole::User, "Hi", None)
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::NotFound {
                entity_type: "Conversation",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_validate_access() {
        let service = service();
        let conversation = service
            .create_conversation("user-1", "C1", None, None)
            .await
            .unwrap();
        let id = conversation.conversation_id.unwrap();

        assert!(service.validate_conversation_access(&id, "user-1").await);
        assert!(!service.validate_conversation_access(&id, "user-2").await);
        assert!(!service.validate_conversation_access("missing", "user-1").await);
    }

    #[tokio::test]
    async fn test_recent_conversations_swallow_index_errors() {
        let repository = InMemoryConversationRepository::new();
        repository.fail_indexed_queries(true);
        let service = ConversationService::new(repository);

        let recent = service
            .get_recent_conversations("user-1", None, DEFAULT_RECENT_DAYS)
            .await;
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn test_generate_title_uses_first_user_message() {
        let service = service();

        let messages = vec![
            Message::new(MessageRole::Assistant, "Welcome!"),
            Message::new(MessageRole::User, "How do I bake bread?"),
        ];
        assert_eq!(
            service.generate_title_from_messages(&messages),
            "How do I bake bread?"
        );
    }

    #[tokio::test]
    async fn test_generate_title_truncates_long_content() {
        let service = service();

        let long = "x".repeat(50);
        let messages = vec![Message::new(MessageRole::User, long)];
        let title = service.generate_title_from_messages(&messages);

        assert_eq!(title.chars().count(), 33);
        assert!(title.ends_with("..."));
    }

    #[tokio::test]
    async fn test_generate_title_fallback() {
        let service = service();

        assert_eq!(service.generate_title_from_messages(&[]), "New conversation");

        let only_assistant = vec![Message::new(MessageRole::Assistant, "Hello")];
        assert_eq!(
            service.generate_title_from_messages(&only_assistant),
            "New conversation"
        );
    }

    #[tokio::test]
    async fn test_statistics_tally() {
        let service = service();
        service
            .create_conversation("user-1", "C1", None, Some("one".to_string()))
            .await
            .unwrap();
        service
            .create_conversation("user-1", "C1", None, Some("two".to_string()))
            .await
            .unwrap();
        service
            .create_conversation("user-1", "C2", None, None)
            .await
            .unwrap();

        let stats = service.get_conversation_statistics("user-1").await.unwrap();

        assert_eq!(stats.total_conversations, 3);
        assert_eq!(stats.by_engine.get("C1"), Some(&2));
        assert_eq!(stats.by_engine.get("C2"), Some(&1));
        assert_eq!(stats.total_messages, 2);
        assert!((stats.avg_messages_per_conversation - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_statistics_empty_user() {
        let service = service();

        let stats = service.get_conversation_statistics("nobody").await.unwrap();
        assert_eq!(stats.total_conversations, 0);
        assert_eq!(stats.avg_messages_per_conversation, 0.0);
    }
}
