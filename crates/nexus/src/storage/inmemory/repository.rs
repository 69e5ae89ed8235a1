//! In-memory repository implementations.
//!
//! Mirror the observable semantics of the DynamoDB backend — descending
//! sort-key order on the indexed path, unordered scan fallback — so the
//! two-tier read strategy can be exercised without AWS access. The
//! `fail_indexed_queries` toggle simulates a missing or broken secondary
//! index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use nexus_core::chat::{Conversation, Message};
use nexus_core::prompt::Prompt;
use nexus_core::storage::{ConversationRepository, PromptRepository, RepositoryError, Result};

fn simulated_index_failure() -> RepositoryError {
    RepositoryError::QueryFailed("simulated secondary index failure".to_string())
}

// ============================================================================
// Conversation repository
// ============================================================================

/// In-memory conversation storage for testing.
///
/// Uses a HashMap wrapped in `Arc<RwLock<_>>` for thread-safe access. Data
/// is not persisted and will be lost when the repository is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationRepository {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
    fail_indexed: Arc<AtomicBool>,
}

impl InMemoryConversationRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every indexed query fail, forcing `find_by_user` onto its scan
    /// fallback and `find_recent` into an error.
    pub fn fail_indexed_queries(&self, fail: bool) {
        self.fail_indexed.store(fail, Ordering::SeqCst);
    }

    fn indexed_path(&self) -> Result<()> {
        if self.fail_indexed.load(Ordering::SeqCst) {
            return Err(simulated_index_failure());
        }
        Ok(())
    }

    /// Indexed listing path: descending creation time, like the real index.
    async fn query_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        self.indexed_path()?;
        let conversations = self.conversations.read().await;
        let mut matches: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn save(&self, mut conversation: Conversation) -> Result<Conversation> {
        if conversation.conversation_id.is_none() {
            conversation.conversation_id = Some(Uuid::new_v4().to_string());
        }
        let now = Utc::now();
        if conversation.created_at.is_none() {
            conversation.created_at = Some(now);
        }
        conversation.updated_at = Some(now);

        let id = conversation
            .conversation_id
            .clone()
            .expect("identifier assigned above");
        let mut conversations = self.conversations.write().await;
        conversations.insert(id, conversation.clone());
        Ok(conversation)
    }

    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(conversation_id).cloned())
    }

    async fn find_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        match self.query_by_user(user_id, limit).await {
            Ok(matches) => Ok(matches),
            Err(error) => {
                tracing::warn!(
                    %error,
                    user_id,
                    "indexed conversation query failed, falling back to scan"
                );
                // Scan fallback: map iteration order, no ordering guarantee.
                let conversations = self.conversations.read().await;
                let mut matches: Vec<Conversation> = conversations
                    .values()
                    .filter(|c| c.user_id == user_id)
                    .cloned()
                    .collect();
                matches.truncate(limit);
                Ok(matches)
            }
        }
    }

    async fn find_recent(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        days: i64,
    ) -> Result<Vec<Conversation>> {
        self.indexed_path()?;
        let cutoff = Utc::now() - Duration::days(days);

        let conversations = self.conversations.read().await;
        let mut matches: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| c.created_at.map_or(false, |created| created > cutoff))
            .filter(|c| engine_type.map_or(true, |e| c.engine_type == e))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn update_messages(&self, conversation_id: &str, messages: &[Message]) -> Result<bool> {
        let mut conversations = self.conversations.write().await;
        let conversation =
            conversations
                .get_mut(conversation_id)
                .ok_or_else(|| RepositoryError::NotFound {
                    entity_type: "Conversation",
                    id: conversation_id.to_string(),
                })?;

        let now = Utc::now();
        conversation.messages = messages
            .iter()
            .map(|message| {
                let mut message = message.clone();
                message.timestamp.get_or_insert(now);
                message
            })
            .collect();
        conversation.updated_at = Some(now);
        Ok(true)
    }

    async fn update_title(&self, conversation_id: &str, title: &str) -> Result<bool> {
        let mut conversations = self.conversations.write().await;
        let conversation =
            conversations
                .get_mut(conversation_id)
                .ok_or_else(|| RepositoryError::NotFound {
                    entity_type: "Conversation",
                    id: conversation_id.to_string(),
                })?;

        conversation.title = Some(title.to_string());
        conversation.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool> {
        let mut conversations = self.conversations.write().await;
        conversations.remove(conversation_id);
        // Idempotent: absent identifiers still report success.
        Ok(true)
    }
}

// ============================================================================
// Prompt repository
// ============================================================================

/// In-memory prompt storage for testing, keyed `(engine_type, prompt_id)`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPromptRepository {
    prompts: Arc<RwLock<HashMap<(String, String), Prompt>>>,
    fail_indexed: Arc<AtomicBool>,
}

impl InMemoryPromptRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every indexed query fail, forcing `find_by_user` onto its scan
    /// fallback.
    pub fn fail_indexed_queries(&self, fail: bool) {
        self.fail_indexed.store(fail, Ordering::SeqCst);
    }

    fn indexed_path(&self) -> Result<()> {
        if self.fail_indexed.load(Ordering::SeqCst) {
            return Err(simulated_index_failure());
        }
        Ok(())
    }

    /// Indexed listing path: descending update time, like the real index.
    async fn query_by_user(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Prompt>> {
        self.indexed_path()?;
        let prompts = self.prompts.read().await;
        let mut matches: Vec<Prompt> = prompts
            .values()
            .filter(|p| p.user_id == user_id)
            .filter(|p| engine_type.map_or(true, |e| p.engine_type == e))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl PromptRepository for InMemoryPromptRepository {
    async fn save(&self, mut prompt: Prompt) -> Result<Prompt> {
        if prompt.prompt_id.is_none() {
            prompt.prompt_id = Some(Uuid::new_v4().to_string());
        }
        let now = Utc::now();
        if prompt.created_at.is_none() {
            prompt.created_at = Some(now);
        }
        prompt.updated_at = Some(now);

        let id = prompt.prompt_id.clone().expect("identifier assigned above");
        let mut prompts = self.prompts.write().await;
        prompts.insert((prompt.engine_type.clone(), id), prompt.clone());
        Ok(prompt)
    }

    async fn find_by_id(&self, engine_type: &str, prompt_id: &str) -> Result<Option<Prompt>> {
        let prompts = self.prompts.read().await;
        Ok(prompts
            .get(&(engine_type.to_string(), prompt_id.to_string()))
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Prompt>> {
        match self.query_by_user(user_id, engine_type, limit).await {
            Ok(matches) => Ok(matches),
            Err(error) => {
                tracing::warn!(
                    %error,
                    user_id,
                    "indexed prompt query failed, falling back to scan"
                );
                let prompts = self.prompts.read().await;
                let mut matches: Vec<Prompt> = prompts
                    .values()
                    .filter(|p| p.user_id == user_id)
                    .filter(|p| engine_type.map_or(true, |e| p.engine_type == e))
                    .cloned()
                    .collect();
                matches.truncate(limit);
                Ok(matches)
            }
        }
    }

    async fn find_public(&self, engine_type: Option<&str>, limit: usize) -> Result<Vec<Prompt>> {
        let prompts = self.prompts.read().await;
        let mut matches: Vec<Prompt> = prompts
            .values()
            .filter(|p| p.is_public)
            .filter(|p| engine_type.map_or(true, |e| p.engine_type == e))
            .cloned()
            .collect();
        matches.truncate(limit);
        Ok(matches)
    }

    async fn delete(&self, engine_type: &str, prompt_id: &str) -> Result<bool> {
        let mut prompts = self.prompts.write().await;
        prompts.remove(&(engine_type.to_string(), prompt_id.to_string()));
        Ok(true)
    }
}
