use async_trait::async_trait;

use crate::chat::{Conversation, Message};
use crate::prompt::Prompt;

use super::Result;

/// Repository for conversation persistence.
///
/// Listing semantics: `find_by_user` guarantees descending creation-time
/// order only on its indexed path; when the index is unavailable it degrades
/// to an unordered scan rather than failing. `find_recent` has no such
/// fallback and propagates index errors. This asymmetry is deliberate —
/// availability of the conversation list is worth more than its ordering.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Persists a conversation as a single atomic put.
    ///
    /// Generates an identifier when absent, sets `created_at` on first save
    /// only, and always refreshes `updated_at`. Returns the entity with
    /// identifiers and timestamps populated.
    async fn save(&self, conversation: Conversation) -> Result<Conversation>;

    /// Point lookup by identifier. Absent is `Ok(None)`, never an error.
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Lists a user's conversations, most recent first, up to `limit`.
    ///
    /// Falls back to a full scan with client-side owner filtering (order
    /// unconstrained) when the indexed query fails. Errors only when the
    /// fallback itself also fails.
    async fn find_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>>;

    /// Lists a user's conversations created within the last `days` days,
    /// most recent first, optionally filtered by engine type.
    async fn find_recent(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        days: i64,
    ) -> Result<Vec<Conversation>>;

    /// Replaces the full message sequence and refreshes `updated_at` in one
    /// conditional update.
    ///
    /// Returns `Ok(false)` on a storage-level failure (logged; the caller
    /// decides whether to retry) and `Err(NotFound)` when there is no
    /// conversation to update.
    async fn update_messages(&self, conversation_id: &str, messages: &[Message]) -> Result<bool>;

    /// Same shape as [`Self::update_messages`], narrower expression.
    async fn update_title(&self, conversation_id: &str, title: &str) -> Result<bool>;

    /// Idempotent delete: removing an absent identifier still reports
    /// success. `Ok(false)` on storage-level failure.
    async fn delete(&self, conversation_id: &str) -> Result<bool>;
}

/// Repository for prompt persistence, keyed by `(engine_type, prompt_id)`.
///
/// Structurally identical to [`ConversationRepository`]: same save
/// semantics, same indexed-then-scan listing strategy.
#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Persists a prompt as a single atomic put; same identifier and
    /// timestamp rules as conversation save.
    async fn save(&self, prompt: Prompt) -> Result<Prompt>;

    /// Point lookup by composite key. Absent is `Ok(None)`.
    async fn find_by_id(&self, engine_type: &str, prompt_id: &str) -> Result<Option<Prompt>>;

    /// Lists a user's prompts, most recently updated first, up to `limit`,
    /// optionally filtered by engine type (applied client-side).
    ///
    /// Same index-with-scan-fallback strategy as conversation listing.
    async fn find_by_user(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Prompt>>;

    /// Lists public prompts up to `limit`, optionally filtered by engine
    /// type. Backed by a scan with client-side visibility filtering.
    async fn find_public(&self, engine_type: Option<&str>, limit: usize) -> Result<Vec<Prompt>>;

    /// Idempotent delete by composite key.
    async fn delete(&self, engine_type: &str, prompt_id: &str) -> Result<bool>;
}
