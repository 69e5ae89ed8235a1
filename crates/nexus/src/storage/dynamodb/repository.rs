//! DynamoDB repository implementations.
//!
//! Implements the repository traits from `nexus_core::storage` against
//! DynamoDB, with the two-tier read strategy: secondary-index queries first,
//! degrading to a full scan with client-side filtering when the index path
//! fails.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{Duration, Utc};
use uuid::Uuid;

use nexus_core::chat::{Conversation, Message};
use nexus_core::config::Settings;
use nexus_core::prompt::Prompt;
use nexus_core::storage::{ConversationRepository, PromptRepository, RepositoryError, Result};

use super::conversions::{
    conversation_to_item, format_timestamp, item_to_conversation, item_to_prompt, message_to_attr,
    prompt_to_item,
};
use super::error::{
    map_delete_item_error, map_get_item_error, map_put_item_error, map_query_error, map_scan_error,
    map_update_item_error,
};

/// Secondary index on the conversations table, keyed `(userId, createdAt)`.
const USER_CREATED_INDEX: &str = "userId-createdAt-index";

/// Secondary index on the prompts table, keyed `(userId, updatedAt)`.
const USER_INDEX: &str = "userId-index";

/// Builds a DynamoDB client from resolved configuration.
///
/// Uses the AWS SDK default credential chain, pinned to the configured
/// region when one is set.
pub async fn client_from_settings(settings: &Settings) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if !settings.aws_region.is_empty() {
        loader = loader.region(aws_config::Region::new(settings.aws_region.clone()));
    }
    let config = loader.load().await;
    Client::new(&config)
}

// ============================================================================
// Conversation repository
// ============================================================================

/// DynamoDB-backed conversation repository.
///
/// Holds only the client handle and its resolved table identity, both fixed
/// at construction; requests never re-read the environment.
pub struct DynamoDbConversationRepository {
    client: Client,
    table_name: String,
}

impl DynamoDbConversationRepository {
    /// Creates a new repository with the given client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Creates a repository from resolved configuration.
    ///
    /// The table identity comes from the configuration resolver (including
    /// any `CONVERSATIONS_TABLE` override) exactly once, here.
    pub async fn from_settings(settings: &Settings) -> Self {
        let client = client_from_settings(settings).await;
        let table_name = settings.table_name("conversations");
        tracing::info!(table = %table_name, "conversation repository initialized");
        Self::new(client, table_name)
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Indexed listing path: query `(userId, createdAt)` descending,
    /// following continuation tokens until `limit` items or exhaustion.
    async fn query_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        let mut items = Vec::new();
        let mut start_key = None;

        while items.len() < limit {
            let page_size: i32 = (limit - items.len()).try_into().unwrap_or(i32::MAX);
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(USER_CREATED_INDEX)
                .key_condition_expression("userId = :uid")
                .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
                .scan_index_forward(false)
                .limit(page_size);
            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let result = request.send().await.map_err(map_query_error)?;
            items.extend(result.items.unwrap_or_default());

            match result.last_evaluated_key {
                Some(key) if items.len() < limit => start_key = Some(key),
                _ => break,
            }
        }

        items.iter().map(item_to_conversation).collect()
    }

    /// Fallback listing path: full scan, owner filtered client-side. No
    /// ordering guarantee.
    async fn scan_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self.client.scan().table_name(&self.table_name);
            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let result = request.send().await.map_err(map_scan_error)?;
            for item in result.items.unwrap_or_default() {
                let owner = item.get("userId").and_then(|v| v.as_s().ok());
                if owner.map(String::as_str) == Some(user_id) {
                    conversations.push(item_to_conversation(&item)?);
                    if conversations.len() >= limit {
                        return Ok(conversations);
                    }
                }
            }

            match result.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => return Ok(conversations),
            }
        }
    }
}

#[async_trait]
impl ConversationRepository for DynamoDbConversationRepository {
    async fn save(&self, mut conversation: Conversation) -> Result<Conversation> {
        if conversation.conversation_id.is_none() {
            conversation.conversation_id = Some(Uuid::new_v4().to_string());
        }
        let now = Utc::now();
        if conversation.created_at.is_none() {
            conversation.created_at = Some(now);
        }
        conversation.updated_at = Some(now);

        let item = conversation_to_item(&conversation)?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(map_put_item_error)?;

        tracing::debug!(
            conversation_id = conversation.conversation_id.as_deref().unwrap_or_default(),
            "conversation saved"
        );
        Ok(conversation)
    }

    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "conversationId",
                AttributeValue::S(conversation_id.to_string()),
            )
            .send()
            .await
            .map_err(map_get_item_error)?;

        match result.item {
            Some(item) => Ok(Some(item_to_conversation(&item)?)),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        match self.query_by_user(user_id, limit).await {
            Ok(conversations) => {
                tracing::debug!(user_id, count = conversations.len(), "conversations listed");
                Ok(conversations)
            }
            Err(error) => {
                tracing::warn!(
                    %error,
                    user_id,
                    "indexed conversation query failed, falling back to scan"
                );
                self.scan_by_user(user_id, limit).await
            }
        }
    }

    async fn find_recent(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        days: i64,
    ) -> Result<Vec<Conversation>> {
        let cutoff = format_timestamp(Utc::now() - Duration::days(days));
        let mut conversations = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(USER_CREATED_INDEX)
                .key_condition_expression("userId = :uid AND createdAt > :cutoff")
                .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
                .expression_attribute_values(":cutoff", AttributeValue::S(cutoff.clone()))
                .scan_index_forward(false);
            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let result = request.send().await.map_err(map_query_error)?;
            for item in result.items.unwrap_or_default() {
                let conversation = item_to_conversation(&item)?;
                if engine_type.map_or(true, |e| conversation.engine_type == e) {
                    conversations.push(conversation);
                }
            }

            match result.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        Ok(conversations)
    }

    async fn update_messages(&self, conversation_id: &str, messages: &[Message]) -> Result<bool> {
        let now = Utc::now();
        // Missing per-message timestamps are filled at write time.
        let message_attrs: Vec<AttributeValue> = messages
            .iter()
            .map(|message| {
                let mut message = message.clone();
                message.timestamp.get_or_insert(now);
                message_to_attr(&message)
            })
            .collect();

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(
                "conversationId",
                AttributeValue::S(conversation_id.to_string()),
            )
            .update_expression("SET messages = :messages, updatedAt = :updated")
            .condition_expression("attribute_exists(conversationId)")
            .expression_attribute_values(":messages", AttributeValue::L(message_attrs))
            .expression_attribute_values(":updated", AttributeValue::S(format_timestamp(now)))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => match map_update_item_error(err, "Conversation", conversation_id) {
                not_found @ RepositoryError::NotFound { .. } => Err(not_found),
                error => {
                    tracing::error!(%error, conversation_id, "failed to update messages");
                    Ok(false)
                }
            },
        }
    }

    async fn update_title(&self, conversation_id: &str, title: &str) -> Result<bool> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(
                "conversationId",
                AttributeValue::S(conversation_id.to_string()),
            )
            .update_expression("SET title = :title, updatedAt = :updated")
            .condition_expression("attribute_exists(conversationId)")
            .expression_attribute_values(":title", AttributeValue::S(title.to_string()))
            .expression_attribute_values(
                ":updated",
                AttributeValue::S(format_timestamp(Utc::now())),
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => match map_update_item_error(err, "Conversation", conversation_id) {
                not_found @ RepositoryError::NotFound { .. } => Err(not_found),
                error => {
                    tracing::error!(%error, conversation_id, "failed to update title");
                    Ok(false)
                }
            },
        }
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool> {
        // DynamoDB deletes are idempotent: removing an absent key succeeds.
        match self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(
                "conversationId",
                AttributeValue::S(conversation_id.to_string()),
            )
            .send()
            .await
        {
            Ok(_) => {
                tracing::debug!(conversation_id, "conversation deleted");
                Ok(true)
            }
            Err(err) => {
                let error = map_delete_item_error(err);
                tracing::error!(%error, conversation_id, "failed to delete conversation");
                Ok(false)
            }
        }
    }
}

// ============================================================================
// Prompt repository
// ============================================================================

/// DynamoDB-backed prompt repository, keyed `(engineType, promptId)`.
pub struct DynamoDbPromptRepository {
    client: Client,
    table_name: String,
}

impl DynamoDbPromptRepository {
    /// Creates a new repository with the given client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Creates a repository from resolved configuration.
    pub async fn from_settings(settings: &Settings) -> Self {
        let client = client_from_settings(settings).await;
        let table_name = settings.table_name("prompts");
        tracing::info!(table = %table_name, "prompt repository initialized");
        Self::new(client, table_name)
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Indexed listing path: query `(userId, updatedAt)` descending with a
    /// client-side engine filter.
    async fn query_by_user(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Prompt>> {
        let mut prompts = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(USER_INDEX)
                .key_condition_expression("userId = :uid")
                .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
                .scan_index_forward(false);
            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let result = request.send().await.map_err(map_query_error)?;
            for item in result.items.unwrap_or_default() {
                let prompt = item_to_prompt(&item)?;
                if engine_type.map_or(true, |e| prompt.engine_type == e) {
                    prompts.push(prompt);
                    if prompts.len() >= limit {
                        return Ok(prompts);
                    }
                }
            }

            match result.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => return Ok(prompts),
            }
        }
    }

    /// Fallback listing path: full scan with client-side owner and engine
    /// filtering.
    async fn scan_by_user(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Prompt>> {
        let mut prompts = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self.client.scan().table_name(&self.table_name);
            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let result = request.send().await.map_err(map_scan_error)?;
            for item in result.items.unwrap_or_default() {
                let owner = item.get("userId").and_then(|v| v.as_s().ok());
                if owner.map(String::as_str) != Some(user_id) {
                    continue;
                }
                let prompt = item_to_prompt(&item)?;
                if engine_type.map_or(true, |e| prompt.engine_type == e) {
                    prompts.push(prompt);
                    if prompts.len() >= limit {
                        return Ok(prompts);
                    }
                }
            }

            match result.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => return Ok(prompts),
            }
        }
    }
}

#[async_trait]
impl PromptRepository for DynamoDbPromptRepository {
    async fn save(&self, mut prompt: Prompt) -> Result<Prompt> {
        if prompt.prompt_id.is_none() {
            prompt.prompt_id = Some(Uuid::new_v4().to_string());
        }
        let now = Utc::now();
        if prompt.created_at.is_none() {
            prompt.created_at = Some(now);
        }
        prompt.updated_at = Some(now);

        let item = prompt_to_item(&prompt)?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(map_put_item_error)?;

        tracing::debug!(
            prompt_id = prompt.prompt_id.as_deref().unwrap_or_default(),
            "prompt saved"
        );
        Ok(prompt)
    }

    async fn find_by_id(&self, engine_type: &str, prompt_id: &str) -> Result<Option<Prompt>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("engineType", AttributeValue::S(engine_type.to_string()))
            .key("promptId", AttributeValue::S(prompt_id.to_string()))
            .send()
            .await
            .map_err(map_get_item_error)?;

        match result.item {
            Some(item) => Ok(Some(item_to_prompt(&item)?)),
            None => Ok(None),
        }
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Prompt>> {
        match self.query_by_user(user_id, engine_type, limit).await {
            Ok(prompts) => Ok(prompts),
            Err(error) => {
                tracing::warn!(
                    %error,
                    user_id,
                    "indexed prompt query failed, falling back to scan"
                );
                self.scan_by_user(user_id, engine_type, limit).await
            }
        }
    }

    async fn find_public(&self, engine_type: Option<&str>, limit: usize) -> Result<Vec<Prompt>> {
        let mut prompts = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self.client.scan().table_name(&self.table_name);
            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let result = request.send().await.map_err(map_scan_error)?;
            for item in result.items.unwrap_or_default() {
                let prompt = item_to_prompt(&item)?;
                if !prompt.is_public {
                    continue;
                }
                if engine_type.map_or(true, |e| prompt.engine_type == e) {
                    prompts.push(prompt);
                    if prompts.len() >= limit {
                        return Ok(prompts);
                    }
                }
            }

            match result.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => return Ok(prompts),
            }
        }
    }

    async fn delete(&self, engine_type: &str, prompt_id: &str) -> Result<bool> {
        match self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("engineType", AttributeValue::S(engine_type.to_string()))
            .key("promptId", AttributeValue::S(prompt_id.to_string()))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let error = map_delete_item_error(err);
                tracing::error!(%error, prompt_id, "failed to delete prompt");
                Ok(false)
            }
        }
    }
}
