use nexus_core::prompt::{Prompt, PromptConfig, PromptFile, PromptStats, PromptUpdate};
use nexus_core::storage::PromptRepository;

use super::error::{Result, ServiceError};

/// Default cap on the number of public prompts returned by a listing.
pub const DEFAULT_PUBLIC_PROMPT_LIMIT: usize = 50;

/// Cap on owner-scoped prompt listings.
const USER_PROMPT_LIMIT: usize = 1000;

/// Prompt business logic.
///
/// Ownership is enforced here: mutation requires the caller to be the
/// stored owner, reads require ownership or public visibility.
pub struct PromptService<R> {
    repository: R,
}

impl<R: PromptRepository> PromptService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Creates and persists a new prompt.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_prompt(
        &self,
        user_id: &str,
        engine_type: &str,
        prompt_name: &str,
        description: &str,
        instruction: &str,
        files: Vec<PromptFile>,
        is_public: bool,
    ) -> Result<Prompt> {
        let config = PromptConfig {
            description: description.to_string(),
            instruction: instruction.to_string(),
        };
        let mut prompt = Prompt::new(user_id, engine_type, prompt_name, config).with_files(files);
        prompt.is_public = is_public;

        let saved = self.repository.save(prompt).await?;
        tracing::info!(
            prompt_id = saved.prompt_id.as_deref().unwrap_or_default(),
            user_id,
            "prompt created"
        );
        Ok(saved)
    }

    /// Fetches a prompt by composite key. Absent is `Ok(None)`.
    pub async fn get_prompt(&self, engine_type: &str, prompt_id: &str) -> Result<Option<Prompt>> {
        Ok(self.repository.find_by_id(engine_type, prompt_id).await?)
    }

    /// Lists a user's prompts, optionally filtered by engine type.
    pub async fn get_user_prompts(
        &self,
        user_id: &str,
        engine_type: Option<&str>,
    ) -> Result<Vec<Prompt>> {
        Ok(self
            .repository
            .find_by_user(user_id, engine_type, USER_PROMPT_LIMIT)
            .await?)
    }

    /// Lists public prompts up to `limit`, optionally filtered by engine
    /// type.
    pub async fn get_public_prompts(
        &self,
        engine_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Prompt>> {
        Ok(self.repository.find_public(engine_type, limit).await?)
    }

    /// Applies a partial update to a prompt owned by `user_id`.
    pub async fn update_prompt(
        &self,
        engine_type: &str,
        prompt_id: &str,
        user_id: &str,
        update: PromptUpdate,
    ) -> Result<Prompt> {
        let mut prompt = self.owned_prompt(engine_type, prompt_id, user_id).await?;
        update.apply(&mut prompt);

        let saved = self.repository.save(prompt).await?;
        tracing::info!(prompt_id, user_id, "prompt updated");
        Ok(saved)
    }

    /// Deletes a prompt owned by `user_id`.
    pub async fn delete_prompt(
        &self,
        engine_type: &str,
        prompt_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        self.owned_prompt(engine_type, prompt_id, user_id).await?;

        let deleted = self.repository.delete(engine_type, prompt_id).await?;
        tracing::info!(prompt_id, user_id, "prompt deleted");
        Ok(deleted)
    }

    /// Clones a prompt the caller can read into a new private prompt owned
    /// by the caller.
    pub async fn clone_prompt(
        &self,
        engine_type: &str,
        prompt_id: &str,
        user_id: &str,
        new_name: Option<String>,
    ) -> Result<Prompt> {
        let original = self
            .repository
            .find_by_id(engine_type, prompt_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity_type: "Prompt",
                id: prompt_id.to_string(),
            })?;

        if !original.is_public && original.user_id != user_id {
            return Err(ServiceError::PermissionDenied {
                entity_type: "Prompt",
                id: prompt_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        let prompt_name =
            new_name.unwrap_or_else(|| format!("{} (copy)", original.prompt_name));
        let clone = Prompt::new(user_id, engine_type, prompt_name, original.config.clone())
            .with_files(original.files.clone());

        let saved = self.repository.save(clone).await?;
        tracing::info!(
            source = prompt_id,
            clone = saved.prompt_id.as_deref().unwrap_or_default(),
            "prompt cloned"
        );
        Ok(saved)
    }

    /// Case-insensitive name search over the caller's own prompts.
    pub async fn search_prompts(&self, user_id: &str, prompt_name: &str) -> Result<Vec<Prompt>> {
        let needle = prompt_name.to_lowercase();
        let prompts = self.get_user_prompts(user_id, None).await?;
        Ok(prompts
            .into_iter()
            .filter(|p| p.prompt_name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Checks whether `user_id` may access the prompt.
    ///
    /// The owner always passes; non-owners pass only when the prompt is
    /// public and ownership is not required. Absent prompts and lookup
    /// errors are both `false`.
    pub async fn validate_prompt_access(
        &self,
        engine_type: &str,
        prompt_id: &str,
        user_id: &str,
        require_owner: bool,
    ) -> bool {
        match self.repository.find_by_id(engine_type, prompt_id).await {
            Ok(Some(prompt)) => {
                if prompt.user_id == user_id {
                    true
                } else if require_owner {
                    false
                } else {
                    prompt.is_public
                }
            }
            Ok(None) => false,
            Err(error) => {
                tracing::error!(%error, prompt_id, "failed to validate access");
                false
            }
        }
    }

    /// Tallies per-user prompt statistics.
    pub async fn get_prompt_statistics(&self, user_id: &str) -> Result<PromptStats> {
        let prompts = self.get_user_prompts(user_id, None).await?;

        let mut stats = PromptStats {
            total_prompts: prompts.len(),
            ..Default::default()
        };

        for prompt in &prompts {
            if prompt.is_public {
                stats.public_prompts += 1;
            } else {
                stats.private_prompts += 1;
            }
            *stats.by_engine.entry(prompt.engine_type.clone()).or_insert(0) += 1;
            stats.total_files += prompt.files.len();
        }

        Ok(stats)
    }

    /// Fetches a prompt and enforces ownership, for the mutation paths.
    async fn owned_prompt(
        &self,
        engine_type: &str,
        prompt_id: &str,
        user_id: &str,
    ) -> Result<Prompt> {
        let prompt = self
            .repository
            .find_by_id(engine_type, prompt_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity_type: "Prompt",
                id: prompt_id.to_string(),
            })?;

        if prompt.user_id != user_id {
            return Err(ServiceError::PermissionDenied {
                entity_type: "Prompt",
                id: prompt_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        Ok(prompt)
    }
}
