use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The instruction payload of a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub description: String,
    pub instruction: String,
}

/// A file attached to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFile {
    pub file_name: String,
    pub file_content: String,
    #[serde(default = "default_file_type")]
    pub file_type: String,
}

fn default_file_type() -> String {
    "text".to_string()
}

impl PromptFile {
    pub fn new(file_name: impl Into<String>, file_content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_content: file_content.into(),
            file_type: default_file_type(),
        }
    }
}

/// A reusable prompt template, keyed by `(engine_type, prompt_id)`.
///
/// `prompt_id` and the timestamps are assigned by the repository on first
/// save. Only the owner may mutate a prompt; non-owners may read it only
/// when `is_public` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub prompt_id: Option<String>,
    pub user_id: String,
    pub engine_type: String,
    pub prompt_name: String,
    #[serde(flatten)]
    pub config: PromptConfig,
    #[serde(default)]
    pub files: Vec<PromptFile>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Prompt {
    /// Creates an unsaved private prompt.
    pub fn new(
        user_id: impl Into<String>,
        engine_type: impl Into<String>,
        prompt_name: impl Into<String>,
        config: PromptConfig,
    ) -> Self {
        Self {
            prompt_id: None,
            user_id: user_id.into(),
            engine_type: engine_type.into(),
            prompt_name: prompt_name.into(),
            config,
            files: Vec::new(),
            is_public: false,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_files(mut self, files: Vec<PromptFile>) -> Self {
        self.files = files;
        self
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }
}

/// Typed partial update for a prompt. Fields left `None` are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptUpdate {
    pub prompt_name: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub files: Option<Vec<PromptFile>>,
    pub is_public: Option<bool>,
}

impl PromptUpdate {
    /// Applies this update to a prompt in place.
    pub fn apply(self, prompt: &mut Prompt) {
        if let Some(name) = self.prompt_name {
            prompt.prompt_name = name;
        }
        if let Some(description) = self.description {
            prompt.config.description = description;
        }
        if let Some(instruction) = self.instruction {
            prompt.config.instruction = instruction;
        }
        if let Some(files) = self.files {
            prompt.files = files;
        }
        if let Some(is_public) = self.is_public {
            prompt.is_public = is_public;
        }
    }
}

/// Aggregated per-user prompt usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptStats {
    pub total_prompts: usize,
    pub public_prompts: usize,
    pub private_prompts: usize,
    pub by_engine: HashMap<String, usize>,
    pub total_files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let prompt = Prompt::new(
            "user-1",
            "C1",
            "Summarizer",
            PromptConfig {
                description: "General purpose assistant".to_string(),
                instruction: "You are a helpful assistant.".to_string(),
            },
        )
        .with_files(vec![PromptFile::new("notes.txt", "content")]);

        let json = serde_json::to_value(&prompt).unwrap();

        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["engineType"], "C1");
        assert_eq!(json["promptName"], "Summarizer");
        assert_eq!(json["description"], "General purpose assistant");
        assert_eq!(json["instruction"], "You are a helpful assistant.");
        assert_eq!(json["isPublic"], false);
        assert_eq!(json["files"][0]["fileName"], "notes.txt");
        assert_eq!(json["files"][0]["fileType"], "text");
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut prompt = Prompt::new(
            "user-1",
            "C1",
            "Original",
            PromptConfig {
                description: "old description".to_string(),
                instruction: "old instruction".to_string(),
            },
        );

        PromptUpdate {
            prompt_name: Some("Renamed".to_string()),
            instruction: Some("new instruction".to_string()),
            ..Default::default()
        }
        .apply(&mut prompt);

        assert_eq!(prompt.prompt_name, "Renamed");
        assert_eq!(prompt.config.instruction, "new instruction");
        // Untouched fields keep their values.
        assert_eq!(prompt.config.description, "old description");
        assert!(!prompt.is_public);
    }

    #[test]
    fn test_file_type_defaults_to_text() {
        let file: PromptFile =
            serde_json::from_str(r#"{"fileName": "a.md", "fileContent": "x"}"#).unwrap();
        assert_eq!(file.file_type, "text");
    }
}
