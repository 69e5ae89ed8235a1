//! Prompt aggregate: reusable prompt templates and their attachments.

mod types;

pub use types::{Prompt, PromptConfig, PromptFile, PromptStats, PromptUpdate};
