//! Deployment environments and their per-stage defaults.

/// Deployment environment tag.
///
/// Unrecognized tags fall back to [`Environment::Dev`] with a warning; a
/// misconfigured tag is a diagnostic, never a startup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Dev,
    Staging,
    Prod,
}

impl Environment {
    /// Parses an environment tag, defaulting to `Dev` for unknown values.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "dev" | "test" => Environment::Dev,
            "staging" => Environment::Staging,
            "prod" => Environment::Prod,
            other => {
                tracing::warn!(tag = other, "unrecognized environment tag, using dev");
                Environment::Dev
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }

    /// Returns the static defaults for this stage.
    pub fn profile(&self) -> &'static EnvironmentProfile {
        match self {
            Environment::Dev => &DEV_PROFILE,
            Environment::Staging => &STAGING_PROFILE,
            Environment::Prod => &PROD_PROFILE,
        }
    }
}

/// Per-stage defaults applied when the corresponding environment variables
/// are not set.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentProfile {
    pub log_level: &'static str,
    pub model_id: &'static str,
    pub max_input_tokens: u32,
    pub max_output_tokens: u32,
    pub model_temperature: f32,
    pub max_conversation_length: u32,
}

static DEV_PROFILE: EnvironmentProfile = EnvironmentProfile {
    log_level: "DEBUG",
    model_id: "anthropic.claude-3-sonnet-20240229-v1:0",
    max_input_tokens: 2000,
    max_output_tokens: 2000,
    model_temperature: 0.7,
    max_conversation_length: 20,
};

static STAGING_PROFILE: EnvironmentProfile = EnvironmentProfile {
    log_level: "INFO",
    model_id: "us.anthropic.claude-opus-4-1-20250805-v1:0",
    max_input_tokens: 3000,
    max_output_tokens: 3000,
    model_temperature: 0.7,
    max_conversation_length: 30,
};

static PROD_PROFILE: EnvironmentProfile = EnvironmentProfile {
    log_level: "WARNING",
    model_id: "us.anthropic.claude-opus-4-1-20250805-v1:0",
    max_input_tokens: 4000,
    max_output_tokens: 4000,
    model_temperature: 0.5,
    max_conversation_length: 50,
};
