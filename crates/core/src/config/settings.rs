use std::collections::HashMap;

use super::Environment;

/// API channel for endpoint resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiChannel {
    Rest,
    WebSocket,
}

/// Environment-derived configuration, captured once at construction.
///
/// All resolution methods are pure functions of the captured snapshot:
/// calling them twice with the same `Settings` always yields the same
/// result, and pointing the process at a different environment is purely a
/// matter of constructing from different inputs. Nothing here performs a
/// network call or caches across snapshots.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_name: String,
    pub environment: Environment,
    pub stack_suffix: String,
    pub aws_region: String,
    pub aws_account_id: String,
    pub api_stage: String,
    pub rest_api_id: String,
    pub websocket_api_id: String,
    pub model_id: String,
    pub log_level: String,
    /// Raw environment tag as supplied, kept for diagnostics.
    environment_tag: String,
    /// Captured `<ENTITY>_TABLE` overrides, keyed by the full variable name.
    table_overrides: HashMap<String, String>,
}

impl Settings {
    /// Captures configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Captures configuration from an arbitrary `(key, value)` snapshot.
    ///
    /// This is the test-suite entry point: tests construct settings from a
    /// fixture map instead of mutating the process environment. A key that
    /// is present but empty is kept as-is; defaults apply only to absent
    /// keys.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let get = |key: &str, default: &str| -> String {
            vars.get(key).cloned().unwrap_or_else(|| default.to_string())
        };

        let environment_tag = get("ENVIRONMENT", "dev");
        let environment = Environment::from_tag(&environment_tag);
        let profile = environment.profile();

        let table_overrides = vars
            .iter()
            .filter(|(key, _)| key.ends_with("_TABLE"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            service_name: get("SERVICE_NAME", "nexus"),
            stack_suffix: get("STACK_SUFFIX", "dev"),
            aws_region: get("AWS_REGION", "us-east-1"),
            aws_account_id: get("AWS_ACCOUNT_ID", ""),
            api_stage: get("API_STAGE", "prod"),
            rest_api_id: get("REST_API_ID", ""),
            websocket_api_id: get("WEBSOCKET_API_ID", ""),
            model_id: get("BEDROCK_MODEL_ID", profile.model_id),
            log_level: get("LOG_LEVEL", profile.log_level),
            environment,
            environment_tag,
            table_overrides,
        }
    }

    /// The shared name prefix, `"{service}-"`.
    pub fn table_prefix(&self) -> String {
        format!("{}-", self.service_name)
    }

    /// The shared name suffix, `"-{stack}"`.
    pub fn table_suffix(&self) -> String {
        format!("-{}", self.stack_suffix)
    }

    /// Resolves the physical table name for a logical entity type.
    ///
    /// Precedence: an explicit `<ENTITY>_TABLE` override wins; otherwise the
    /// name is composed as `prefix + base + suffix` where the base comes
    /// from a fixed mapping (unknown entity types pass through unchanged).
    ///
    /// ```
    /// use nexus_core::config::Settings;
    ///
    /// let settings = Settings::from_vars([
    ///     ("SERVICE_NAME".to_string(), "myapp".to_string()),
    ///     ("STACK_SUFFIX".to_string(), "prod".to_string()),
    /// ]);
    /// assert_eq!(settings.table_name("conversations"), "myapp-conversations-prod");
    /// ```
    pub fn table_name(&self, entity_type: &str) -> String {
        let override_key = format!("{}_TABLE", entity_type.to_uppercase());
        if let Some(name) = self.table_overrides.get(&override_key) {
            return name.clone();
        }

        let base = canonical_table_base(entity_type).unwrap_or(entity_type);
        format!("{}{}{}", self.table_prefix(), base, self.table_suffix())
    }

    /// Resolves the deployed function name for a logical function type.
    ///
    /// Same `prefix + base + suffix` composition as [`Settings::table_name`]
    /// with its own base-name mapping.
    pub fn function_name(&self, function_type: &str) -> String {
        let base = canonical_function_base(function_type).unwrap_or(function_type);
        format!("{}{}{}", self.table_prefix(), base, self.table_suffix())
    }

    /// Resolves the public API endpoint for a channel.
    ///
    /// Returns the empty string when the corresponding API identifier is not
    /// configured. Callers must treat an empty result as "endpoint unknown",
    /// not as an error.
    pub fn endpoint(&self, channel: ApiChannel) -> String {
        let (scheme, api_id) = match channel {
            ApiChannel::Rest => ("https", &self.rest_api_id),
            ApiChannel::WebSocket => ("wss", &self.websocket_api_id),
        };

        if api_id.is_empty() {
            return String::new();
        }

        format!(
            "{}://{}.execute-api.{}.amazonaws.com/{}",
            scheme, api_id, self.aws_region, self.api_stage
        )
    }

    /// Checks that the required fields are populated. Diagnostics only:
    /// a failed validation logs warnings but never blocks startup.
    pub fn validate(&self) -> bool {
        let mut valid = true;
        for (field, value) in [
            ("SERVICE_NAME", &self.service_name),
            ("ENVIRONMENT", &self.environment_tag),
            ("AWS_REGION", &self.aws_region),
        ] {
            if value.is_empty() {
                tracing::warn!(field, "required setting is not set");
                valid = false;
            }
        }
        valid
    }
}

/// Fixed logical-type to base-name mapping for tables.
///
/// Both the `websocket` shorthand and the full `websocket_connections` type
/// resolve to the same physical table.
fn canonical_table_base(entity_type: &str) -> Option<&'static str> {
    match entity_type {
        "conversations" => Some("conversations"),
        "prompts" => Some("prompts"),
        "usage" => Some("usage"),
        "websocket" | "websocket_connections" => Some("websocket-connections"),
        "files" => Some("files"),
        "messages" => Some("messages"),
        _ => None,
    }
}

/// Fixed logical-type to base-name mapping for functions.
fn canonical_function_base(function_type: &str) -> Option<&'static str> {
    match function_type {
        "conversation" => Some("conversation-api"),
        "prompt" => Some("prompt-crud"),
        "usage" => Some("usage-handler"),
        "connect" => Some("websocket-connect"),
        "disconnect" => Some("websocket-disconnect"),
        "message" => Some("websocket-message"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::from_vars(vars(&[]));

        assert_eq!(settings.service_name, "nexus");
        assert_eq!(settings.environment, Environment::Dev);
        assert_eq!(settings.stack_suffix, "dev");
        assert_eq!(settings.aws_region, "us-east-1");
        assert_eq!(settings.api_stage, "prod");
    }

    #[test]
    fn test_custom_settings() {
        let settings = Settings::from_vars(vars(&[
            ("SERVICE_NAME", "my-service"),
            ("ENVIRONMENT", "prod"),
            ("STACK_SUFFIX", "prod"),
            ("AWS_REGION", "ap-northeast-2"),
        ]));

        assert_eq!(settings.service_name, "my-service");
        assert_eq!(settings.environment, Environment::Prod);
        assert_eq!(settings.stack_suffix, "prod");
        assert_eq!(settings.aws_region, "ap-northeast-2");
    }

    #[test]
    fn test_table_name_generation() {
        let settings = Settings::from_vars(vars(&[
            ("SERVICE_NAME", "test-service"),
            ("STACK_SUFFIX", "staging"),
        ]));

        assert_eq!(
            settings.table_name("conversations"),
            "test-service-conversations-staging"
        );
        assert_eq!(settings.table_name("prompts"), "test-service-prompts-staging");
        assert_eq!(settings.table_name("usage"), "test-service-usage-staging");
    }

    #[test]
    fn test_table_name_is_deterministic() {
        let settings = Settings::from_vars(vars(&[("SERVICE_NAME", "svc")]));

        assert_eq!(
            settings.table_name("conversations"),
            settings.table_name("conversations")
        );
    }

    #[test]
    fn test_table_name_override_wins() {
        let settings = Settings::from_vars(vars(&[
            ("SERVICE_NAME", "test-service"),
            ("STACK_SUFFIX", "dev"),
            ("CONVERSATIONS_TABLE", "custom-conversations-table"),
        ]));

        assert_eq!(
            settings.table_name("conversations"),
            "custom-conversations-table"
        );
        // Entities without an override still use the pattern.
        assert_eq!(settings.table_name("prompts"), "test-service-prompts-dev");
    }

    #[test]
    fn test_websocket_aliases_share_a_table() {
        let settings = Settings::from_vars(vars(&[
            ("SERVICE_NAME", "nexus"),
            ("STACK_SUFFIX", "dev"),
        ]));

        assert_eq!(
            settings.table_name("websocket"),
            settings.table_name("websocket_connections")
        );
        assert_eq!(
            settings.table_name("websocket"),
            "nexus-websocket-connections-dev"
        );
    }

    #[test]
    fn test_unknown_entity_passes_through() {
        let settings = Settings::from_vars(vars(&[
            ("SERVICE_NAME", "my-service"),
            ("STACK_SUFFIX", "feature-123"),
        ]));

        assert_eq!(settings.table_prefix(), "my-service-");
        assert_eq!(settings.table_suffix(), "-feature-123");
        assert_eq!(settings.table_name("custom"), "my-service-custom-feature-123");
    }

    #[test]
    fn test_function_name_generation() {
        let settings = Settings::from_vars(vars(&[
            ("SERVICE_NAME", "my-app"),
            ("STACK_SUFFIX", "prod"),
        ]));

        assert_eq!(
            settings.function_name("conversation"),
            "my-app-conversation-api-prod"
        );
        assert_eq!(settings.function_name("connect"), "my-app-websocket-connect-prod");
        assert_eq!(settings.function_name("message"), "my-app-websocket-message-prod");
    }

    #[test]
    fn test_endpoint_generation() {
        let settings = Settings::from_vars(vars(&[
            ("AWS_REGION", "us-west-2"),
            ("REST_API_ID", "abc123"),
            ("WEBSOCKET_API_ID", "xyz789"),
            ("API_STAGE", "v1"),
        ]));

        assert_eq!(
            settings.endpoint(ApiChannel::Rest),
            "https://abc123.execute-api.us-west-2.amazonaws.com/v1"
        );
        assert_eq!(
            settings.endpoint(ApiChannel::WebSocket),
            "wss://xyz789.execute-api.us-west-2.amazonaws.com/v1"
        );
    }

    #[test]
    fn test_endpoint_empty_when_unconfigured() {
        let settings = Settings::from_vars(vars(&[]));

        assert_eq!(settings.endpoint(ApiChannel::Rest), "");
        assert_eq!(settings.endpoint(ApiChannel::WebSocket), "");
    }

    #[test]
    fn test_validation() {
        let settings = Settings::from_vars(vars(&[
            ("SERVICE_NAME", "test"),
            ("ENVIRONMENT", "dev"),
            ("AWS_REGION", "us-east-1"),
        ]));
        assert!(settings.validate());

        let settings = Settings::from_vars(vars(&[("SERVICE_NAME", "")]));
        assert!(!settings.validate());
    }

    #[test]
    fn test_profile_defaults_follow_environment() {
        let settings = Settings::from_vars(vars(&[("ENVIRONMENT", "prod")]));
        assert_eq!(settings.log_level, "WARNING");

        let settings = Settings::from_vars(vars(&[
            ("ENVIRONMENT", "prod"),
            ("LOG_LEVEL", "DEBUG"),
        ]));
        assert_eq!(settings.log_level, "DEBUG");
    }
}
