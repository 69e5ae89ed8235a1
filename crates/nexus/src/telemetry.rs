//! Tracing subscriber bootstrap.

use nexus_core::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter derives from the
/// configured log level. Calling this more than once is a no-op.
pub fn init(settings: &Settings) {
    let level = filter_level(&settings.log_level);
    let default_filter = format!("nexus={level},nexus_core={level}");

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Maps a configured log level (upper-case, `WARNING` spelled out) onto a
/// tracing filter directive.
fn filter_level(log_level: &str) -> &'static str {
    match log_level.to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_level_mapping() {
        assert_eq!(filter_level("DEBUG"), "debug");
        assert_eq!(filter_level("WARNING"), "warn");
        assert_eq!(filter_level("warn"), "warn");
        assert_eq!(filter_level("INFO"), "info");
        assert_eq!(filter_level("anything-else"), "info");
    }
}
