//! Logging configuration.

use super::parse::env_or;
use super::ConfigError;

/// Target used when no filter is configured.
const DEFAULT_FILTER: &str = "smartapi=info";

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Service name for structured logging.
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            service_name: "smartapi".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Load configuration from environment variables.
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error
    /// RUST_LOG accepts full tracing filter syntax: smartapi=debug,hyper=warn
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            filter: Self::resolve_log_filter()?,
            service_name: env_or("SERVICE_NAME", "smartapi"),
        })
    }

    /// Priority: LOG_LEVEL > RUST_LOG > default (info)
    fn resolve_log_filter() -> Result<String, ConfigError> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            let level = level.to_lowercase();
            return match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(format!("smartapi={}", level)),
                _ => Err(ConfigError::Invalid {
                    key: "LOG_LEVEL".into(),
                    message: format!(
                        "'{}', expected: trace, debug, info, warn, error",
                        level
                    ),
                }),
            };
        }

        if let Ok(filter) = std::env::var("RUST_LOG") {
            return Ok(filter);
        }

        Ok(DEFAULT_FILTER.to_string())
    }
}
