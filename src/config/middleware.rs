//! Middleware configuration.

use super::parse::env_bool;
use super::ConfigError;

/// Middleware configuration loaded from environment.
#[derive(Clone, Debug, Default)]
pub struct MiddlewareConfig {
    /// Access logging enabled.
    pub access_log: bool,
}

impl MiddlewareConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_log: env_bool("ACCESS_LOG", false),
        })
    }
}
