//! Configuration loaded from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use smartapi::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! ```

mod error;
mod logging;
mod middleware;
mod parse;
mod server;

pub use error::ConfigError;
pub use logging::LoggingConfig;
pub use middleware::MiddlewareConfig;
pub use parse::{env_bool, env_duration, env_opt, env_or, env_parse, parse_duration};
pub use server::ServerConfig;

/// Complete application configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Middleware configuration.
    pub middleware: MiddlewareConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            middleware: MiddlewareConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);
        match self.server.header_read_timeout {
            Some(timeout) => info!("  Header read timeout: {}s", timeout.as_secs()),
            None => info!("  Header read timeout: disabled"),
        }
        info!("  Drain timeout: {}s", self.server.drain_timeout.as_secs());

        if self.middleware.access_log {
            info!("  Access log: enabled");
        }
    }
}
