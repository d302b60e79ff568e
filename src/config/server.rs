//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use super::parse::{env_duration, env_or, env_parse};
use super::ConfigError;

/// Transport settings for the HTTP listener.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind (LISTEN_ADDR).
    pub listen_addr: SocketAddr,
    /// Time allowed to receive request headers; `None` disables the limit
    /// (HEADER_READ_TIMEOUT).
    pub header_read_timeout: Option<Duration>,
    /// How long shutdown waits for open connections (DRAIN_TIMEOUT_SECS).
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            header_read_timeout: Some(Duration::from_secs(30)),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env_or("LISTEN_ADDR", "0.0.0.0:8080");
        let listen_addr = addr.parse().map_err(|e| ConfigError::Parse {
            key: "LISTEN_ADDR".into(),
            value: addr.clone(),
            error: format!("{}", e),
        })?;

        Ok(Self {
            listen_addr,
            header_read_timeout: env_duration("HEADER_READ_TIMEOUT", "30s")?,
            drain_timeout: Duration::from_secs(env_parse("DRAIN_TIMEOUT_SECS", 30u64)?),
        })
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_header_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}
