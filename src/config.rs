//! Global configuration parsing and validation.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Per-session delivery and liveness settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Capacity of each session's bounded outbound queue.
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
    /// Maximum time a single send may wait on a full queue.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Interval between hub-initiated pings.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Silence after which a connection is considered half-open.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_queue_capacity: default_send_queue_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl SessionConfig {
    /// Per-recipient send timeout.
    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Ping cadence for the writer task.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Read-side idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

fn default_send_queue_capacity() -> usize {
    256
}

fn default_send_timeout_ms() -> u64 {
    2000
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    90
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Bind address for the HTTP and WebSocket listener.
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP port; 0 lets the OS pick one.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Origins allowed by the CORS layer; `"*"` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
    /// Session delivery and liveness settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            cors_allowed_origins: default_cors_origins(),
            session: SessionConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|err| AppError::Config(format!("host '{}' invalid: {err}", self.host)))?;
        Ok(SocketAddr::new(ip, self.http_port))
    }

    fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        let session = &self.session;
        if session.send_queue_capacity == 0 {
            return Err(AppError::Config(
                "send_queue_capacity must be greater than zero".into(),
            ));
        }
        if session.send_timeout_ms == 0 {
            return Err(AppError::Config(
                "send_timeout_ms must be greater than zero".into(),
            ));
        }
        if session.heartbeat_interval_seconds == 0 {
            return Err(AppError::Config(
                "heartbeat_interval_seconds must be greater than zero".into(),
            ));
        }
        if session.idle_timeout_seconds <= session.heartbeat_interval_seconds {
            return Err(AppError::Config(
                "idle_timeout_seconds must exceed heartbeat_interval_seconds".into(),
            ));
        }

        Ok(())
    }
}
