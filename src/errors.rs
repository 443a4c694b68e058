//! Error types shared across the hub.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all hub failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Task addressed to an agent that is not currently registered.
    UnknownAgent(String),
    /// Send to a registered agent's connection failed or timed out.
    Delivery(String),
    /// Inbound frame is not valid JSON or lacks fields its `type` requires.
    MalformedMessage(String),
    /// Agent connection closed, errored, or went idle past the timeout.
    ConnectionLost(String),
    /// Synchronous request body was rejected before routing.
    BadRequest(String),
    /// Socket bind or serve failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::UnknownAgent(msg) => write!(f, "unknown agent: {msg}"),
            Self::Delivery(msg) => write!(f, "delivery: {msg}"),
            Self::MalformedMessage(msg) => write!(f, "malformed message: {msg}"),
            Self::ConnectionLost(msg) => write!(f, "connection lost: {msg}"),
            Self::BadRequest(msg) => write!(f, "bad request: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}
