#![forbid(unsafe_code)]

//! Coordination hub for long-running worker agents.

pub mod config;
pub mod errors;
pub mod hub;
pub mod models;
pub mod transport;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
