//! Network surfaces: agent WebSocket endpoint and HTTP API.

pub mod http;
pub mod server;
pub mod ws;
