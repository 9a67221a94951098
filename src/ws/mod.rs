//! Generic WebSocket transport with automatic reconnection
//!
//! Connection lifecycle and keepalive only; message semantics live in the
//! `stream` module.

mod backoff;
mod client;
mod types;

pub use backoff::Backoff;
pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage};
