//! Market data stream: protocol types and the subscribing client

mod client;
mod types;

pub use client::{PriceStreamClient, StreamConfig, UpdateHandler, DEFAULT_STREAM_URL};
pub use types::{classify_message, ControlRequest, MarketUpdate, Side, SUBSCRIPTION_CHANNELS};
