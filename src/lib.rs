//! marketpulse: signal generation and paper trading for speculative up/down markets
//!
//! This library provides the core components for:
//! - Aggregated market snapshots across price sources
//! - Pluggable trading strategies with a common contract
//! - A registry for instantiating strategies from names or TOML definitions
//! - A strategy engine with confidence-gated best-signal selection
//! - A reconnecting WebSocket price stream with subscription replay
//! - A per-market price cache feeding the snapshot builder
//! - Simulated paper-trade outcomes fed back into strategy performance

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod engine;
pub mod feed;
pub mod market;
pub mod sim;
pub mod strategy;
pub mod stream;
pub mod telemetry;
pub mod ws;
