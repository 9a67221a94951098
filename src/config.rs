//! Configuration types for marketpulse

use serde::Deserialize;
use std::path::PathBuf;
use toml::value::Table;

/// Root configuration structure
///
/// Every section has defaults, so a missing or partial config file still
/// yields a runnable setup.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Market data feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Asset label attached to every snapshot
    #[serde(default = "default_asset")]
    pub asset: String,

    /// Market identifiers to subscribe to on the stream
    #[serde(default)]
    pub markets: Vec<String>,

    /// WebSocket endpoint for the price stream
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Seconds between snapshot evaluations
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_asset() -> String {
    "BTC".to_string()
}
fn default_stream_url() -> String {
    crate::stream::DEFAULT_STREAM_URL.to_string()
}
fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            asset: default_asset(),
            markets: Vec::new(),
            stream_url: default_stream_url(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Strategy engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Registered strategy names to activate, in evaluation order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,

    /// Per-strategy parameter tables, keyed by strategy name
    #[serde(default)]
    pub params: Table,

    /// Directory of TOML strategy definition files to load in addition to
    /// the `strategies` list
    #[serde(default)]
    pub definitions_dir: Option<PathBuf>,

    /// Evaluation cycles between performance report log lines
    #[serde(default = "default_report_interval")]
    pub report_interval_cycles: u64,
}

fn default_strategies() -> Vec<String> {
    ["momentum", "vwap", "arbitrage", "leadlag", "sentiment"]
        .map(String::from)
        .to_vec()
}
fn default_report_interval() -> u64 {
    12
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            params: Table::new(),
            definitions_dir: None,
            report_interval_cycles: default_report_interval(),
        }
    }
}

/// Trade simulation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Expected move in the signalled direction, as a fraction of price
    #[serde(default = "default_drift")]
    pub drift: f64,

    /// Standard deviation of the Gaussian noise term
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_drift() -> f64 {
    crate::sim::GaussianSimulator::DEFAULT_DRIFT
}
fn default_noise_std() -> f64 {
    crate::sim::GaussianSimulator::DEFAULT_NOISE_STD
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            drift: default_drift(),
            noise_std: default_noise_std(),
            seed: None,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.feed.asset, "BTC");
        assert_eq!(config.feed.poll_interval_secs, 5);
        assert_eq!(config.engine.strategies.len(), 5);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.sim.seed.is_none());
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [feed]
            asset = "ETH"
            markets = ["mkt-a", "mkt-b"]
            poll_interval_secs = 2

            [engine]
            strategies = ["momentum", "vwap"]
            report_interval_cycles = 5

            [engine.params.momentum]
            window = 20
            min_change_pct = 0.05

            [sim]
            drift = 0.01
            noise_std = 0.002
            seed = 42

            [telemetry]
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.feed.asset, "ETH");
        assert_eq!(config.feed.markets, vec!["mkt-a", "mkt-b"]);
        assert_eq!(config.engine.strategies, vec!["momentum", "vwap"]);
        assert_eq!(config.engine.report_interval_cycles, 5);
        assert!(config.engine.params.contains_key("momentum"));
        assert_eq!(config.sim.seed, Some(42));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_unknown_strategy_name_is_config_not_parse_error() {
        // Names are validated against the registry at activation, not here
        let config: Config = toml::from_str("[engine]\nstrategies = [\"quantum\"]").unwrap();
        assert_eq!(config.engine.strategies, vec!["quantum"]);
    }

    #[test]
    fn test_config_load_nonexistent() {
        assert!(Config::load("/nonexistent/path/config.toml").is_err());
    }
}
