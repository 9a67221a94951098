//! Strategy registry
//!
//! Maps strategy identifiers to constructors. The registry is an explicit
//! object owned by whoever builds the engine, not process-wide state, so
//! tests and embedders get independent instances.
//!
//! Besides the built-in variants, the registry can materialize declarative
//! strategy definition files dropped into a directory by an external mining
//! collaborator. A definition only selects a precompiled variant and its
//! parameters; no code is loaded at runtime.

use super::Strategy;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use toml::Value;

/// Constructor for one strategy variant
pub type StrategyCtor = fn(&Value) -> Result<Box<dyn Strategy>, RegistryError>;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Requested name has no registered constructor
    #[error("strategy not found: {0}")]
    NotFound(String),

    /// Parameters did not deserialize for the variant
    #[error("invalid parameters for strategy {strategy}: {source}")]
    InvalidParams {
        strategy: String,
        #[source]
        source: toml::de::Error,
    },
}

/// A declarative strategy definition file
///
/// Mirrors what the discovery collaborator persists: which variant to run,
/// where the idea came from, and the parameters it mined.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyDefinition {
    /// Variant to instantiate (must be registered)
    pub strategy: String,
    /// Optional instance name; defaults to the variant name
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Source attribution, e.g. "wallet:0xabc"
    #[serde(default)]
    pub source: Option<String>,
    /// Miner's confidence in the definition
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Variant parameters
    #[serde(default)]
    pub params: Option<Value>,
}

impl StrategyDefinition {
    /// Instance name under which the engine should register this strategy
    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.strategy)
    }
}

/// A strategy materialized from a definition file
pub struct LoadedStrategy {
    pub definition: StrategyDefinition,
    pub strategy: Box<dyn Strategy>,
}

/// Name-to-constructor mapping, in registration order
pub struct StrategyRegistry {
    ctors: Vec<(String, StrategyCtor)>,
}

fn parse_params<C: serde::de::DeserializeOwned>(
    strategy: &str,
    params: Option<&Value>,
) -> Result<C, RegistryError> {
    let value = params
        .cloned()
        .unwrap_or_else(|| Value::Table(toml::map::Map::new()));
    value.try_into().map_err(|source| RegistryError::InvalidParams {
        strategy: strategy.to_string(),
        source,
    })
}

fn make_momentum(params: &Value) -> Result<Box<dyn Strategy>, RegistryError> {
    let config = parse_params("momentum", Some(params))?;
    Ok(Box::new(super::MomentumStrategy::new(config)))
}

fn make_vwap(params: &Value) -> Result<Box<dyn Strategy>, RegistryError> {
    let config = parse_params("vwap", Some(params))?;
    Ok(Box::new(super::VwapStrategy::new(config)))
}

fn make_arbitrage(params: &Value) -> Result<Box<dyn Strategy>, RegistryError> {
    let config = parse_params("arbitrage", Some(params))?;
    Ok(Box::new(super::ArbitrageStrategy::new(config)))
}

fn make_leadlag(params: &Value) -> Result<Box<dyn Strategy>, RegistryError> {
    let config = parse_params("leadlag", Some(params))?;
    Ok(Box::new(super::LeadLagStrategy::new(config)))
}

fn make_sentiment(params: &Value) -> Result<Box<dyn Strategy>, RegistryError> {
    let config = parse_params("sentiment", Some(params))?;
    Ok(Box::new(super::SentimentStrategy::new(config)))
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self { ctors: Vec::new() }
    }

    /// Registry preloaded with the five built-in variants
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("momentum", make_momentum);
        registry.register("vwap", make_vwap);
        registry.register("arbitrage", make_arbitrage);
        registry.register("leadlag", make_leadlag);
        registry.register("sentiment", make_sentiment);
        registry
    }

    /// Register a constructor; re-registering a name replaces it
    pub fn register(&mut self, name: impl Into<String>, ctor: StrategyCtor) {
        let name = name.into();
        if let Some(entry) = self.ctors.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = ctor;
        } else {
            self.ctors.push((name, ctor));
        }
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.ctors.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.ctors.iter().any(|(n, _)| n == name)
    }

    /// Instantiate a strategy by name
    pub fn create(
        &self,
        name: &str,
        params: Option<&Value>,
    ) -> Result<Box<dyn Strategy>, RegistryError> {
        let ctor = self
            .ctors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let empty = Value::Table(toml::map::Map::new());
        ctor(params.unwrap_or(&empty))
    }

    /// Materialize every `*.toml` strategy definition in a directory
    ///
    /// Individual file failures (unreadable, unparsable, unknown variant) are
    /// logged and skipped; the scan itself never fails on one bad file.
    pub fn load_directory(&self, dir: impl AsRef<Path>) -> std::io::Result<Vec<LoadedStrategy>> {
        let mut loaded = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }

            match self.load_definition(&path) {
                Ok(strategy) => {
                    tracing::info!(
                        path = %path.display(),
                        strategy = %strategy.definition.strategy,
                        name = %strategy.definition.instance_name(),
                        "Loaded strategy definition"
                    );
                    loaded.push(strategy);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping strategy definition");
                }
            }
        }

        Ok(loaded)
    }

    fn load_definition(&self, path: &Path) -> anyhow::Result<LoadedStrategy> {
        let content = std::fs::read_to_string(path)?;
        let definition: StrategyDefinition = toml::from_str(&content)?;
        let strategy = self.create(&definition.strategy, definition.params.as_ref())?;
        Ok(LoadedStrategy {
            definition,
            strategy,
        })
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
