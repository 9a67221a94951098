//! Strategy engine
//!
//! Owns the set of active strategy instances, drives them over each
//! snapshot, aggregates their signals and selects the best one under the
//! engine-wide confidence floor. Strategy faults are isolated per tick: a
//! panicking strategy is skipped, logged, and retried on the next snapshot.

use crate::market::MarketSnapshot;
use crate::strategy::{
    Performance, RegistryError, Signal, Strategy, StrategyRegistry, TradeResult,
};
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use toml::Value;

/// Engine-level confidence floor, applied on top of whatever gating each
/// strategy does internally
pub const CONFIDENCE_FLOOR: Decimal = dec!(0.6);

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Requested strategy is not in the registry
    #[error("strategy not found: {0}")]
    StrategyNotFound(String),

    /// Registry failed to build the strategy
    #[error(transparent)]
    Registry(RegistryError),
}

struct ActiveStrategy {
    name: String,
    inner: Box<dyn Strategy>,
}

/// Drives registered strategies and aggregates their signals
///
/// Registration order is preserved and doubles as the tie-break policy when
/// two signals carry equal confidence.
pub struct StrategyEngine {
    registry: StrategyRegistry,
    strategies: Vec<ActiveStrategy>,
    signal_history: Vec<Signal>,
}

impl StrategyEngine {
    /// Engine with the given registry and no active strategies
    pub fn new(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            strategies: Vec::new(),
            signal_history: Vec::new(),
        }
    }

    /// Engine over the built-in registry
    pub fn with_builtins() -> Self {
        Self::new(StrategyRegistry::with_builtins())
    }

    /// Instantiate a registered strategy and activate it under `name`
    pub fn add_strategy(&mut self, name: &str, params: Option<&Value>) -> Result<(), EngineError> {
        let strategy = self.registry.create(name, params).map_err(|e| match e {
            RegistryError::NotFound(n) => EngineError::StrategyNotFound(n),
            other => EngineError::Registry(other),
        })?;
        self.add_strategy_instance(name, strategy);
        Ok(())
    }

    /// Activate an already-built strategy instance (used for strategies
    /// materialized from definition files)
    ///
    /// Re-adding a name replaces the previous instance in place, keeping its
    /// original registration position.
    pub fn add_strategy_instance(&mut self, name: impl Into<String>, strategy: Box<dyn Strategy>) {
        let name = name.into();
        if let Some(active) = self.strategies.iter_mut().find(|s| s.name == name) {
            active.inner = strategy;
        } else {
            tracing::info!(strategy = %name, "Activated strategy");
            self.strategies.push(ActiveStrategy {
                name,
                inner: strategy,
            });
        }
    }

    /// Deactivate a strategy; unknown names are a no-op
    pub fn remove_strategy(&mut self, name: &str) {
        self.strategies.retain(|s| s.name != name);
    }

    /// Names of active strategies in registration order
    pub fn active_strategies(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name.as_str()).collect()
    }

    /// The registry this engine instantiates from
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Evaluate every active strategy against the snapshot
    ///
    /// A strategy that panics is excluded from this tick's results and stays
    /// registered for the next one. Results are appended to the engine's
    /// signal history.
    pub fn run_all(&mut self, snapshot: &MarketSnapshot) -> Vec<Signal> {
        let mut signals = Vec::new();

        for active in &mut self.strategies {
            let outcome =
                std::panic::catch_unwind(AssertUnwindSafe(|| active.inner.generate_signal(snapshot)));
            match outcome {
                Ok(Some(signal)) => {
                    tracing::debug!(
                        strategy = %active.name,
                        direction = %signal.direction,
                        confidence = %signal.confidence,
                        "Strategy produced signal"
                    );
                    signals.push(signal);
                }
                Ok(None) => {}
                Err(_) => {
                    tracing::error!(
                        strategy = %active.name,
                        "Strategy panicked during evaluation, skipped this tick"
                    );
                }
            }
        }

        counter!("marketpulse_signals_total").increment(signals.len() as u64);
        self.signal_history.extend(signals.iter().cloned());
        signals
    }

    /// Highest-confidence signal at or above [`CONFIDENCE_FLOOR`]
    ///
    /// Ties resolve to the strategy registered first.
    pub fn best_signal(&mut self, snapshot: &MarketSnapshot) -> Option<Signal> {
        let mut best: Option<Signal> = None;

        for signal in self.run_all(snapshot) {
            if signal.confidence < CONFIDENCE_FLOOR {
                continue;
            }
            match &best {
                Some(current) if signal.confidence <= current.confidence => {}
                _ => best = Some(signal),
            }
        }

        best
    }

    /// Route a completed trade back to the strategy that signalled it
    ///
    /// Unknown strategy names and panicking performance updates are logged,
    /// never propagated.
    pub fn record_trade(&mut self, result: &TradeResult) {
        let Some(active) = self.strategies.iter_mut().find(|s| s.name == result.strategy) else {
            tracing::warn!(strategy = %result.strategy, "Trade result for unknown strategy");
            return;
        };

        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(|| active.inner.on_trade_complete(result)));
        if outcome.is_err() {
            tracing::error!(strategy = %active.name, "Strategy panicked in trade callback");
        }
        counter!("marketpulse_trades_recorded_total").increment(1);
    }

    /// Performance counters for every active strategy
    pub fn performance_report(&self) -> BTreeMap<String, Performance> {
        self.strategies
            .iter()
            .map(|s| (s.name.clone(), s.inner.performance()))
            .collect()
    }

    /// All signals produced since construction or the last reset
    pub fn signal_history(&self) -> &[Signal] {
        &self.signal_history
    }

    /// Reset every strategy and clear the signal history
    pub fn reset_all(&mut self) {
        for active in &mut self.strategies {
            active.inner.reset();
        }
        self.signal_history.clear();
    }
}
