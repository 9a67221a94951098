//! Strategy contract and the built-in strategy variants
//!
//! A strategy is a pure function from a [`MarketSnapshot`] plus its own
//! bounded internal history to an optional [`Signal`]. Degenerate input
//! (empty history, zero VWAP, missing exchange quotes) degrades to "no
//! signal" rather than a fault; the engine handles everything else.

mod arbitrage;
mod leadlag;
mod momentum;
mod registry;
mod sentiment;
mod vwap;

pub use arbitrage::{ArbitrageConfig, ArbitrageStrategy};
pub use leadlag::{LeadLagConfig, LeadLagStrategy};
pub use momentum::{MomentumConfig, MomentumStrategy};
pub use registry::{RegistryError, StrategyDefinition, StrategyRegistry};
pub use sentiment::{SentimentConfig, SentimentStrategy};
pub use vwap::{VwapConfig, VwapStrategy};

use crate::market::MarketSnapshot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Signal direction: binary up/down, no hold variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// The opposite direction
    pub fn invert(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A directional trading recommendation
///
/// Created per-tick by a strategy and consumed by the engine in the same
/// aggregation; only the engine's signal history retains it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Originating strategy name
    pub strategy: String,
    /// Trade direction
    pub direction: Direction,
    /// Confidence in [0, 1]
    pub confidence: Decimal,
    /// Human-readable explanation
    pub reason: String,
    /// Free-form strategy metadata
    pub metadata: HashMap<String, Value>,
}

impl Signal {
    /// Create a signal with empty metadata
    pub fn new(
        strategy: impl Into<String>,
        direction: Direction,
        confidence: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            direction,
            confidence,
            reason: reason.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Outcome of one (simulated) trade, reported back for strategy feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResult {
    /// Trade identifier
    pub id: Uuid,
    /// Strategy whose signal opened the trade
    pub strategy: String,
    /// Traded direction
    pub direction: Direction,
    /// Entry price
    pub entry_price: Decimal,
    /// Exit price
    pub exit_price: Decimal,
    /// Profit and loss in percent of entry
    pub pnl_pct: Decimal,
    /// Completion timestamp
    pub closed_at: DateTime<Utc>,
}

impl TradeResult {
    /// Whether the trade closed in profit
    pub fn won(&self) -> bool {
        self.pnl_pct > Decimal::ZERO
    }
}

/// Rolling performance counters for one strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    /// Completed trade count
    pub trades: u64,
    /// Winning trade count
    pub wins: u64,
    /// wins / trades, zero when no trades
    pub win_rate: Decimal,
    /// Cumulative P&L in percent
    pub total_pnl: Decimal,
}

/// Per-instance performance accumulator shared by all strategy variants
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    trades: u64,
    wins: u64,
    total_pnl: Decimal,
}

impl PerformanceTracker {
    /// Record a completed trade; tolerates any number of calls
    pub fn record(&mut self, result: &TradeResult) {
        self.trades += 1;
        if result.won() {
            self.wins += 1;
        }
        self.total_pnl += result.pnl_pct;
    }

    /// Current counters
    pub fn summary(&self) -> Performance {
        let win_rate = if self.trades == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.wins) / Decimal::from(self.trades)
        };
        Performance {
            trades: self.trades,
            wins: self.wins,
            win_rate,
            total_pnl: self.total_pnl,
        }
    }

    /// Clear all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Capability set every strategy variant implements
///
/// Instances own their mutable state exclusively; nothing is shared across
/// strategies, so the engine is free to drive them sequentially.
pub trait Strategy: Send {
    /// Strategy identifier, stable across instances
    fn name(&self) -> &str;

    /// Evaluate one tick; `None` means no actionable signal
    fn generate_signal(&mut self, snapshot: &MarketSnapshot) -> Option<Signal>;

    /// Update rolling performance counters from a completed trade
    fn on_trade_complete(&mut self, result: &TradeResult);

    /// Read the current performance counters
    fn performance(&self) -> Performance;

    /// Clear history and counters back to the initial state
    fn reset(&mut self);
}
