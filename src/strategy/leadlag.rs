//! Cross-exchange lead/lag strategy
//!
//! Tracks per-exchange prices between consecutive ticks, finds the exchange
//! with the largest single-tick move and follows its direction.

use super::{Direction, Performance, PerformanceTracker, Signal, Strategy, TradeResult};
use crate::market::MarketSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};

/// Lead/lag parameters
#[derive(Debug, Clone, Deserialize)]
pub struct LeadLagConfig {
    /// Ring buffer capacity for per-exchange price maps
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Minimum single-tick move in percent to follow
    #[serde(default = "default_min_move_pct")]
    pub min_move_pct: Decimal,
}

fn default_history_size() -> usize {
    20
}
fn default_min_move_pct() -> Decimal {
    dec!(0.02)
}

impl Default for LeadLagConfig {
    fn default() -> Self {
        Self {
            history_size: 20,
            min_move_pct: dec!(0.02),
        }
    }
}

const CONFIDENCE_CAP: Decimal = dec!(0.75);

/// Follow the exchange that moves first
pub struct LeadLagStrategy {
    config: LeadLagConfig,
    history: VecDeque<HashMap<String, Decimal>>,
    tracker: PerformanceTracker,
}

impl LeadLagStrategy {
    pub fn new(config: LeadLagConfig) -> Self {
        Self {
            config,
            history: VecDeque::new(),
            tracker: PerformanceTracker::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(LeadLagConfig::default())
    }
}

impl Strategy for LeadLagStrategy {
    fn name(&self) -> &str {
        "leadlag"
    }

    fn generate_signal(&mut self, snapshot: &MarketSnapshot) -> Option<Signal> {
        if snapshot.exchange_prices.is_empty() {
            return None;
        }

        let current: HashMap<String, Decimal> = snapshot
            .exchange_prices
            .iter()
            .map(|(name, quote)| (name.clone(), quote.price))
            .collect();

        self.history.push_back(current.clone());
        while self.history.len() > self.config.history_size.max(2) {
            self.history.pop_front();
        }
        if self.history.len() < 2 {
            return None;
        }

        let previous = &self.history[self.history.len() - 2];

        let mut max_change = Decimal::ZERO;
        let mut leader: Option<(String, Direction)> = None;

        for (exchange, current_price) in &current {
            let Some(prev_price) = previous.get(exchange) else {
                continue;
            };
            if prev_price.is_zero() {
                continue;
            }

            let change = (current_price - prev_price) / prev_price * dec!(100);
            if change.abs() > max_change.abs() {
                max_change = change;
                let direction = if change > Decimal::ZERO {
                    Direction::Up
                } else {
                    Direction::Down
                };
                leader = Some((exchange.clone(), direction));
            }
        }

        let (exchange, direction) = leader?;
        if max_change.abs() <= self.config.min_move_pct {
            return None;
        }

        let confidence = (max_change.abs() * dec!(10)).min(CONFIDENCE_CAP);
        Some(
            Signal::new(
                self.name(),
                direction,
                confidence,
                format!("{} leading with {:.3}% move", exchange, max_change),
            )
            .with_meta("leading_exchange", exchange)
            .with_meta("move_pct", max_change.to_string()),
        )
    }

    fn on_trade_complete(&mut self, result: &TradeResult) {
        self.tracker.record(result);
    }

    fn performance(&self) -> Performance {
        self.tracker.summary()
    }

    fn reset(&mut self) {
        self.history.clear();
        self.tracker.reset();
    }
}
