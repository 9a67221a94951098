//! Multi-exchange momentum strategy
//!
//! Follows the aggregated price direction: keeps a bounded ring buffer of
//! VWAP observations and signals when the short moving average crosses the
//! long one with enough net change behind it.

use super::{Direction, Performance, PerformanceTracker, Signal, Strategy, TradeResult};
use crate::market::MarketSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::VecDeque;

/// Momentum strategy parameters
#[derive(Debug, Clone, Deserialize)]
pub struct MomentumConfig {
    /// Ring buffer capacity for VWAP history
    #[serde(default = "default_window")]
    pub window: usize,

    /// Samples in the short moving average
    #[serde(default = "default_short_window")]
    pub short_window: usize,

    /// Minimum samples before any signal; the long MA spans the full buffer
    #[serde(default = "default_long_window")]
    pub long_window: usize,

    /// Minimum net change in percent to act on
    #[serde(default = "default_min_change_pct")]
    pub min_change_pct: Decimal,
}

fn default_window() -> usize {
    10
}
fn default_short_window() -> usize {
    2
}
fn default_long_window() -> usize {
    5
}
fn default_min_change_pct() -> Decimal {
    dec!(0.01)
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window: 10,
            short_window: 2,
            long_window: 5,
            min_change_pct: dec!(0.01),
        }
    }
}

/// Confidence cap; momentum never claims certainty
const CONFIDENCE_CAP: Decimal = dec!(0.9);

/// Moving-average crossover over a rolling VWAP history
pub struct MomentumStrategy {
    config: MomentumConfig,
    history: VecDeque<Decimal>,
    tracker: PerformanceTracker,
}

impl MomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        let capacity = config.window.max(1);
        Self {
            config,
            history: VecDeque::with_capacity(capacity),
            tracker: PerformanceTracker::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MomentumConfig::default())
    }

    fn push(&mut self, vwap: Decimal) {
        self.history.push_back(vwap);
        while self.history.len() > self.config.window.max(1) {
            self.history.pop_front();
        }
    }

    fn mean(values: impl Iterator<Item = Decimal>, count: usize) -> Decimal {
        if count == 0 {
            return Decimal::ZERO;
        }
        values.sum::<Decimal>() / Decimal::from(count)
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn generate_signal(&mut self, snapshot: &MarketSnapshot) -> Option<Signal> {
        self.push(snapshot.vwap);

        let len = self.history.len();
        if len < self.config.long_window.max(2) || len < self.config.short_window {
            return None;
        }

        let first = *self.history.front()?;
        let last = *self.history.back()?;
        if first.is_zero() {
            return None;
        }

        let short = self.config.short_window.max(1);
        let sma_short = Self::mean(self.history.iter().rev().take(short).copied(), short);
        let sma_long = Self::mean(self.history.iter().copied(), len);

        let change_pct = (last - first) / first * dec!(100);
        let confidence = (change_pct.abs() * dec!(10)).min(CONFIDENCE_CAP);

        let direction = if sma_short > sma_long * dec!(1.001) && change_pct > self.config.min_change_pct
        {
            Direction::Up
        } else if sma_short < sma_long * dec!(0.999) && change_pct < -self.config.min_change_pct {
            Direction::Down
        } else {
            return None;
        };

        let trend = match direction {
            Direction::Up => "Upward",
            Direction::Down => "Downward",
        };

        Some(
            Signal::new(
                self.name(),
                direction,
                confidence,
                format!("{} momentum: {:.3}% over {} samples", trend, change_pct, len),
            )
            .with_meta("sma_short", sma_short.to_string())
            .with_meta("sma_long", sma_long.to_string())
            .with_meta("price_change_pct", change_pct.to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(vwap: Decimal) -> MarketSnapshot {
        MarketSnapshot::new("BTC", vwap).with_vwap(vwap)
    }

    fn feed(strategy: &mut MomentumStrategy, series: &[Decimal]) -> Option<Signal> {
        let mut last = None;
        for vwap in series {
            last = strategy.generate_signal(&snapshot(*vwap));
        }
        last
    }

    #[test]
    fn test_no_signal_before_long_window() {
        let mut strategy = MomentumStrategy::with_defaults();
        for _ in 0..4 {
            assert!(strategy.generate_signal(&snapshot(dec!(100))).is_none());
        }
    }

    #[test]
    fn test_flat_series_no_signal() {
        let mut strategy = MomentumStrategy::with_defaults();
        let series = vec![dec!(100); 10];
        assert!(feed(&mut strategy, &series).is_none());
    }

    #[test]
    fn test_rising_series_signals_up() {
        let mut strategy = MomentumStrategy::new(MomentumConfig {
            window: 5,
            short_window: 2,
            long_window: 5,
            min_change_pct: dec!(0.01),
        });

        let series = [
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(101),
            dec!(102),
        ];
        let signal = feed(&mut strategy, &series).expect("expected momentum signal");
        assert_eq!(signal.direction, Direction::Up);
        assert!(signal.reason.contains('%'), "reason cites the move: {}", signal.reason);
        assert!(signal.confidence <= dec!(0.9));
    }

    #[test]
    fn test_falling_series_signals_down() {
        let mut strategy = MomentumStrategy::new(MomentumConfig {
            window: 5,
            short_window: 2,
            long_window: 5,
            min_change_pct: dec!(0.01),
        });

        let series = [
            dec!(102),
            dec!(101),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
        ];
        let signal = feed(&mut strategy, &series).expect("expected momentum signal");
        assert_eq!(signal.direction, Direction::Down);
    }

    #[test]
    fn test_zero_prices_no_fault() {
        let mut strategy = MomentumStrategy::with_defaults();
        let series = vec![Decimal::ZERO; 10];
        assert!(feed(&mut strategy, &series).is_none());
    }

    #[test]
    fn test_confidence_saturates_at_cap() {
        let mut strategy = MomentumStrategy::with_defaults();
        // 50% move dwarfs the cap
        let series = [
            dec!(100),
            dec!(100),
            dec!(110),
            dec!(120),
            dec!(140),
            dec!(150),
        ];
        let signal = feed(&mut strategy, &series).expect("expected momentum signal");
        assert_eq!(signal.confidence, dec!(0.9));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut strategy = MomentumStrategy::with_defaults();
        feed(&mut strategy, &vec![dec!(100); 10]);
        strategy.reset();
        // Needs to rebuild its window from scratch
        assert!(strategy.generate_signal(&snapshot(dec!(100))).is_none());
        assert_eq!(strategy.performance().trades, 0);
    }
}
