//! Cross-exchange arbitrage strategy
//!
//! Measures the spread between the most and least expensive exchange as a
//! percentage of the mean and bets on convergence. The overpriced side is
//! checked first, so a symmetric dislocation resolves to a down signal.

use super::{Direction, Performance, PerformanceTracker, Signal, Strategy, TradeResult};
use crate::market::MarketSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Arbitrage parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrageConfig {
    /// Minimum cross-exchange spread in percent of the mean
    #[serde(default = "default_min_arb_pct")]
    pub min_arb_pct: Decimal,

    /// Maximum spread in percent; larger gaps are treated as bad data
    #[serde(default = "default_max_arb_pct")]
    pub max_arb_pct: Decimal,
}

fn default_min_arb_pct() -> Decimal {
    dec!(0.1)
}
fn default_max_arb_pct() -> Decimal {
    dec!(1.0)
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_arb_pct: dec!(0.1),
            max_arb_pct: dec!(1.0),
        }
    }
}

const CONFIDENCE_CAP: Decimal = dec!(0.8);

/// Convergence bet on cross-exchange price dislocations
pub struct ArbitrageStrategy {
    config: ArbitrageConfig,
    tracker: PerformanceTracker,
}

impl ArbitrageStrategy {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self {
            config,
            tracker: PerformanceTracker::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ArbitrageConfig::default())
    }
}

impl Strategy for ArbitrageStrategy {
    fn name(&self) -> &str {
        "arbitrage"
    }

    fn generate_signal(&mut self, snapshot: &MarketSnapshot) -> Option<Signal> {
        if snapshot.exchange_prices.len() < 2 {
            return None;
        }

        let (max_exchange, max_price) = snapshot
            .exchange_prices
            .iter()
            .max_by(|a, b| a.1.price.cmp(&b.1.price))
            .map(|(name, quote)| (name.clone(), quote.price))?;
        let (min_exchange, min_price) = snapshot
            .exchange_prices
            .iter()
            .min_by(|a, b| a.1.price.cmp(&b.1.price))
            .map(|(name, quote)| (name.clone(), quote.price))?;

        let count = Decimal::from(snapshot.exchange_prices.len());
        let mean_price = snapshot
            .exchange_prices
            .values()
            .map(|q| q.price)
            .sum::<Decimal>()
            / count;
        if mean_price.is_zero() {
            return None;
        }

        let arb_pct = (max_price - min_price) / mean_price * dec!(100);
        if arb_pct < self.config.min_arb_pct || arb_pct > self.config.max_arb_pct {
            return None;
        }

        let confidence = (arb_pct * dec!(2)).min(CONFIDENCE_CAP);

        let (direction, reason) = if max_price > mean_price * dec!(1.001) {
            (
                Direction::Down,
                format!("{} overpriced by {:.3}% vs others", max_exchange, arb_pct),
            )
        } else if min_price < mean_price * dec!(0.999) {
            (
                Direction::Up,
                format!("{} underpriced by {:.3}% vs others", min_exchange, arb_pct),
            )
        } else {
            return None;
        };

        Some(
            Signal::new(self.name(), direction, confidence, reason)
                .with_meta("arbitrage_pct", arb_pct.to_string())
                .with_meta("max_exchange", max_exchange)
                .with_meta("min_exchange", min_exchange)
                .with_meta("mean_price", mean_price.to_string()),
        )
    }

    fn on_trade_complete(&mut self, result: &TradeResult) {
        self.tracker.record(result);
    }

    fn performance(&self) -> Performance {
        self.tracker.summary()
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::ExchangeQuote;

    fn snapshot(prices: &[(&str, Decimal)]) -> MarketSnapshot {
        let mut snap = MarketSnapshot::new("BTC", dec!(100));
        for (name, price) in prices {
            snap = snap.with_exchange(*name, ExchangeQuote::from_price(*price));
        }
        snap
    }

    #[test]
    fn test_single_exchange_no_signal() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        let snap = snapshot(&[("binance", dec!(100))]);
        assert!(strategy.generate_signal(&snap).is_none());
    }

    #[test]
    fn test_half_percent_gap_signals() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        // Gap of 0.5 on mean 100.25 -> ~0.4988%
        let snap = snapshot(&[("binance", dec!(100.0)), ("coinbase", dec!(100.5))]);
        let signal = strategy
            .generate_signal(&snap)
            .expect("expected arbitrage signal");

        // Overpriced exchange checked first
        assert_eq!(signal.direction, Direction::Down);
        assert!(signal.reason.contains("coinbase"));
        assert_eq!(
            signal.metadata["min_exchange"],
            serde_json::Value::from("binance")
        );
    }

    #[test]
    fn test_tiny_gap_below_minimum() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        // ~0.05% spread, below the 0.1% floor
        let snap = snapshot(&[("binance", dec!(100.0)), ("coinbase", dec!(100.05))]);
        assert!(strategy.generate_signal(&snap).is_none());
    }

    #[test]
    fn test_huge_gap_above_maximum() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        // 5% spread, beyond the 1% ceiling
        let snap = snapshot(&[("binance", dec!(100)), ("coinbase", dec!(105))]);
        assert!(strategy.generate_signal(&snap).is_none());
    }

    #[test]
    fn test_zero_prices_no_fault() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        let snap = snapshot(&[("a", Decimal::ZERO), ("b", Decimal::ZERO)]);
        assert!(strategy.generate_signal(&snap).is_none());
    }

    #[test]
    fn test_confidence_scales_with_gap() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        let narrow = strategy
            .generate_signal(&snapshot(&[("a", dec!(100)), ("b", dec!(100.25))]))
            .expect("narrow gap");
        let wide = strategy
            .generate_signal(&snapshot(&[("a", dec!(100)), ("b", dec!(100.45))]))
            .expect("wide gap");

        assert!(narrow.confidence < wide.confidence);
        assert!(wide.confidence <= dec!(0.8));
    }

    #[test]
    fn test_gap_in_band_but_no_outlier_no_signal() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        // 0.15% spread clears the band, but with two venues each sits only
        // ~0.075% from the mean, under the 0.1% outlier threshold
        let snap = snapshot(&[("binance", dec!(100)), ("coinbase", dec!(100.15))]);
        assert!(strategy.generate_signal(&snap).is_none());
    }

    #[test]
    fn test_three_exchanges_picks_outliers() {
        let mut strategy = ArbitrageStrategy::with_defaults();
        let snap = snapshot(&[
            ("binance", dec!(100.0)),
            ("coinbase", dec!(100.1)),
            ("kraken", dec!(100.4)),
        ]);
        let signal = strategy
            .generate_signal(&snap)
            .expect("expected arbitrage signal");
        assert_eq!(
            signal.metadata["max_exchange"],
            serde_json::Value::from("kraken")
        );
    }
}
