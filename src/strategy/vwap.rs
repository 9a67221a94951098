//! VWAP deviation strategy
//!
//! Mean reversion: bets on price returning to the volume-weighted average.
//! Price above VWAP leans down, price below leans up. Deviations outside the
//! configured band are ignored.

use super::{Direction, Performance, PerformanceTracker, Signal, Strategy, TradeResult};
use crate::market::MarketSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// VWAP reversion parameters
#[derive(Debug, Clone, Deserialize)]
pub struct VwapConfig {
    /// Minimum deviation from VWAP in percent before trading
    #[serde(default = "default_deviation_threshold")]
    pub deviation_threshold: Decimal,

    /// Maximum deviation in percent; larger moves are not faded
    #[serde(default = "default_max_deviation")]
    pub max_deviation: Decimal,
}

fn default_deviation_threshold() -> Decimal {
    dec!(0.1)
}
fn default_max_deviation() -> Decimal {
    dec!(1.0)
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self {
            deviation_threshold: dec!(0.1),
            max_deviation: dec!(1.0),
        }
    }
}

const CONFIDENCE_CAP: Decimal = dec!(0.85);

/// Mean reversion to the volume-weighted average price
pub struct VwapStrategy {
    config: VwapConfig,
    tracker: PerformanceTracker,
}

impl VwapStrategy {
    pub fn new(config: VwapConfig) -> Self {
        Self {
            config,
            tracker: PerformanceTracker::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(VwapConfig::default())
    }
}

impl Strategy for VwapStrategy {
    fn name(&self) -> &str {
        "vwap"
    }

    fn generate_signal(&mut self, snapshot: &MarketSnapshot) -> Option<Signal> {
        let vwap = snapshot.vwap;
        if vwap.is_zero() {
            // No fair-value reference this tick
            return None;
        }

        let deviation = (snapshot.price - vwap) / vwap * dec!(100);
        let magnitude = deviation.abs();

        if magnitude < self.config.deviation_threshold || magnitude > self.config.max_deviation {
            return None;
        }

        let confidence = (magnitude * dec!(5)).min(CONFIDENCE_CAP);
        let (direction, reason) = if deviation > Decimal::ZERO {
            (
                Direction::Down,
                format!("Price {:.3}% above VWAP, expecting reversion", deviation),
            )
        } else {
            (
                Direction::Up,
                format!("Price {:.3}% below VWAP, expecting reversion", magnitude),
            )
        };

        Some(
            Signal::new(self.name(), direction, confidence, reason)
                .with_meta("deviation_pct", deviation.to_string())
                .with_meta("vwap", vwap.to_string())
                .with_meta("current_price", snapshot.price.to_string()),
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
