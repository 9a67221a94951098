//! News and social sentiment strategy
//!
//! Trend-following by default: mirror the sentiment label when its
//! confidence clears the floor. In contrarian mode the label is inverted,
//! but only when the reading is extreme (above 0.8).

use super::{Direction, Performance, PerformanceTracker, Signal, Strategy, TradeResult};
use crate::market::{MarketSnapshot, Sentiment};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Sentiment parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentConfig {
    /// Minimum sentiment confidence to act on
    #[serde(default = "default_min_sentiment_confidence")]
    pub min_sentiment_confidence: Decimal,

    /// Invert extreme readings instead of following them
    #[serde(default)]
    pub contrarian: bool,
}

fn default_min_sentiment_confidence() -> Decimal {
    dec!(0.7)
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            min_sentiment_confidence: dec!(0.7),
            contrarian: false,
        }
    }
}

const CONFIDENCE_CAP: Decimal = dec!(0.9);
const CONTRARIAN_FLOOR: Decimal = dec!(0.8);

/// Trade on the aggregated sentiment reading
pub struct SentimentStrategy {
    config: SentimentConfig,
    tracker: PerformanceTracker,
}

impl SentimentStrategy {
    pub fn new(config: SentimentConfig) -> Self {
        Self {
            config,
            tracker: PerformanceTracker::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SentimentConfig::default())
    }
}

impl Strategy for SentimentStrategy {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn generate_signal(&mut self, snapshot: &MarketSnapshot) -> Option<Signal> {
        let confidence = snapshot.sentiment_confidence;
        if confidence < self.config.min_sentiment_confidence {
            return None;
        }

        let (label_direction, label) = match snapshot.sentiment {
            Sentiment::Bullish => (Direction::Up, "bullish"),
            Sentiment::Bearish => (Direction::Down, "bearish"),
            Sentiment::Neutral => return None,
        };

        let (direction, signal_confidence, reason) = if self.config.contrarian {
            if confidence <= CONTRARIAN_FLOOR {
                return None;
            }
            (
                label_direction.invert(),
                (confidence * dec!(0.8)).min(CONFIDENCE_CAP),
                format!("Contrarian: extreme {} sentiment ({:.0}%)", label, confidence * dec!(100)),
            )
        } else {
            (
                label_direction,
                confidence.min(CONFIDENCE_CAP),
                format!("{} sentiment ({:.0}%)", label, confidence * dec!(100)),
            )
        };

        Some(
            Signal::new(self.name(), direction, signal_confidence, reason)
                .with_meta("sentiment", label)
                .with_meta("sentiment_confidence", confidence.to_string())
                .with_meta("contrarian", self.config.contrarian),
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

    fn snapshot(sentiment: Sentiment, confidence: Decimal) -> MarketSnapshot {
        MarketSnapshot::new("BTC", dec!(100)).with_sentiment(sentiment, confidence)
    }

    #[test]
    fn test_bullish_follows_up() {
        let mut strategy = SentimentStrategy::with_defaults();
        let signal = strategy
            .generate_signal(&snapshot(Sentiment::Bullish, dec!(0.8)))
            .expect("expected sentiment signal");
        assert_eq!(signal.direction, Direction::Up);
        assert_eq!(signal.confidence, dec!(0.8));
    }

    #[test]
    fn test_bearish_follows_down() {
        let mut strategy = SentimentStrategy::with_defaults();
        let signal = strategy
            .generate_signal(&snapshot(Sentiment::Bearish, dec!(0.75)))
            .expect("expected sentiment signal");
        assert_eq!(signal.direction, Direction::Down);
    }

    #[test]
    fn test_neutral_no_signal() {
        let mut strategy = SentimentStrategy::with_defaults();
        assert!(strategy
            .generate_signal(&snapshot(Sentiment::Neutral, dec!(0.95)))
            .is_none());
    }

    #[test]
    fn test_low_confidence_ignored() {
        let mut strategy = SentimentStrategy::with_defaults();
        assert!(strategy
            .generate_signal(&snapshot(Sentiment::Bullish, dec!(0.5)))
            .is_none());
    }

    #[test]
    fn test_confidence_never_reaches_one() {
        let mut strategy = SentimentStrategy::with_defaults();
        let signal = strategy
            .generate_signal(&snapshot(Sentiment::Bullish, dec!(1.0)))
            .expect("expected sentiment signal");
        assert_eq!(signal.confidence, dec!(0.9));
    }

    #[test]
    fn test_contrarian_inverts_extreme_reading() {
        let mut strategy = SentimentStrategy::new(SentimentConfig {
            min_sentiment_confidence: dec!(0.7),
            contrarian: true,
        });
        let signal = strategy
            .generate_signal(&snapshot(Sentiment::Bullish, dec!(0.9)))
            .expect("expected contrarian signal");
        assert_eq!(signal.direction, Direction::Down);
        assert_eq!(signal.confidence, dec!(0.72));
    }

    #[test]
    fn test_contrarian_skips_moderate_reading() {
        let mut strategy = SentimentStrategy::new(SentimentConfig {
            min_sentiment_confidence: dec!(0.7),
            contrarian: true,
        });
        // Above the floor but not extreme
        assert!(strategy
            .generate_signal(&snapshot(Sentiment::Bullish, dec!(0.75)))
            .is_none());
    }
}
