//! Market data model
//!
//! One `MarketSnapshot` per polling cycle: an immutable aggregated view of
//! price and sentiment state across exchanges, consumed read-only by every
//! strategy in the same tick.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-exchange price quad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeQuote {
    /// Last traded or mid price on this exchange
    pub price: Decimal,
    /// Best bid
    pub bid: Decimal,
    /// Best ask
    pub ask: Decimal,
    /// Resting depth at the top of book
    pub depth: Decimal,
}

impl ExchangeQuote {
    /// Quote with no book depth information
    pub fn from_price(price: Decimal) -> Self {
        Self {
            price,
            bid: price,
            ask: price,
            depth: Decimal::ZERO,
        }
    }
}

/// Market sentiment reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Aggregated market state for one tick
///
/// Invariants: `bid <= mid <= ask` when all three are populated, and
/// `sentiment_confidence` lies in `[0, 1]`. Built fresh each cycle by the
/// feed collaborator; never mutated by strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Snapshot timestamp
    pub timestamp: DateTime<Utc>,
    /// Asset identifier (e.g. "BTC")
    pub asset: String,
    /// Current aggregated price
    pub price: Decimal,
    /// Best bid across sources
    pub bid: Decimal,
    /// Best ask across sources
    pub ask: Decimal,
    /// Mid price
    pub mid: Decimal,
    /// Volume-weighted average price across sources
    pub vwap: Decimal,
    /// Spread in basis points
    pub spread_bps: Decimal,
    /// 24h traded volume
    pub volume_24h: Decimal,
    /// Per-exchange quotes
    pub exchange_prices: HashMap<String, ExchangeQuote>,
    /// Sentiment label
    pub sentiment: Sentiment,
    /// Sentiment confidence in [0, 1]
    pub sentiment_confidence: Decimal,
}

impl MarketSnapshot {
    /// Create a snapshot with every price field set to `price` and neutral
    /// sentiment; callers overwrite the fields they know better.
    pub fn new(asset: impl Into<String>, price: Decimal) -> Self {
        Self {
            timestamp: Utc::now(),
            asset: asset.into(),
            price,
            bid: price,
            ask: price,
            mid: price,
            vwap: price,
            spread_bps: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            exchange_prices: HashMap::new(),
            sentiment: Sentiment::Neutral,
            sentiment_confidence: Decimal::new(5, 1),
        }
    }

    /// Set the VWAP field
    pub fn with_vwap(mut self, vwap: Decimal) -> Self {
        self.vwap = vwap;
        self
    }

    /// Add a per-exchange quote
    pub fn with_exchange(mut self, name: impl Into<String>, quote: ExchangeQuote) -> Self {
        self.exchange_prices.insert(name.into(), quote);
        self
    }

    /// Set sentiment label and confidence
    pub fn with_sentiment(mut self, sentiment: Sentiment, confidence: Decimal) -> Self {
        self.sentiment = sentiment;
        self.sentiment_confidence = confidence;
        self
    }
}
