//! In-memory cache of the latest prices per market
//!
//! The aggregator is the bridge between the stream and everything that wants
//! a current price without holding a subscription itself. Updates merge into
//! the cached entry field by field, so a trade print never clobbers cached
//! book state and vice versa.

use crate::stream::{MarketUpdate, PriceStreamClient, UpdateHandler};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Latest known state for one market
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceEntry {
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub bid_size: Option<Decimal>,
    pub ask_size: Option<Decimal>,
    pub last_trade: Option<Decimal>,
    pub last_update: Option<DateTime<Utc>>,
}

impl PriceEntry {
    /// Merge one update into this entry
    ///
    /// Book updates replace the four book fields. Price changes and trades
    /// only touch `last_trade`. `last_update` always advances.
    pub fn apply(&mut self, update: &MarketUpdate) {
        match update {
            MarketUpdate::Book {
                received_at,
                bid,
                ask,
                bid_size,
                ask_size,
            } => {
                self.bid = *bid;
                self.ask = *ask;
                self.bid_size = *bid_size;
                self.ask_size = *ask_size;
                self.last_update = Some(*received_at);
            }
            MarketUpdate::PriceChange {
                received_at, price, ..
            }
            | MarketUpdate::Trade {
                received_at, price, ..
            } => {
                self.last_trade = Some(*price);
                self.last_update = Some(*received_at);
            }
        }
    }

    /// Midpoint of the cached book, when both sides are present
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Best single price: midpoint if the book is two-sided, else the last
    /// trade, else whichever book side exists.
    pub fn price(&self) -> Option<Decimal> {
        self.mid()
            .or(self.last_trade)
            .or(self.bid)
            .or(self.ask)
    }
}

/// Shared cache of per-market price state
#[derive(Clone, Default)]
pub struct PriceAggregator {
    entries: Arc<RwLock<HashMap<String, PriceEntry>>>,
}

impl PriceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an update for a market, creating the entry if new
    pub fn record(&self, market: &str, update: &MarketUpdate) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(market.to_string()).or_default().apply(update);
    }

    /// Pre-register a market so it shows up in listings before data arrives
    pub fn track(&self, market: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(market.to_string()).or_default();
    }

    /// Snapshot of one market's entry
    pub fn get(&self, market: &str) -> Option<PriceEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(market)
            .cloned()
    }

    /// Best available price for a market
    pub fn get_price(&self, market: &str) -> Option<Decimal> {
        self.get(market).and_then(|entry| entry.price())
    }

    /// Best bid and ask for a market
    pub fn get_best_bid_ask(&self, market: &str) -> Option<(Option<Decimal>, Option<Decimal>)> {
        self.get(market).map(|entry| (entry.bid, entry.ask))
    }

    /// Bid/ask spread, when both sides are cached
    pub fn get_spread(&self, market: &str) -> Option<Decimal> {
        let entry = self.get(market)?;
        match (entry.bid, entry.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// All tracked market identifiers
    pub fn markets(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Stream handler that feeds this cache
    pub fn handler(&self) -> UpdateHandler {
        let aggregator = self.clone();
        Box::new(move |market, update| aggregator.record(market, update))
    }

    /// Track a market and subscribe it on the stream, feeding this cache
    pub async fn track_on(&self, stream: &PriceStreamClient, market: &str) {
        self.track(market);
        let cache = self.clone();
        stream
            .subscribe(market, move |m, update| cache.record(m, update))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book(bid: Decimal, ask: Decimal) -> MarketUpdate {
        MarketUpdate::Book {
            received_at: Utc::now(),
            bid: Some(bid),
            ask: Some(ask),
            bid_size: Some(dec!(100)),
            ask_size: Some(dec!(50)),
        }
    }

    fn trade(price: Decimal) -> MarketUpdate {
        MarketUpdate::Trade {
            received_at: Utc::now(),
            price,
            side: None,
            size: None,
        }
    }

    #[test]
    fn test_trade_preserves_book_fields() {
        let aggregator = PriceAggregator::new();
        aggregator.record("mkt", &book(dec!(0.55), dec!(0.57)));
        aggregator.record("mkt", &trade(dec!(0.56)));

        let entry = aggregator.get("mkt").unwrap();
        assert_eq!(entry.bid, Some(dec!(0.55)));
        assert_eq!(entry.ask, Some(dec!(0.57)));
        assert_eq!(entry.last_trade, Some(dec!(0.56)));
    }

    #[test]
    fn test_book_does_not_touch_last_trade() {
        let aggregator = PriceAggregator::new();
        aggregator.record("mkt", &trade(dec!(0.50)));
        aggregator.record("mkt", &book(dec!(0.48), dec!(0.52)));

        let entry = aggregator.get("mkt").unwrap();
        assert_eq!(entry.last_trade, Some(dec!(0.50)));
        assert_eq!(entry.bid, Some(dec!(0.48)));
    }

    #[test]
    fn test_price_prefers_mid_then_last_trade() {
        let aggregator = PriceAggregator::new();
        aggregator.record("mkt", &trade(dec!(0.40)));
        assert_eq!(aggregator.get_price("mkt"), Some(dec!(0.40)));

        aggregator.record("mkt", &book(dec!(0.50), dec!(0.60)));
        assert_eq!(aggregator.get_price("mkt"), Some(dec!(0.55)));
    }

    #[test]
    fn test_spread_requires_both_sides() {
        let aggregator = PriceAggregator::new();
        aggregator.record("mkt", &trade(dec!(0.40)));
        assert_eq!(aggregator.get_spread("mkt"), None);

        aggregator.record("mkt", &book(dec!(0.50), dec!(0.58)));
        assert_eq!(aggregator.get_spread("mkt"), Some(dec!(0.08)));
    }

    #[test]
    fn test_unknown_market() {
        let aggregator = PriceAggregator::new();
        assert_eq!(aggregator.get_price("missing"), None);
        assert_eq!(aggregator.get_best_bid_ask("missing"), None);
    }

    #[test]
    fn test_track_registers_empty_entry() {
        let aggregator = PriceAggregator::new();
        aggregator.track("mkt");
        assert_eq!(aggregator.markets(), vec!["mkt".to_string()]);
        assert_eq!(aggregator.get_price("mkt"), None);
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let aggregator = PriceAggregator::new();
        aggregator.record("mkt", &trade(dec!(0.40)));

        let poisoner = aggregator.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the cache lock");
        })
        .join();

        // Entries are small value merges, so reads and writes keep working
        assert_eq!(aggregator.get_price("mkt"), Some(dec!(0.40)));
        aggregator.record("mkt", &trade(dec!(0.41)));
        assert_eq!(aggregator.get_price("mkt"), Some(dec!(0.41)));
    }

    #[tokio::test]
    async fn test_track_on_registers_subscription() {
        let aggregator = PriceAggregator::new();
        let stream = PriceStreamClient::new(crate::stream::StreamConfig::default());
        aggregator.track_on(&stream, "mkt").await;

        assert_eq!(stream.subscribed_markets().await, vec!["mkt".to_string()]);
        assert_eq!(aggregator.markets(), vec!["mkt".to_string()]);
    }

    #[test]
    fn test_handler_feeds_cache() {
        let aggregator = PriceAggregator::new();
        let handler = aggregator.handler();
        handler("mkt", &trade(dec!(0.33)));
        assert_eq!(aggregator.get_price("mkt"), Some(dec!(0.33)));
    }
}
