//! Snapshot feed
//!
//! Turns the raw per-market price cache into the aggregated
//! [`MarketSnapshot`] strategies consume. One snapshot per polling cycle;
//! every strategy in that cycle sees the same snapshot.

use crate::aggregator::PriceAggregator;
use crate::market::{ExchangeQuote, MarketSnapshot, Sentiment};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Source of per-cycle market snapshots
#[async_trait]
pub trait SnapshotFeed: Send {
    /// Produce the snapshot for this cycle; `None` when no data is available yet
    async fn next_snapshot(&mut self) -> Option<MarketSnapshot>;
}

/// Source of a sentiment reading attached to each snapshot
pub trait SentimentSource: Send {
    fn read(&mut self) -> (Sentiment, Decimal);
}

/// Sentiment source returning the same reading every cycle
#[derive(Debug, Clone)]
pub struct FixedSentiment {
    pub sentiment: Sentiment,
    pub confidence: Decimal,
}

impl FixedSentiment {
    pub fn new(sentiment: Sentiment, confidence: Decimal) -> Self {
        Self {
            sentiment,
            confidence,
        }
    }
}

impl Default for FixedSentiment {
    fn default() -> Self {
        Self::new(Sentiment::Neutral, dec!(0.5))
    }
}

impl SentimentSource for FixedSentiment {
    fn read(&mut self) -> (Sentiment, Decimal) {
        (self.sentiment, self.confidence)
    }
}

/// Feed that aggregates the price cache into one snapshot
///
/// Each tracked market in the cache is treated as a price source. The
/// snapshot price and VWAP are the mean across sources with a price, the bid
/// is the best bid across sources and the ask the best ask.
pub struct AggregatorFeed {
    asset: String,
    aggregator: PriceAggregator,
    sentiment: Box<dyn SentimentSource>,
}

impl AggregatorFeed {
    pub fn new(
        asset: impl Into<String>,
        aggregator: PriceAggregator,
        sentiment: Box<dyn SentimentSource>,
    ) -> Self {
        Self {
            asset: asset.into(),
            aggregator,
            sentiment,
        }
    }

    fn build_snapshot(&mut self) -> Option<MarketSnapshot> {
        let markets = self.aggregator.markets();

        let mut quotes = Vec::new();
        for market in markets {
            let Some(entry) = self.aggregator.get(&market) else {
                continue;
            };
            let Some(price) = entry.price() else {
                continue;
            };
            let quote = ExchangeQuote {
                price,
                bid: entry.bid.unwrap_or(price),
                ask: entry.ask.unwrap_or(price),
                depth: entry.bid_size.unwrap_or(Decimal::ZERO)
                    + entry.ask_size.unwrap_or(Decimal::ZERO),
            };
            quotes.push((market, quote));
        }

        if quotes.is_empty() {
            return None;
        }

        let count = Decimal::from(quotes.len());
        let mean: Decimal = quotes.iter().map(|(_, q)| q.price).sum::<Decimal>() / count;
        let best_bid = quotes.iter().map(|(_, q)| q.bid).max()?;
        let best_ask = quotes.iter().map(|(_, q)| q.ask).min()?;
        let mid = (best_bid + best_ask) / Decimal::TWO;

        let spread_bps = if mid > Decimal::ZERO {
            ((best_ask - best_bid) / mid * dec!(10000)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let (sentiment, confidence) = self.sentiment.read();

        let mut snapshot = MarketSnapshot::new(&self.asset, mean)
            .with_vwap(mean)
            .with_sentiment(sentiment, confidence);
        snapshot.bid = best_bid;
        snapshot.ask = best_ask;
        snapshot.mid = mid;
        snapshot.spread_bps = spread_bps;
        for (market, quote) in quotes {
            snapshot.exchange_prices.insert(market, quote);
        }
        Some(snapshot)
    }
}

#[async_trait]
impl SnapshotFeed for AggregatorFeed {
    async fn next_snapshot(&mut self) -> Option<MarketSnapshot> {
        self.build_snapshot()
    }
}
