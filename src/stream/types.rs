//! Stream protocol types
//!
//! Wire messages are tagged by `type`: `book`, `price_change`, `trade` and
//! `pong`. Each carries a market identifier and type-specific fields, with
//! prices and sizes as decimal strings. Inbound messages are normalized
//! into [`MarketUpdate`] records before reaching subscribers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Channels requested for every market subscription
pub const SUBSCRIPTION_CHANNELS: [&str; 3] = ["book", "price_change", "trade"];

/// Taker side of a quote or trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// Normalized market update delivered to per-market subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum MarketUpdate {
    /// Top-of-book state from a book snapshot
    Book {
        received_at: DateTime<Utc>,
        bid: Option<Decimal>,
        ask: Option<Decimal>,
        bid_size: Option<Decimal>,
        ask_size: Option<Decimal>,
    },
    /// A resting price level changed
    PriceChange {
        received_at: DateTime<Utc>,
        price: Decimal,
        side: Option<Side>,
        size: Option<Decimal>,
    },
    /// A trade executed
    Trade {
        received_at: DateTime<Utc>,
        price: Decimal,
        side: Option<Side>,
        size: Option<Decimal>,
    },
}

/// Outbound subscription control message
#[derive(Debug, Serialize)]
pub struct ControlRequest {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub market: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<&'static str>>,
}

impl ControlRequest {
    /// Subscribe to all data channels for a market
    pub fn subscribe(market: impl Into<String>) -> Self {
        Self {
            msg_type: "subscribe",
            market: market.into(),
            channels: Some(SUBSCRIPTION_CHANNELS.to_vec()),
        }
    }

    /// Unsubscribe a market
    pub fn unsubscribe(market: impl Into<String>) -> Self {
        Self {
            msg_type: "unsubscribe",
            market: market.into(),
            channels: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireLevel {
    price: String,
    size: String,
}

#[derive(Debug, Deserialize)]
struct WireBook {
    market: String,
    #[serde(default)]
    bids: Vec<WireLevel>,
    #[serde(default)]
    asks: Vec<WireLevel>,
}

#[derive(Debug, Deserialize)]
struct WireQuote {
    market: String,
    price: String,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Book(WireBook),
    PriceChange(WireQuote),
    Trade(WireQuote),
    Pong {},
}

fn parse_side(side: Option<&str>) -> Option<Side> {
    match side {
        Some("BUY") => Some(Side::Buy),
        Some("SELL") => Some(Side::Sell),
        _ => None,
    }
}

fn parse_decimal(value: Option<&str>) -> Option<Decimal> {
    value.and_then(|v| Decimal::from_str(v).ok())
}

/// Classify one inbound text frame
///
/// Returns the market and its normalized update. Heartbeat responses,
/// unrecognized type tags and malformed payloads all yield `None`; the
/// receive loop drops them and carries on.
pub fn classify_message(text: &str) -> Option<(String, MarketUpdate)> {
    let message: WireMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(
                error = %e,
                preview = %text.chars().take(100).collect::<String>(),
                "Dropping unparsable stream message"
            );
            return None;
        }
    };

    let received_at = Utc::now();
    match message {
        WireMessage::Book(book) => {
            let best_bid = book.bids.first();
            let best_ask = book.asks.first();
            let update = MarketUpdate::Book {
                received_at,
                bid: parse_decimal(best_bid.map(|l| l.price.as_str())),
                ask: parse_decimal(best_ask.map(|l| l.price.as_str())),
                bid_size: parse_decimal(best_bid.map(|l| l.size.as_str())),
                ask_size: parse_decimal(best_ask.map(|l| l.size.as_str())),
            };
            Some((book.market, update))
        }
        WireMessage::PriceChange(quote) => {
            let price = parse_decimal(Some(quote.price.as_str()))?;
            let update = MarketUpdate::PriceChange {
                received_at,
                price,
                side: parse_side(quote.side.as_deref()),
                size: parse_decimal(quote.size.as_deref()),
            };
            Some((quote.market, update))
        }
        WireMessage::Trade(quote) => {
            let price = parse_decimal(Some(quote.price.as_str()))?;
            let update = MarketUpdate::Trade {
                received_at,
                price,
                side: parse_side(quote.side.as_deref()),
                size: parse_decimal(quote.size.as_deref()),
            };
            Some((quote.market, update))
        }
        WireMessage::Pong {} => None,
    }
}
