//! Unified types used across all venue adapters

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::{ArbError, Result};

/// Venue identifier as written in configuration (`binance`, `coinbase`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VenueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VenueId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Split a `BASE/QUOTE` symbol into its two assets
pub fn split_symbol(symbol: &str) -> Result<(&str, &str)> {
    match symbol.split_once('/') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() && !quote.contains('/') => {
            Ok((base, quote))
        }
        _ => Err(ArbError::InvalidSymbol(symbol.to_string())),
    }
}

/// Best bid/ask as reported by a venue, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerQuote {
    pub symbol: String,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
}

/// Validated best bid/ask for a symbol on a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub venue: VenueId,
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl Ticker {
    /// Build a ticker from a raw quote, rejecting missing or non-positive sides
    pub fn from_quote(venue: VenueId, quote: TickerQuote) -> Result<Self> {
        let incomplete = |detail: &str| ArbError::IncompleteMarketData {
            venue: venue.to_string(),
            symbol: quote.symbol.clone(),
            detail: detail.to_string(),
        };

        let bid = quote
            .bid
            .filter(|b| *b > Decimal::ZERO)
            .ok_or_else(|| incomplete("missing bid"))?;
        let ask = quote
            .ask
            .filter(|a| *a > Decimal::ZERO)
            .ok_or_else(|| incomplete("missing ask"))?;

        Ok(Self {
            venue,
            symbol: quote.symbol,
            bid,
            ask,
            observed_at: quote.observed_at,
        })
    }
}

/// Balance of one asset held on a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub venue: VenueId,
    pub asset: String,
    /// Available for trading
    pub free: Decimal,
    /// Free plus held in open orders
    pub total: Decimal,
}

/// Acknowledgement of a submitted market order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub venue: VenueId,
    pub symbol: String,
    pub side: Side,
    pub amount: Decimal,
}

/// Outcome of a paired buy/sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Both legs filled
    Completed,
    /// Buy leg filled, sell leg failed; the position is left open
    PartialFailure,
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStatus::Completed => write!(f, "completed"),
            TradeStatus::PartialFailure => write!(f, "partial_failure"),
        }
    }
}

/// Notification urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Critical,
}

/// Human-readable message handed to a notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub body: String,
}
