//! Cross-venue arbitrage engine
//!
//! Polls best bid/ask for a set of symbols on several exchanges, detects
//! spreads that stay profitable after taker fees, sizes trades against
//! venue balances and places the buy/sell pair.

pub mod common;
pub mod config;
pub mod engine;
pub mod exchanges;
pub mod notify;
pub mod telemetry;

// Re-export commonly used types
pub use common::errors::{ArbError, Result};
pub use common::traits::{ExchangeAdapter, MetricsSink, Notifier};
pub use common::types::{
    Balance, Notification, OrderReceipt, Severity, Side, Ticker, TickerQuote, TradeStatus, VenueId,
};
pub use config::types::AppConfig;
pub use engine::{
    CycleLoop, CycleReport, CycleState, EngineSettings, ExecutionCoordinator, Opportunity,
    OpportunityDetector, PriceAggregator, PriceSnapshot, RetryPolicy, RiskSizer, ServiceContext,
    SizedOpportunity, TradeResult,
};
pub use exchanges::{connect_venues, VenueRegistry};
