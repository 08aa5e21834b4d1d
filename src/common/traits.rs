//! Trait definitions for the engine's collaborators

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

use super::errors::Result;
use super::types::{Balance, Notification, OrderReceipt, Side, TickerQuote, TradeStatus, VenueId};

/// Capability set every trading venue exposes to the engine
///
/// Implementations perform a single call per method; retries and
/// deadlines are applied by the caller through `RetryPolicy`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Identifier this adapter is registered under
    fn venue_id(&self) -> &VenueId;

    /// Fetch best bid/ask for a `BASE/QUOTE` symbol
    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerQuote>;

    /// Fetch balances for every asset held on the venue
    async fn fetch_balance(&self) -> Result<Vec<Balance>>;

    /// Submit a market order for `amount` units of the base asset
    ///
    /// `client_order_id` is forwarded to the venue so a resubmission can be
    /// matched against an order that already went through.
    async fn create_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        client_order_id: &str,
    ) -> Result<OrderReceipt>;

    /// Look up an order by the client id it was submitted with
    ///
    /// `Ok(None)` when the venue holds no order under that id.
    async fn find_order(&self, symbol: &str, client_order_id: &str) -> Result<Option<OrderReceipt>>;
}

/// Delivery channel for human-readable trade notifications
///
/// Callers never depend on delivery success; errors are only logged.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name of the transport, used in log lines
    fn name(&self) -> &'static str;

    /// Deliver a single notification
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Sink for the engine's observability signals
pub trait MetricsSink: Send + Sync {
    /// Wall time of one full cycle
    fn record_cycle_duration(&self, duration: Duration);

    /// Number of opportunities detected in the latest cycle
    fn record_opportunities_found(&self, count: usize);

    /// Latest available balance for a venue and asset
    fn record_balance(&self, balance: &Balance);

    /// Outcome of an executed trade
    fn record_trade(&self, status: TradeStatus);
}
