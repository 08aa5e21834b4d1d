//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use cross_venue_arb::common::errors::{ArbError, Result};
use cross_venue_arb::common::traits::{ExchangeAdapter, MetricsSink, Notifier};
use cross_venue_arb::common::types::{
    Balance, Notification, OrderReceipt, Side, TickerQuote, TradeStatus, VenueId,
};
use cross_venue_arb::engine::{RetryPolicy, ServiceContext};
use cross_venue_arb::exchanges::VenueRegistry;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const SOL_USDT: &str = "SOL/USDT";

/// Symbols the fixtures quote
pub static SYMBOLS: Lazy<Vec<String>> = Lazy::new(|| vec![SOL_USDT.to_string()]);

/// Three attempts, no backoff, short deadline
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO, Duration::from_millis(200))
}

/// In-memory venue with scripted quotes, balances and order outcomes
pub struct FakeExchange {
    venue: VenueId,
    quotes: HashMap<String, (Option<Decimal>, Option<Decimal>)>,
    balances: Vec<(String, Decimal)>,
    tickers_fail: bool,
    balances_fail: bool,
    failing_sides: Vec<Side>,
    unacknowledged_sides: Vec<Side>,
    next_order: AtomicU64,
    orders: Mutex<Vec<OrderReceipt>>,
    by_client_id: Mutex<HashMap<String, OrderReceipt>>,
    order_attempts: Mutex<Vec<Side>>,
}

impl FakeExchange {
    pub fn new(venue: &str) -> Self {
        Self {
            venue: VenueId::new(venue),
            quotes: HashMap::new(),
            balances: Vec::new(),
            tickers_fail: false,
            balances_fail: false,
            failing_sides: Vec::new(),
            unacknowledged_sides: Vec::new(),
            next_order: AtomicU64::new(1),
            orders: Mutex::new(Vec::new()),
            by_client_id: Mutex::new(HashMap::new()),
            order_attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_quote(mut self, symbol: &str, bid: Decimal, ask: Decimal) -> Self {
        self.quotes.insert(symbol.to_string(), (Some(bid), Some(ask)));
        self
    }

    /// Quote with one or both sides missing
    pub fn with_raw_quote(mut self, symbol: &str, bid: Option<Decimal>, ask: Option<Decimal>) -> Self {
        self.quotes.insert(symbol.to_string(), (bid, ask));
        self
    }

    pub fn with_balance(mut self, asset: &str, free: Decimal) -> Self {
        self.balances.push((asset.to_string(), free));
        self
    }

    /// Every ticker request fails with a transient error
    pub fn with_failing_tickers(mut self) -> Self {
        self.tickers_fail = true;
        self
    }

    pub fn with_failing_balances(mut self) -> Self {
        self.balances_fail = true;
        self
    }

    /// Every order on `side` fails with a transient error
    pub fn with_failing_orders(mut self, side: Side) -> Self {
        self.failing_sides.push(side);
        self
    }

    /// Orders on `side` are booked, but the reply times out
    pub fn with_lost_acknowledgements(mut self, side: Side) -> Self {
        self.unacknowledged_sides.push(side);
        self
    }

    /// Orders that were accepted
    pub fn orders(&self) -> Vec<OrderReceipt> {
        self.orders.lock().unwrap().clone()
    }

    /// Every order submission, accepted or not
    pub fn order_attempts(&self) -> Vec<Side> {
        self.order_attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeAdapter for FakeExchange {
    fn venue_id(&self) -> &VenueId {
        &self.venue
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerQuote> {
        if self.tickers_fail {
            return Err(ArbError::TransientCallFailure(format!("{} unreachable", self.venue)));
        }
        let (bid, ask) = self
            .quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| ArbError::InvalidResponse(format!("no market {}", symbol)))?;
        Ok(TickerQuote {
            symbol: symbol.to_string(),
            bid,
            ask,
            observed_at: Utc::now(),
        })
    }

    async fn fetch_balance(&self) -> Result<Vec<Balance>> {
        if self.balances_fail {
            return Err(ArbError::TransientCallFailure(format!("{} unreachable", self.venue)));
        }
        Ok(self
            .balances
            .iter()
            .map(|(asset, free)| Balance {
                venue: self.venue.clone(),
                asset: asset.clone(),
                free: *free,
                total: *free,
            })
            .collect())
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        client_order_id: &str,
    ) -> Result<OrderReceipt> {
        self.order_attempts.lock().unwrap().push(side);
        if self.failing_sides.contains(&side) {
            return Err(ArbError::TransientCallFailure(format!(
                "{} order gateway down",
                self.venue
            )));
        }

        let n = self.next_order.fetch_add(1, Ordering::SeqCst);
        let receipt = OrderReceipt {
            order_id: format!("{}-{}", self.venue, n),
            venue: self.venue.clone(),
            symbol: symbol.to_string(),
            side,
            amount,
        };
        self.orders.lock().unwrap().push(receipt.clone());
        self.by_client_id
            .lock()
            .unwrap()
            .insert(client_order_id.to_string(), receipt.clone());

        if self.unacknowledged_sides.contains(&side) {
            return Err(ArbError::Timeout(format!("{} order reply lost", self.venue)));
        }
        Ok(receipt)
    }

    async fn find_order(&self, _symbol: &str, client_order_id: &str) -> Result<Option<OrderReceipt>> {
        Ok(self.by_client_id.lock().unwrap().get(client_order_id).cloned())
    }
}

/// Forwards every notification into a channel
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<Notification>,
    delay: Duration,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        Self::with_delay(Duration::ZERO)
    }

    /// Each delivery takes `delay` before it reaches the channel
    pub fn with_delay(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, delay }, rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.tx
            .send(notification.clone())
            .map_err(|e| ArbError::Notification(e.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub cycles: Mutex<Vec<Duration>>,
    pub opportunities: Mutex<Vec<usize>>,
    pub balances: Mutex<Vec<Balance>>,
    pub trades: Mutex<Vec<TradeStatus>>,
}

impl MetricsSink for RecordingMetrics {
    fn record_cycle_duration(&self, duration: Duration) {
        self.cycles.lock().unwrap().push(duration);
    }

    fn record_opportunities_found(&self, count: usize) {
        self.opportunities.lock().unwrap().push(count);
    }

    fn record_balance(&self, balance: &Balance) {
        self.balances.lock().unwrap().push(balance.clone());
    }

    fn record_trade(&self, status: TradeStatus) {
        self.trades.lock().unwrap().push(status);
    }
}

/// Wired-up context plus handles on its sinks
pub struct Harness {
    pub ctx: ServiceContext,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    pub metrics: Arc<RecordingMetrics>,
}

pub fn harness(venues: Vec<Arc<FakeExchange>>) -> Harness {
    let (notifier, notifications) = RecordingNotifier::new();
    harness_with_notifier(venues, notifier, notifications)
}

pub fn harness_with_notifier(
    venues: Vec<Arc<FakeExchange>>,
    notifier: RecordingNotifier,
    notifications: mpsc::UnboundedReceiver<Notification>,
) -> Harness {
    let adapters: Vec<Arc<dyn ExchangeAdapter>> = venues
        .into_iter()
        .map(|v| v as Arc<dyn ExchangeAdapter>)
        .collect();
    let registry = VenueRegistry::new(adapters).unwrap();
    let metrics = Arc::new(RecordingMetrics::default());

    Harness {
        ctx: ServiceContext::new(registry, Arc::new(notifier), metrics.clone()),
        notifications,
        metrics,
    }
}
