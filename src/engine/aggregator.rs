use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, instrument, warn};

use super::retry::RetryPolicy;
use crate::common::errors::{ArbError, Result};
use crate::common::traits::ExchangeAdapter;
use crate::common::types::{Ticker, VenueId};
use crate::exchanges::registry::VenueRegistry;

/// Tickers of one cycle, venue → symbol → ticker
///
/// Venues keep the order they were configured in, which fixes the scan
/// order of the detector. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    venues: Vec<(VenueId, HashMap<String, Ticker>)>,
}

impl PriceSnapshot {
    pub fn new(venues: Vec<(VenueId, HashMap<String, Ticker>)>) -> Self {
        Self { venues }
    }

    /// Group tickers by venue, venues ordered by first appearance
    pub fn from_tickers(tickers: impl IntoIterator<Item = Ticker>) -> Self {
        let mut venues: Vec<(VenueId, HashMap<String, Ticker>)> = Vec::new();
        for ticker in tickers {
            match venues.iter_mut().find(|(venue, _)| *venue == ticker.venue) {
                Some((_, by_symbol)) => {
                    by_symbol.insert(ticker.symbol.clone(), ticker);
                }
                None => {
                    let venue = ticker.venue.clone();
                    let mut by_symbol = HashMap::new();
                    by_symbol.insert(ticker.symbol.clone(), ticker);
                    venues.push((venue, by_symbol));
                }
            }
        }
        Self::new(venues)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VenueId, &HashMap<String, Ticker>)> + '_ {
        self.venues.iter().map(|(venue, tickers)| (venue, tickers))
    }

    pub fn ticker(&self, venue: &VenueId, symbol: &str) -> Option<&Ticker> {
        self.venues
            .iter()
            .find(|(id, _)| id == venue)
            .and_then(|(_, tickers)| tickers.get(symbol))
    }

    pub fn venues(&self) -> impl Iterator<Item = &VenueId> + '_ {
        self.venues.iter().map(|(venue, _)| venue)
    }

    pub fn venue_count(&self) -> usize {
        self.venues.len()
    }

    /// Total number of tickers across venues
    pub fn len(&self) -> usize {
        self.venues.iter().map(|(_, tickers)| tickers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches every configured symbol from every venue, one task per venue
#[derive(Debug, Clone)]
pub struct PriceAggregator {
    retry: RetryPolicy,
    venue_deadline: Duration,
}

impl PriceAggregator {
    /// `venue_deadline` bounds each venue task as a whole
    pub fn new(retry: RetryPolicy, venue_deadline: Duration) -> Self {
        Self {
            retry,
            venue_deadline,
        }
    }

    /// Deadline large enough for every symbol to use its full retry budget
    pub fn with_symbol_budget(retry: RetryPolicy, symbol_count: usize) -> Self {
        let venue_deadline = retry.worst_case() * symbol_count.max(1) as u32;
        Self::new(retry, venue_deadline)
    }

    /// Fork one task per venue and join them all before building the snapshot
    ///
    /// A venue whose task fails or panics contributes nothing; the other
    /// venues are unaffected.
    #[instrument(skip_all, fields(venues = registry.len(), symbols = symbols.len()))]
    pub async fn fetch_all(&self, registry: &VenueRegistry, symbols: &[String]) -> PriceSnapshot {
        let symbols: Arc<[String]> = symbols.into();

        let handles: Vec<_> = registry
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let symbols = Arc::clone(&symbols);
                let retry = self.retry.clone();
                let deadline = self.venue_deadline;
                tokio::spawn(async move { fetch_venue(adapter, &symbols, &retry, deadline).await })
            })
            .collect();

        let results = join_all(handles).await;

        let mut venues = Vec::with_capacity(results.len());
        for (adapter, result) in registry.iter().zip(results) {
            let venue = adapter.venue_id();
            match result {
                Ok(tickers) if tickers.is_empty() => {
                    warn!(%venue, "no usable tickers this cycle");
                }
                Ok(tickers) => {
                    debug!(%venue, count = tickers.len(), "tickers fetched");
                    venues.push((venue.clone(), tickers));
                }
                Err(e) => {
                    error!(%venue, "price task failed: {}", ArbError::from(e));
                }
            }
        }

        PriceSnapshot::new(venues)
    }
}

async fn fetch_venue(
    adapter: Arc<dyn ExchangeAdapter>,
    symbols: &[String],
    retry: &RetryPolicy,
    deadline: Duration,
) -> HashMap<String, Ticker> {
    let venue = adapter.venue_id().clone();
    let adapter: &dyn ExchangeAdapter = adapter.as_ref();
    let expires_at = Instant::now() + deadline;
    let mut tickers = HashMap::with_capacity(symbols.len());

    for symbol in symbols {
        let remaining = expires_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!(%venue, "venue deadline reached, skipping remaining symbols");
            break;
        }

        let symbol_ref: &str = symbol;
        let fetched = timeout(
            remaining,
            retry.run("fetch_ticker", move || adapter.fetch_ticker(symbol_ref)),
        )
        .await
        .unwrap_or_else(|_| Err(ArbError::Timeout(format!("{} venue deadline", venue))));

        match fetched.and_then(|quote| Ticker::from_quote(venue.clone(), quote)) {
            Ok(ticker) => {
                tickers.insert(symbol.clone(), ticker);
            }
            Err(e @ ArbError::IncompleteMarketData { .. }) => {
                warn!(%venue, %symbol, "dropping ticker: {}", e);
            }
            Err(e) => {
                warn!(%venue, %symbol, "error fetching ticker: {}", e);
            }
        }
    }

    tickers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockExchangeAdapter;
    use crate::common::types::{Balance, OrderReceipt, Side, TickerQuote};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts every call and never answers
    struct StalledVenue {
        venue: VenueId,
        ticker_calls: AtomicUsize,
    }

    #[async_trait]
    impl ExchangeAdapter for StalledVenue {
        fn venue_id(&self) -> &VenueId {
            &self.venue
        }

        async fn fetch_ticker(&self, _symbol: &str) -> Result<TickerQuote> {
            self.ticker_calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }

        async fn fetch_balance(&self) -> Result<Vec<Balance>> {
            std::future::pending().await
        }

        async fn create_market_order(
            &self,
            _symbol: &str,
            _side: Side,
            _amount: Decimal,
            _client_order_id: &str,
        ) -> Result<OrderReceipt> {
            std::future::pending().await
        }

        async fn find_order(&self, _symbol: &str, _client_order_id: &str) -> Result<Option<OrderReceipt>> {
            std::future::pending().await
        }
    }

    fn quoting(id: &str) -> MockExchangeAdapter {
        let mut adapter = MockExchangeAdapter::new();
        adapter.expect_venue_id().return_const(VenueId::new(id));
        adapter.expect_fetch_ticker().returning(|symbol| {
            Ok(TickerQuote {
                symbol: symbol.to_string(),
                bid: Some(dec!(10)),
                ask: Some(dec!(10.1)),
                observed_at: Utc::now(),
            })
        });
        adapter
    }

    fn ticker(venue: &str, symbol: &str, bid: Decimal, ask: Decimal) -> Ticker {
        Ticker {
            venue: venue.into(),
            symbol: symbol.to_string(),
            bid,
            ask,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_groups_by_venue_in_order() {
        let snapshot = PriceSnapshot::from_tickers(vec![
            ticker("kraken", "SOL/USDT", dec!(10), dec!(11)),
            ticker("binance", "SOL/USDT", dec!(10), dec!(11)),
            ticker("kraken", "NEAR/USDT", dec!(2), dec!(3)),
        ]);

        let order: Vec<_> = snapshot.venues().map(|v| v.as_str()).collect();
        assert_eq!(order, vec!["kraken", "binance"]);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.venue_count(), 2);
        assert!(snapshot.ticker(&"kraken".into(), "NEAR/USDT").is_some());
        assert!(snapshot.ticker(&"binance".into(), "NEAR/USDT").is_none());
    }

    #[tokio::test]
    async fn test_incomplete_quote_is_dropped_without_failing_venue() {
        let mut adapter = MockExchangeAdapter::new();
        adapter.expect_venue_id().return_const(VenueId::new("binance"));
        adapter.expect_fetch_ticker().returning(|symbol| {
            let bid = if symbol == "NEAR/USDT" { None } else { Some(dec!(10)) };
            Ok(TickerQuote {
                symbol: symbol.to_string(),
                bid,
                ask: Some(dec!(10.1)),
                observed_at: Utc::now(),
            })
        });

        let registry = VenueRegistry::new(vec![Arc::new(adapter)]).unwrap();
        let aggregator = PriceAggregator::new(
            RetryPolicy::new(1, Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(5),
        );
        let symbols = vec!["SOL/USDT".to_string(), "NEAR/USDT".to_string()];

        let snapshot = aggregator.fetch_all(&registry, &symbols).await;

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.ticker(&"binance".into(), "SOL/USDT").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_venue_is_cut_off_at_venue_deadline() {
        let stalled = Arc::new(StalledVenue {
            venue: VenueId::new("coinbase"),
            ticker_calls: AtomicUsize::new(0),
        });
        let registry = VenueRegistry::new(vec![
            Arc::new(quoting("binance")) as Arc<dyn ExchangeAdapter>,
            stalled.clone() as Arc<dyn ExchangeAdapter>,
        ])
        .unwrap();
        // The per-call timeout alone would let the stalled venue hold the join for minutes
        let venue_deadline = Duration::from_secs(2);
        let aggregator = PriceAggregator::new(
            RetryPolicy::new(3, Duration::ZERO, Duration::from_secs(60)),
            venue_deadline,
        );
        let symbols = vec!["SOL/USDT".to_string(), "NEAR/USDT".to_string()];

        let started = Instant::now();
        let snapshot = aggregator.fetch_all(&registry, &symbols).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= venue_deadline);
        assert!(elapsed < venue_deadline + Duration::from_millis(100));
        let venues: Vec<_> = snapshot.venues().map(|v| v.as_str()).collect();
        assert_eq!(venues, vec!["binance"]);
        assert_eq!(snapshot.len(), 2);
        // The second symbol is never requested once the deadline is spent
        assert_eq!(stalled.ticker_calls.load(Ordering::SeqCst), 1);
    }
}
