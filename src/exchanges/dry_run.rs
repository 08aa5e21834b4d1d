//! Paper-trading wrapper around a live adapter

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::common::errors::Result;
use crate::common::traits::ExchangeAdapter;
use crate::common::types::{Balance, OrderReceipt, Side, TickerQuote, VenueId};

/// Forwards market data and balances to the wrapped adapter, simulates orders
pub struct DryRunAdapter {
    inner: Arc<dyn ExchangeAdapter>,
    next_order: AtomicU64,
}

impl DryRunAdapter {
    pub fn new(inner: Arc<dyn ExchangeAdapter>) -> Self {
        Self {
            inner,
            next_order: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for DryRunAdapter {
    fn venue_id(&self) -> &VenueId {
        self.inner.venue_id()
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerQuote> {
        self.inner.fetch_ticker(symbol).await
    }

    async fn fetch_balance(&self) -> Result<Vec<Balance>> {
        self.inner.fetch_balance().await
    }

    #[instrument(skip(self), fields(venue = %self.venue_id()))]
    async fn create_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        _client_order_id: &str,
    ) -> Result<OrderReceipt> {
        let n = self.next_order.fetch_add(1, Ordering::Relaxed);
        let order_id = format!("dry-{}-{}", self.venue_id(), n);
        info!(%order_id, "[dry run] {} {} {} not sent", side, amount, symbol);

        Ok(OrderReceipt {
            order_id,
            venue: self.venue_id().clone(),
            symbol: symbol.to_string(),
            side,
            amount,
        })
    }

    /// Simulated orders are never stored, so nothing is ever found
    async fn find_order(&self, _symbol: &str, _client_order_id: &str) -> Result<Option<OrderReceipt>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockExchangeAdapter;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_orders_are_simulated_and_quotes_forwarded() {
        let mut inner = MockExchangeAdapter::new();
        inner.expect_venue_id().return_const(VenueId::new("binance"));
        inner.expect_create_market_order().never();
        inner.expect_find_order().never();
        inner.expect_fetch_ticker().times(1).returning(|symbol| {
            Ok(TickerQuote {
                symbol: symbol.to_string(),
                bid: Some(dec!(10)),
                ask: Some(dec!(10.1)),
                observed_at: Utc::now(),
            })
        });
        let adapter = DryRunAdapter::new(Arc::new(inner));

        let quote = adapter.fetch_ticker("SOL/USDT").await.unwrap();
        assert_eq!(quote.ask, Some(dec!(10.1)));

        let first = adapter
            .create_market_order("SOL/USDT", Side::Buy, dec!(0.5), "leg-1")
            .await
            .unwrap();
        let second = adapter
            .create_market_order("SOL/USDT", Side::Sell, dec!(0.5), "leg-2")
            .await
            .unwrap();

        assert_eq!(first.order_id, "dry-binance-1");
        assert_eq!(second.order_id, "dry-binance-2");
        assert_eq!(second.side, Side::Sell);
        assert!(adapter.find_order("SOL/USDT", "leg-1").await.unwrap().is_none());
    }
}
