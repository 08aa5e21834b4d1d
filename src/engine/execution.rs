use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::context::ServiceContext;
use super::retry::RetryPolicy;
use super::types::{SizedOpportunity, TradeResult};
use crate::common::errors::{ArbError, Result};
use crate::common::traits::ExchangeAdapter;
use crate::common::types::{OrderReceipt, Side};

/// Places the buy leg, then the sell leg, of a sized opportunity
///
/// The pair is not transactional. When the sell leg fails after the buy
/// filled, the result is a `PartialFailure` and the bought position stays
/// open; no compensating order is sent.
#[derive(Debug, Clone)]
pub struct ExecutionCoordinator {
    retry: RetryPolicy,
}

impl ExecutionCoordinator {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Execute both legs and hand the result to the metrics and notification sinks
    ///
    /// Returns `ExecutionFailure { leg: Buy }` when the buy leg fails; in
    /// that case no position was taken and the sell leg is not attempted.
    #[instrument(skip_all, fields(
        symbol = sized.opportunity().symbol(),
        buy = %sized.opportunity().buy_venue(),
        sell = %sized.opportunity().sell_venue(),
        amount = %sized.trade_amount(),
    ))]
    pub async fn execute(&self, ctx: &ServiceContext, sized: SizedOpportunity) -> Result<TradeResult> {
        let opportunity = sized.opportunity();
        let buyer = ctx.registry.get(opportunity.buy_venue())?;
        let seller = ctx.registry.get(opportunity.sell_venue())?;
        let amount = sized.trade_amount();

        info!(
            "Placing buy order on {} at {} for {} {}",
            opportunity.buy_venue(),
            opportunity.buy_price(),
            amount,
            opportunity.symbol()
        );
        let buy = self
            .place_leg(buyer.as_ref(), opportunity.symbol(), Side::Buy, &sized)
            .await
            .map_err(|e| {
                error!("Buy leg failed, trade abandoned: {}", e);
                ArbError::ExecutionFailure {
                    leg: Side::Buy,
                    source: Box::new(e),
                }
            })?;

        info!(
            "Placing sell order on {} at {} for {} {}",
            opportunity.sell_venue(),
            opportunity.sell_price(),
            amount,
            opportunity.symbol()
        );
        let sell = self
            .place_leg(seller.as_ref(), opportunity.symbol(), Side::Sell, &sized)
            .await;

        let result = match sell {
            Ok(receipt) => {
                info!(
                    "Trade executed: bought {} on {} and sold on {}, expected profit {}%",
                    opportunity.symbol(),
                    opportunity.buy_venue(),
                    opportunity.sell_venue(),
                    opportunity.net_profit_pct().round_dp(2)
                );
                TradeResult::completed(sized, buy.order_id, receipt.order_id)
            }
            Err(e) => {
                error!(
                    buy_order_id = %buy.order_id,
                    "Sell leg failed after buy filled; {} {} left open on {}: {}",
                    amount,
                    opportunity.symbol(),
                    opportunity.buy_venue(),
                    e
                );
                TradeResult::partial_failure(sized, buy.order_id, e.to_string())
            }
        };

        ctx.metrics.record_trade(result.status);
        ctx.notify(result.to_notification());

        Ok(result)
    }

    async fn place_leg(
        &self,
        adapter: &dyn ExchangeAdapter,
        symbol: &str,
        side: Side,
        sized: &SizedOpportunity,
    ) -> Result<OrderReceipt> {
        let amount = sized.trade_amount();
        let label = match side {
            Side::Buy => "create_market_order(buy)",
            Side::Sell => "create_market_order(sell)",
        };
        let client_order_id = Uuid::new_v4().to_string();
        let submitted = AtomicBool::new(false);
        let (id, submitted) = (client_order_id.as_str(), &submitted);

        self.retry
            .run(label, move || async move {
                // A failed attempt may still have reached the venue
                if submitted.swap(true, Ordering::SeqCst) {
                    if let Some(receipt) = adapter.find_order(symbol, id).await? {
                        info!(
                            client_order_id = id,
                            order_id = %receipt.order_id,
                            "order from an earlier attempt is live, not resubmitting"
                        );
                        return Ok(receipt);
                    }
                }
                adapter.create_market_order(symbol, side, amount, id).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::{MetricsSink, MockExchangeAdapter, Notifier};
    use crate::common::types::{Balance, Notification, TradeStatus, VenueId};
    use crate::engine::sizer::RiskSizer;
    use crate::engine::types::Opportunity;
    use crate::exchanges::registry::VenueRegistry;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        fn name(&self) -> &'static str {
            "silent"
        }

        async fn send(&self, _notification: &Notification) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct TradeCounter {
        statuses: Mutex<Vec<TradeStatus>>,
    }

    impl MetricsSink for TradeCounter {
        fn record_cycle_duration(&self, _duration: Duration) {}
        fn record_opportunities_found(&self, _count: usize) {}
        fn record_balance(&self, _balance: &Balance) {}
        fn record_trade(&self, status: TradeStatus) {
            self.statuses.lock().unwrap().push(status);
        }
    }

    fn receipt(venue: &str, symbol: &str, side: Side, amount: Decimal) -> OrderReceipt {
        OrderReceipt {
            order_id: format!("{}-{}", venue, side),
            venue: venue.into(),
            symbol: symbol.to_string(),
            side,
            amount,
        }
    }

    fn sized() -> SizedOpportunity {
        let opp = Opportunity::new(
            "SOL/USDT",
            "alpha".into(),
            "beta".into(),
            dec!(99),
            dec!(100),
            dec!(0.1),
        )
        .unwrap();
        RiskSizer::new(dec!(100), dec!(1))
            .size(opp, dec!(1000), dec!(10))
            .unwrap()
    }

    fn context(
        buyer: MockExchangeAdapter,
        seller: MockExchangeAdapter,
        metrics: Arc<TradeCounter>,
    ) -> ServiceContext {
        let registry = VenueRegistry::new(vec![Arc::new(buyer), Arc::new(seller)]).unwrap();
        ServiceContext::new(registry, Arc::new(SilentNotifier), metrics)
    }

    fn coordinator() -> ExecutionCoordinator {
        ExecutionCoordinator::new(RetryPolicy::new(
            3,
            Duration::from_millis(10),
            Duration::from_secs(1),
        ))
    }

    fn venue(id: &str) -> MockExchangeAdapter {
        let mut adapter = MockExchangeAdapter::new();
        adapter.expect_venue_id().return_const(VenueId::new(id));
        adapter
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_legs_fill() {
        let mut buyer = venue("alpha");
        buyer
            .expect_create_market_order()
            .times(1)
            .returning(|symbol, side, amount, _| {
                assert_eq!(side, Side::Buy);
                Ok(receipt("alpha", symbol, side, amount))
            });
        let mut seller = venue("beta");
        seller
            .expect_create_market_order()
            .times(1)
            .returning(|symbol, side, amount, _| {
                assert_eq!(side, Side::Sell);
                Ok(receipt("beta", symbol, side, amount))
            });
        let metrics = Arc::new(TradeCounter::default());
        let ctx = context(buyer, seller, metrics.clone());

        let result = coordinator().execute(&ctx, sized()).await.unwrap();

        assert_eq!(result.status, TradeStatus::Completed);
        assert_eq!(result.trade_amount, dec!(1));
        assert_eq!(result.buy_order_id, "alpha-BUY");
        assert_eq!(result.sell_order_id.as_deref(), Some("beta-SELL"));
        assert_eq!(*metrics.statuses.lock().unwrap(), vec![TradeStatus::Completed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sell_exhaustion_leaves_position_open() {
        // The buy venue only ever sees the one buy: no compensating sell
        let mut buyer = venue("alpha");
        buyer
            .expect_create_market_order()
            .times(1)
            .returning(|symbol, side, amount, _| Ok(receipt("alpha", symbol, side, amount)));
        let mut seller = venue("beta");
        seller
            .expect_create_market_order()
            .times(3)
            .returning(|_, _, _, _| Err(ArbError::TransientCallFailure("503".into())));
        // Each retry first checks whether the failed attempt reached the book
        seller
            .expect_find_order()
            .times(2)
            .returning(|_, _| Ok(None));
        let metrics = Arc::new(TradeCounter::default());
        let ctx = context(buyer, seller, metrics.clone());

        let result = coordinator().execute(&ctx, sized()).await.unwrap();

        assert_eq!(result.status, TradeStatus::PartialFailure);
        assert_eq!(result.buy_order_id, "alpha-BUY");
        assert!(result.sell_order_id.is_none());
        assert!(result
            .sell_error
            .as_deref()
            .unwrap()
            .contains("after 3 attempts"));
        assert_eq!(
            *metrics.statuses.lock().unwrap(),
            vec![TradeStatus::PartialFailure]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_picks_up_order_that_timed_out() {
        let mut buyer = venue("alpha");
        buyer
            .expect_create_market_order()
            .times(1)
            .returning(|symbol, side, amount, _| Ok(receipt("alpha", symbol, side, amount)));

        // The sell reaches the book but the acknowledgement is lost
        let sent_id = Arc::new(Mutex::new(String::new()));
        let mut seller = venue("beta");
        {
            let sent_id = sent_id.clone();
            seller
                .expect_create_market_order()
                .times(1)
                .returning(move |_, _, _, client_order_id| {
                    *sent_id.lock().unwrap() = client_order_id.to_string();
                    Err(ArbError::Timeout("create_market_order(sell)".into()))
                });
        }
        {
            let sent_id = sent_id.clone();
            seller
                .expect_find_order()
                .times(1)
                .returning(move |symbol, client_order_id| {
                    assert_eq!(client_order_id, sent_id.lock().unwrap().as_str());
                    Ok(Some(OrderReceipt {
                        order_id: "beta-live".into(),
                        venue: "beta".into(),
                        symbol: symbol.to_string(),
                        side: Side::Sell,
                        amount: dec!(1),
                    }))
                });
        }
        let metrics = Arc::new(TradeCounter::default());
        let ctx = context(buyer, seller, metrics.clone());

        let result = coordinator().execute(&ctx, sized()).await.unwrap();

        assert_eq!(result.status, TradeStatus::Completed);
        assert_eq!(result.sell_order_id.as_deref(), Some("beta-live"));
        assert_eq!(sent_id.lock().unwrap().len(), 36);
    }

    #[tokio::test(start_paused = true)]
    async fn test_buy_failure_skips_sell_leg() {
        let mut buyer = venue("alpha");
        buyer
            .expect_create_market_order()
            .times(1)
            .returning(|_, _, _, _| {
                Err(ArbError::OrderRejected {
                    venue: "alpha".into(),
                    message: "insufficient funds".into(),
                })
            });
        let mut seller = venue("beta");
        seller.expect_create_market_order().never();
        let metrics = Arc::new(TradeCounter::default());
        let ctx = context(buyer, seller, metrics.clone());

        let err = coordinator().execute(&ctx, sized()).await.unwrap_err();

        assert!(matches!(
            err,
            ArbError::ExecutionFailure {
                leg: Side::Buy,
                ..
            }
        ));
        assert!(metrics.statuses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_venue_places_nothing() {
        let mut buyer = venue("alpha");
        buyer.expect_create_market_order().never();
        let registry = VenueRegistry::new(vec![Arc::new(buyer)]).unwrap();
        let ctx = ServiceContext::new(
            registry,
            Arc::new(SilentNotifier),
            Arc::new(TradeCounter::default()),
        );

        let err = coordinator().execute(&ctx, sized()).await.unwrap_err();
        assert!(matches!(err, ArbError::UnknownVenue(_)));
    }
}
