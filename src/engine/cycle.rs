use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::aggregator::PriceAggregator;
use super::balances::{AvailableFunds, BalanceTracker};
use super::context::{ServiceContext, NOTIFICATION_DRAIN_TIMEOUT};
use super::detector::OpportunityDetector;
use super::execution::ExecutionCoordinator;
use super::retry::RetryPolicy;
use super::sizer::RiskSizer;
use super::types::SizedOpportunity;
use crate::common::errors::{ArbError, Result};
use crate::common::types::{split_symbol, TradeStatus};
use crate::config::types::AppConfig;

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    RefreshingBalances,
    FetchingPrices,
    Detecting,
    Sizing,
    Executing,
    Sleeping,
    Stopped,
}

/// Engine parameters taken from configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub symbols: Vec<String>,
    pub threshold_pct: Decimal,
    pub taker_fee_pct: Decimal,
    pub max_risk_pct: Decimal,
    pub max_trade_amount: Decimal,
    pub retry: RetryPolicy,
    pub cycle_delay: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            symbols: config.arbitrage.symbols.clone(),
            threshold_pct: config.arbitrage.threshold,
            taker_fee_pct: config.fees.taker_fee,
            max_risk_pct: config.risk_management.max_risk_percentage,
            max_trade_amount: config.arbitrage.trade_amount,
            retry: RetryPolicy::from_config(&config.retry),
            cycle_delay: config.arbitrage.cycle_delay(),
        }
    }
}

/// Counters for one pass through the cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub opportunities_found: usize,
    pub sized: usize,
    pub completed: usize,
    pub partial_failures: usize,
    pub execution_failures: usize,
    pub skipped_insufficient_balance: usize,
}

/// Drives balances → prices → detection → sizing → execution → sleep
pub struct CycleLoop {
    ctx: ServiceContext,
    settings: EngineSettings,
    aggregator: PriceAggregator,
    balances: BalanceTracker,
    detector: OpportunityDetector,
    sizer: RiskSizer,
    coordinator: ExecutionCoordinator,
    state: CycleState,
}

impl CycleLoop {
    pub fn new(ctx: ServiceContext, settings: EngineSettings) -> Self {
        let retry = settings.retry.clone();
        Self {
            aggregator: PriceAggregator::with_symbol_budget(retry.clone(), settings.symbols.len()),
            balances: BalanceTracker::new(retry.clone()),
            detector: OpportunityDetector::new(settings.taker_fee_pct, settings.threshold_pct),
            sizer: RiskSizer::new(settings.max_risk_pct, settings.max_trade_amount),
            coordinator: ExecutionCoordinator::new(retry),
            ctx,
            settings,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    fn transition(&mut self, next: CycleState) {
        debug!(from = ?self.state, to = ?next, "cycle state");
        self.state = next;
    }

    /// Run one full cycle without the trailing sleep
    ///
    /// Opportunities are sized and executed in detection order. Funds
    /// committed to an earlier trade are not offered to a later one in
    /// the same cycle.
    #[instrument(skip_all)]
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.transition(CycleState::RefreshingBalances);
        let balances = self.balances.refresh(&self.ctx).await;

        self.transition(CycleState::FetchingPrices);
        let prices = self
            .aggregator
            .fetch_all(&self.ctx.registry, &self.settings.symbols)
            .await;
        if prices.venue_count() < 2 {
            warn!(
                venues = prices.venue_count(),
                "fewer than two venues reported prices, nothing to compare"
            );
        }

        self.transition(CycleState::Detecting);
        let opportunities: Vec<_> = self
            .detector
            .detect(&prices, &self.settings.symbols)
            .collect();
        report.opportunities_found = opportunities.len();
        for opportunity in &opportunities {
            info!("Opportunity: {}", opportunity);
        }

        self.transition(CycleState::Sizing);
        let mut funds = AvailableFunds::new(&balances);
        let mut sized: Vec<SizedOpportunity> = Vec::with_capacity(opportunities.len());
        for opportunity in opportunities {
            let (base, quote) = split_symbol(opportunity.symbol())
                .map(|(base, quote)| (base.to_string(), quote.to_string()))?;
            let buy_quote = funds.available(opportunity.buy_venue(), &quote);
            let sell_base = funds.available(opportunity.sell_venue(), &base);

            match self.sizer.size(opportunity, buy_quote, sell_base) {
                Ok(trade) => {
                    let opp = trade.opportunity();
                    funds.reserve(opp.buy_venue(), &quote, trade.trade_amount() * opp.buy_price());
                    funds.reserve(opp.sell_venue(), &base, trade.trade_amount());
                    sized.push(trade);
                }
                Err(ArbError::InsufficientBalance(detail)) => {
                    info!("Skipping opportunity, insufficient balance: {}", detail);
                    report.skipped_insufficient_balance += 1;
                }
                Err(e) => return Err(e),
            }
        }
        report.sized = sized.len();

        self.transition(CycleState::Executing);
        for trade in sized {
            match self.coordinator.execute(&self.ctx, trade).await {
                Ok(result) => match result.status {
                    TradeStatus::Completed => report.completed += 1,
                    TradeStatus::PartialFailure => report.partial_failures += 1,
                },
                Err(e) => {
                    warn!("Trade not executed: {}", e);
                    report.execution_failures += 1;
                }
            }
        }

        Ok(report)
    }

    /// Loop until `stop` carries `true` or its sender is dropped
    ///
    /// A cycle in progress always runs to completion; the signal is
    /// observed between cycles and during the sleep. Notifications still
    /// in flight get `NOTIFICATION_DRAIN_TIMEOUT` to go out before returning.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) {
        info!(
            venues = self.ctx.registry.len(),
            symbols = self.settings.symbols.len(),
            "Starting arbitrage loop"
        );

        loop {
            if *stop.borrow() {
                break;
            }

            let started = Instant::now();
            match self.run_cycle().await {
                Ok(report) => {
                    self.ctx.metrics.record_opportunities_found(report.opportunities_found);
                    info!(
                        opportunities = report.opportunities_found,
                        sized = report.sized,
                        completed = report.completed,
                        partial_failures = report.partial_failures,
                        execution_failures = report.execution_failures,
                        skipped = report.skipped_insufficient_balance,
                        "cycle finished"
                    );
                }
                Err(e) => {
                    self.ctx.metrics.record_opportunities_found(0);
                    error!("Error in arbitrage cycle: {}", e);
                }
            }
            self.ctx.metrics.record_cycle_duration(started.elapsed());

            self.transition(CycleState::Sleeping);
            tokio::select! {
                _ = sleep(self.settings.cycle_delay) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.transition(CycleState::Stopped);
        self.ctx.flush_notifications(NOTIFICATION_DRAIN_TIMEOUT).await;
        info!("Arbitrage loop stopped");
    }
}
