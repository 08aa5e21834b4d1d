use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::common::types::{Notification, Severity, TradeStatus, VenueId};

/// Net profit of buying at `buy_price` and selling at `sell_price`, in percent,
/// after paying `taker_fee_pct` on both legs
pub fn net_profit_pct(buy_price: Decimal, sell_price: Decimal, taker_fee_pct: Decimal) -> Decimal {
    (sell_price - buy_price) * dec!(100) / buy_price - dec!(2) * taker_fee_pct
}

/// A profitable cross-venue spread
///
/// Fields are private so the profit figure computed at construction can
/// never drift from the prices it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    symbol: String,
    buy_venue: VenueId,
    sell_venue: VenueId,
    buy_price: Decimal,
    sell_price: Decimal,
    net_profit_pct: Decimal,
}

impl Opportunity {
    /// Returns `None` when both legs are on the same venue or the buy price is not positive
    pub fn new(
        symbol: impl Into<String>,
        buy_venue: VenueId,
        sell_venue: VenueId,
        buy_price: Decimal,
        sell_price: Decimal,
        taker_fee_pct: Decimal,
    ) -> Option<Self> {
        if buy_venue == sell_venue || buy_price <= Decimal::ZERO {
            return None;
        }

        Some(Self {
            symbol: symbol.into(),
            net_profit_pct: net_profit_pct(buy_price, sell_price, taker_fee_pct),
            buy_venue,
            sell_venue,
            buy_price,
            sell_price,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn buy_venue(&self) -> &VenueId {
        &self.buy_venue
    }

    pub fn sell_venue(&self) -> &VenueId {
        &self.sell_venue
    }

    /// Ask on the buy venue
    pub fn buy_price(&self) -> Decimal {
        self.buy_price
    }

    /// Bid on the sell venue
    pub fn sell_price(&self) -> Decimal {
        self.sell_price
    }

    pub fn net_profit_pct(&self) -> Decimal {
        self.net_profit_pct
    }
}

impl std::fmt::Display for Opportunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: buy on {} at {}, sell on {} at {}, net profit {}%",
            self.symbol,
            self.buy_venue,
            self.buy_price,
            self.sell_venue,
            self.sell_price,
            self.net_profit_pct.round_dp(4)
        )
    }
}

/// An opportunity with a positive, risk-bounded trade amount
///
/// Only `RiskSizer` constructs these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizedOpportunity {
    opportunity: Opportunity,
    trade_amount: Decimal,
}

impl SizedOpportunity {
    pub(crate) fn new(opportunity: Opportunity, trade_amount: Decimal) -> Self {
        debug_assert!(trade_amount > Decimal::ZERO);
        Self {
            opportunity,
            trade_amount,
        }
    }

    pub fn opportunity(&self) -> &Opportunity {
        &self.opportunity
    }

    /// Base-asset amount for both legs
    pub fn trade_amount(&self) -> Decimal {
        self.trade_amount
    }
}

/// Outcome of a paired buy/sell where at least the buy leg filled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeResult {
    pub opportunity: Opportunity,
    pub trade_amount: Decimal,
    pub buy_order_id: String,
    pub sell_order_id: Option<String>,
    pub status: TradeStatus,
    /// Last error of the sell leg when it failed
    pub sell_error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl TradeResult {
    pub fn completed(sized: SizedOpportunity, buy_order_id: String, sell_order_id: String) -> Self {
        Self {
            opportunity: sized.opportunity,
            trade_amount: sized.trade_amount,
            buy_order_id,
            sell_order_id: Some(sell_order_id),
            status: TradeStatus::Completed,
            sell_error: None,
            executed_at: Utc::now(),
        }
    }

    pub fn partial_failure(sized: SizedOpportunity, buy_order_id: String, sell_error: String) -> Self {
        Self {
            opportunity: sized.opportunity,
            trade_amount: sized.trade_amount,
            buy_order_id,
            sell_order_id: None,
            status: TradeStatus::PartialFailure,
            sell_error: Some(sell_error),
            executed_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TradeStatus::Completed
    }

    /// Render for a human reader
    pub fn to_notification(&self) -> Notification {
        let opp = &self.opportunity;
        let mut body = format!(
            "Symbol: {}\nAmount: {}\nBought on {} at {} (order {})\n",
            opp.symbol(),
            self.trade_amount,
            opp.buy_venue(),
            opp.buy_price(),
            self.buy_order_id,
        );

        match (&self.sell_order_id, &self.sell_error) {
            (Some(sell_id), _) => body.push_str(&format!(
                "Sold on {} at {} (order {})\nExpected net profit: {}%\n",
                opp.sell_venue(),
                opp.sell_price(),
                sell_id,
                opp.net_profit_pct().round_dp(4),
            )),
            (None, error) => body.push_str(&format!(
                "Sell on {} FAILED: {}\nPosition of {} {} is open on {}\n",
                opp.sell_venue(),
                error.as_deref().unwrap_or("unknown error"),
                self.trade_amount,
                opp.symbol(),
                opp.buy_venue(),
            )),
        }
        body.push_str(&format!("Time: {}", self.executed_at.to_rfc3339()));

        match self.status {
            TradeStatus::Completed => Notification {
                severity: Severity::Info,
                title: format!("Arbitrage trade completed: {}", opp.symbol()),
                body,
            },
            TradeStatus::PartialFailure => Notification {
                severity: Severity::Critical,
                title: format!("Arbitrage sell leg failed, position open: {}", opp.symbol()),
                body,
            },
        }
    }
}
