use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::types::{Opportunity, SizedOpportunity};
use crate::common::errors::{ArbError, Result};

/// Decimal places kept on trade amounts; the rest is truncated
pub const AMOUNT_DECIMALS: u32 = 8;

/// Bounds trade amounts by risk budget, absolute cap and sellable inventory
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSizer {
    max_risk_pct: Decimal,
    max_trade_amount: Decimal,
}

impl RiskSizer {
    pub fn new(max_risk_pct: Decimal, max_trade_amount: Decimal) -> Self {
        Self {
            max_risk_pct,
            max_trade_amount,
        }
    }

    /// Base-asset amount to trade, possibly zero
    ///
    /// `min(buy_quote × risk% / buy_price, max_trade_amount, sell_base)`,
    /// truncated to [`AMOUNT_DECIMALS`]. Negative balances count as zero.
    pub fn trade_amount(
        &self,
        opportunity: &Opportunity,
        buy_venue_quote_balance: Decimal,
        sell_venue_base_balance: Decimal,
    ) -> Decimal {
        let risk_amount = buy_venue_quote_balance.max(Decimal::ZERO) * self.max_risk_pct / dec!(100);
        let from_risk = risk_amount / opportunity.buy_price();

        from_risk
            .min(self.max_trade_amount)
            .min(sell_venue_base_balance.max(Decimal::ZERO))
            .round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::ToZero)
    }

    /// Attach a trade amount, or `InsufficientBalance` when it would be zero
    pub fn size(
        &self,
        opportunity: Opportunity,
        buy_venue_quote_balance: Decimal,
        sell_venue_base_balance: Decimal,
    ) -> Result<SizedOpportunity> {
        let amount = self.trade_amount(
            &opportunity,
            buy_venue_quote_balance,
            sell_venue_base_balance,
        );

        if amount <= Decimal::ZERO {
            return Err(ArbError::InsufficientBalance(format!(
                "{}: quote balance {} on {}, base balance {} on {}",
                opportunity.symbol(),
                buy_venue_quote_balance,
                opportunity.buy_venue(),
                sell_venue_base_balance,
                opportunity.sell_venue(),
            )));
        }

        Ok(SizedOpportunity::new(opportunity, amount))
    }
}
