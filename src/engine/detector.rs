use rust_decimal::Decimal;

use super::aggregator::PriceSnapshot;
use super::types::Opportunity;

/// Pairwise scan of a price snapshot for spreads that clear the threshold
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunityDetector {
    taker_fee_pct: Decimal,
    threshold_pct: Decimal,
}

impl OpportunityDetector {
    pub fn new(taker_fee_pct: Decimal, threshold_pct: Decimal) -> Self {
        Self {
            taker_fee_pct,
            threshold_pct,
        }
    }

    /// Lazily yield every opportunity in the snapshot
    ///
    /// Order: symbols as given, then buy venue, then sell venue, both in
    /// snapshot order. An opportunity is emitted when its net profit is at
    /// least the threshold. The snapshot is only read, so calling this
    /// again yields the same sequence.
    pub fn detect<'a>(
        &'a self,
        snapshot: &'a PriceSnapshot,
        symbols: &'a [String],
    ) -> impl Iterator<Item = Opportunity> + 'a {
        symbols.iter().flat_map(move |symbol| {
            snapshot.iter().flat_map(move |(buy_venue, buy_tickers)| {
                snapshot.iter().filter_map(move |(sell_venue, sell_tickers)| {
                    if buy_venue == sell_venue {
                        return None;
                    }
                    let buy = buy_tickers.get(symbol)?;
                    let sell = sell_tickers.get(symbol)?;

                    Opportunity::new(
                        symbol.as_str(),
                        buy_venue.clone(),
                        sell_venue.clone(),
                        buy.ask,
                        sell.bid,
                        self.taker_fee_pct,
                    )
                    .filter(|opp| opp.net_profit_pct() >= self.threshold_pct)
                })
            })
        })
    }
}
