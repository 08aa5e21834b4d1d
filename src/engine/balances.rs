use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;
use super::retry::RetryPolicy;
use crate::common::types::{Balance, VenueId};

/// Balances of one cycle, venue → asset → balance
///
/// Fully replaced on every refresh. A venue whose refresh failed has no
/// entries, so its balances read as zero rather than stale.
#[derive(Debug, Clone, Default)]
pub struct BalanceSnapshot {
    balances: HashMap<VenueId, HashMap<String, Balance>>,
}

impl BalanceSnapshot {
    pub fn from_balances(balances: impl IntoIterator<Item = Balance>) -> Self {
        let mut by_venue: HashMap<VenueId, HashMap<String, Balance>> = HashMap::new();
        for balance in balances {
            by_venue
                .entry(balance.venue.clone())
                .or_default()
                .insert(balance.asset.to_uppercase(), balance);
        }
        Self { balances: by_venue }
    }

    pub fn get(&self, venue: &VenueId, asset: &str) -> Option<&Balance> {
        self.balances
            .get(venue)
            .and_then(|assets| assets.get(&asset.to_uppercase()))
    }

    /// Free amount of `asset` on `venue`, zero when unknown
    pub fn free(&self, venue: &VenueId, asset: &str) -> Decimal {
        self.get(venue, asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Balance> + '_ {
        self.balances.values().flat_map(|assets| assets.values())
    }
}

/// Refreshes balances from every venue once per cycle
#[derive(Debug, Clone)]
pub struct BalanceTracker {
    retry: RetryPolicy,
}

impl BalanceTracker {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Query each venue in turn and publish the results as gauges
    #[instrument(skip_all, fields(venues = ctx.registry.len()))]
    pub async fn refresh(&self, ctx: &ServiceContext) -> BalanceSnapshot {
        let mut balances = Vec::new();

        for adapter in ctx.registry.iter() {
            let venue = adapter.venue_id();
            let adapter = adapter.as_ref();
            match self
                .retry
                .run("fetch_balance", move || adapter.fetch_balance())
                .await
            {
                Ok(venue_balances) => {
                    debug!(%venue, assets = venue_balances.len(), "balances refreshed");
                    balances.extend(venue_balances);
                }
                Err(e) => {
                    warn!(%venue, "balance refresh failed, venue has no balances this cycle: {}", e);
                }
            }
        }

        let snapshot = BalanceSnapshot::from_balances(balances);
        for balance in snapshot.iter() {
            ctx.metrics.record_balance(balance);
        }
        snapshot
    }
}

/// Working copy of a balance snapshot that tracks what sized trades reserve
///
/// Lets several opportunities in a cycle share a venue without being sized
/// against the same funds twice.
#[derive(Debug)]
pub struct AvailableFunds<'a> {
    snapshot: &'a BalanceSnapshot,
    reserved: HashMap<(VenueId, String), Decimal>,
}

impl<'a> AvailableFunds<'a> {
    pub fn new(snapshot: &'a BalanceSnapshot) -> Self {
        Self {
            snapshot,
            reserved: HashMap::new(),
        }
    }

    /// Free balance minus reservations, never negative
    pub fn available(&self, venue: &VenueId, asset: &str) -> Decimal {
        let reserved = self
            .reserved
            .get(&(venue.clone(), asset.to_uppercase()))
            .copied()
            .unwrap_or(Decimal::ZERO);
        (self.snapshot.free(venue, asset) - reserved).max(Decimal::ZERO)
    }

    pub fn reserve(&mut self, venue: &VenueId, asset: &str, amount: Decimal) {
        *self
            .reserved
            .entry((venue.clone(), asset.to_uppercase()))
            .or_insert(Decimal::ZERO) += amount;
    }
}
