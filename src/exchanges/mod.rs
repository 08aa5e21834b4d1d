//! Venue adapters and the startup registry

pub mod auth;
pub mod binance;
pub mod coinbase;
pub mod dry_run;
pub mod registry;

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::common::errors::{ArbError, Result};
use crate::common::traits::ExchangeAdapter;
use crate::config::types::{AppConfig, VenueConfig};
use crate::engine::retry::RetryPolicy;

pub use binance::BinanceAdapter;
pub use coinbase::CoinbaseAdapter;
pub use dry_run::DryRunAdapter;
pub use registry::VenueRegistry;

/// Venue ids this build has adapters for
pub const SUPPORTED_VENUES: &[&str] = &["binance", "coinbase"];

/// Construct the adapter for a venue id
///
/// `timeout` bounds each HTTP request made by the adapter.
pub fn build_adapter(
    id: &str,
    venue: &VenueConfig,
    timeout: Duration,
) -> Result<Arc<dyn ExchangeAdapter>> {
    let credentials = venue.credentials();
    if credentials.is_none() {
        warn!(venue = id, "no API credentials, balance and order calls will fail");
    }

    let adapter: Arc<dyn ExchangeAdapter> = match id.to_lowercase().as_str() {
        "binance" => {
            let url = venue.rest_url.as_deref().unwrap_or(binance::DEFAULT_REST_URL);
            let adapter = BinanceAdapter::new(url, timeout)?;
            Arc::new(match credentials {
                Some(c) => adapter.with_credentials(c),
                None => adapter,
            })
        }
        "coinbase" => {
            let url = venue.rest_url.as_deref().unwrap_or(coinbase::DEFAULT_REST_URL);
            let adapter = CoinbaseAdapter::new(url, timeout)?;
            Arc::new(match credentials {
                Some(c) => adapter.with_credentials(c),
                None => adapter,
            })
        }
        other => {
            return Err(ArbError::Configuration(format!(
                "unsupported exchange '{}', expected one of {:?}",
                other, SUPPORTED_VENUES
            )))
        }
    };

    Ok(adapter)
}

/// Build, check and register every configured venue
///
/// Each venue must answer a ticker request for the first configured
/// symbol. Venues that cannot be built or reached are logged and left
/// out; only an empty result is an error.
pub async fn connect_venues(config: &AppConfig, retry: &RetryPolicy) -> Result<VenueRegistry> {
    let first_symbol = config
        .arbitrage
        .symbols
        .first()
        .ok_or_else(|| ArbError::Configuration("no arbitrage.symbols configured".into()))?;

    let mut adapters: Vec<Arc<dyn ExchangeAdapter>> = Vec::new();

    for id in &config.exchanges {
        let adapter = match build_adapter(id, &config.venue(id), retry.call_timeout()) {
            Ok(adapter) => adapter,
            Err(e) => {
                error!(venue = %id, "Failed to initialize exchange: {}", e);
                continue;
            }
        };

        let venue = adapter.as_ref();
        if let Err(e) = retry
            .run("fetch_ticker", move || venue.fetch_ticker(first_symbol))
            .await
        {
            error!(venue = %id, "Failed to initialize exchange: {}", e);
            continue;
        }

        info!(venue = %id, "Exchange initialized");
        adapters.push(if config.arbitrage.dry_run {
            Arc::new(DryRunAdapter::new(adapter))
        } else {
            adapter
        });
    }

    if adapters.is_empty() {
        return Err(ArbError::VenueInitialization(format!(
            "none of {:?} could be reached",
            config.exchanges
        )));
    }

    if adapters.len() < 2 {
        warn!("Only one exchange available, no cross-venue opportunities can be found");
    }

    VenueRegistry::new(adapters)
}
