//! Prometheus export of engine metrics through the `metrics` facade

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::prelude::ToPrimitive;
use std::net::SocketAddr;
use std::time::Duration;

use crate::common::errors::{ArbError, Result};
use crate::common::traits::MetricsSink;
use crate::common::types::{Balance, TradeStatus};

/// Records engine signals; a no-op until a recorder is installed
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn record_cycle_duration(&self, duration: Duration) {
        histogram!("arb_cycle_duration_seconds", duration.as_secs_f64());
    }

    fn record_opportunities_found(&self, count: usize) {
        gauge!("arb_opportunities_found", count as f64);
    }

    fn record_balance(&self, balance: &Balance) {
        gauge!(
            "arb_balance_available",
            balance.free.to_f64().unwrap_or(0.0),
            "venue" => balance.venue.to_string(),
            "asset" => balance.asset.to_uppercase()
        );
    }

    fn record_trade(&self, status: TradeStatus) {
        counter!("arb_trades_total", 1, "status" => status.to_string());
    }
}

/// Install the Prometheus recorder with a scrape endpoint on `listen`
///
/// Must be called from within the tokio runtime.
pub fn install_prometheus(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| ArbError::Configuration(format!("observability.metrics_listen '{}': {}", listen, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ArbError::Configuration(format!("failed to install metrics exporter: {}", e)))
}
