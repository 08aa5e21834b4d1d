//! cross_venue_arb - Main Entry Point
//!
//! Runs the arbitrage cycle against the exchanges named in the
//! configuration until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use cross_venue_arb::config::load_config;
use cross_venue_arb::engine::{
    CycleLoop, EngineSettings, RetryPolicy, ServiceContext, NOTIFICATION_DRAIN_TIMEOUT,
};
use cross_venue_arb::exchanges::connect_venues;
use cross_venue_arb::notify::build_notifier;
use cross_venue_arb::telemetry::{init_tracing, install_prometheus, PrometheusMetrics};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(long)]
    log_level: Option<String>,

    /// Simulate orders instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut config = load_config(Some(&args.config)).context("loading configuration")?;
    if args.dry_run {
        config.arbitrage.dry_run = true;
    }

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let _log_guard = init_tracing(
        &level,
        config.logging.format,
        config.observability.log_collector.as_ref(),
    )?;

    info!("Starting cross-venue arbitrage engine");
    info!("Configuration file: {}", args.config);
    info!(
        exchanges = ?config.exchanges,
        symbols = ?config.arbitrage.symbols,
        threshold = %config.arbitrage.threshold,
        dry_run = config.arbitrage.dry_run,
        "Configuration loaded"
    );
    if config.risk_management.per_symbol {
        warn!("risk_management.per_symbol is set but not used by sizing");
    }

    if let Some(listen) = &config.observability.metrics_listen {
        install_prometheus(listen)?;
        info!("Prometheus metrics listening on {}", listen);
    }

    let retry = RetryPolicy::from_config(&config.retry);
    let registry = connect_venues(&config, &retry)
        .await
        .context("no exchange could be initialized")?;

    let ctx = ServiceContext::new(
        registry,
        build_notifier(&config.notifications),
        Arc::new(PrometheusMetrics),
    );
    let mut cycle = CycleLoop::new(ctx.clone(), EngineSettings::from_config(&config));

    if args.once {
        let outcome = cycle.run_cycle().await;
        ctx.flush_notifications(NOTIFICATION_DRAIN_TIMEOUT).await;
        let report = outcome?;
        info!(?report, "Single cycle finished");
        return Ok(());
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, finishing current cycle...");
        let _ = stop_tx.send(true);
    });

    cycle.run(stop_rx).await;

    info!("Shutdown complete");
    Ok(())
}
