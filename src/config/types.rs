//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::common::errors::{ArbError, Result};
use crate::common::types::split_symbol;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Venue identifiers to trade on, in scan order
    pub exchanges: Vec<String>,
    /// Per-venue credentials and endpoint overrides, keyed by venue id
    #[serde(default)]
    pub venues: HashMap<String, VenueConfig>,
    /// Scanning and trade parameters
    pub arbitrage: ArbitrageConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub risk_management: RiskConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.exchanges.is_empty() {
            return Err(ArbError::Configuration("no exchanges configured".into()));
        }
        if self.arbitrage.symbols.is_empty() {
            return Err(ArbError::Configuration("no arbitrage.symbols configured".into()));
        }
        for symbol in &self.arbitrage.symbols {
            split_symbol(symbol).map_err(|e| ArbError::Configuration(e.to_string()))?;
        }
        if self.arbitrage.threshold < Decimal::ZERO {
            return Err(ArbError::Configuration("arbitrage.threshold must be >= 0".into()));
        }
        if self.arbitrage.trade_amount <= Decimal::ZERO {
            return Err(ArbError::Configuration("arbitrage.trade_amount must be > 0".into()));
        }
        if self.fees.taker_fee < Decimal::ZERO {
            return Err(ArbError::Configuration("fees.taker_fee must be >= 0".into()));
        }
        let risk = self.risk_management.max_risk_percentage;
        if risk <= Decimal::ZERO || risk > dec!(100) {
            return Err(ArbError::Configuration(
                "risk_management.max_risk_percentage must be in (0, 100]".into(),
            ));
        }
        if !self.retry.call_timeout.is_finite() || self.retry.call_timeout <= 0.0 {
            return Err(ArbError::Configuration(
                "retry.call_timeout must be a finite number > 0".into(),
            ));
        }
        if !self.retry.delay.is_finite() || self.retry.delay < 0.0 {
            return Err(ArbError::Configuration(
                "retry.delay must be a finite number >= 0".into(),
            ));
        }
        Ok(())
    }

    /// Config for a venue, falling back to defaults when none is given
    ///
    /// Ids match case-insensitively, the same way adapters are selected.
    pub fn venue(&self, id: &str) -> VenueConfig {
        self.venues
            .get(id)
            .or_else(|| {
                self.venues
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(id))
                    .map(|(_, venue)| venue)
            })
            .cloned()
            .unwrap_or_default()
    }
}

/// Credentials and endpoint override for one venue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Required by Coinbase
    #[serde(default)]
    pub passphrase: Option<String>,
    /// Overrides the venue's default REST base URL
    #[serde(default)]
    pub rest_url: Option<String>,
}

impl VenueConfig {
    /// Credentials are only usable when both key and secret are present
    pub fn credentials(&self) -> Option<ApiCredentials> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(ApiCredentials::new(
                    key.clone(),
                    secret.clone(),
                    self.passphrase.clone().unwrap_or_default(),
                ))
            }
            _ => None,
        }
    }
}

/// Scanning and trade parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    /// Trading pairs in `BASE/QUOTE` form, in scan order
    pub symbols: Vec<String>,
    /// Minimum net profit percentage to act on
    #[serde(default = "default_threshold")]
    pub threshold: Decimal,
    /// Absolute cap on base-asset amount per trade
    #[serde(default = "default_trade_amount")]
    pub trade_amount: Decimal,
    /// Pause between cycles in seconds
    #[serde(default = "default_cycle_delay")]
    pub cycle_delay: u64,
    /// Simulate orders instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

impl ArbitrageConfig {
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay)
    }
}

fn default_threshold() -> Decimal {
    dec!(0.5)
}

fn default_trade_amount() -> Decimal {
    dec!(1)
}

fn default_cycle_delay() -> u64 {
    5
}

/// Fee schedule applied to both legs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Taker fee percentage charged per leg
    #[serde(default = "default_taker_fee")]
    pub taker_fee: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            taker_fee: default_taker_fee(),
        }
    }
}

fn default_taker_fee() -> Decimal {
    dec!(0.1)
}

/// Position sizing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Share of the buy venue's quote balance risked per trade, in percent
    #[serde(default = "default_max_risk")]
    pub max_risk_percentage: Decimal,
    /// Reserved for per-symbol exposure caps; not consumed by sizing
    #[serde(default)]
    pub per_symbol: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_percentage: default_max_risk(),
            per_symbol: false,
        }
    }
}

fn default_max_risk() -> Decimal {
    dec!(1)
}

/// Retry budget for venue calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff base in seconds; attempt `n` waits `delay * n`
    #[serde(default = "default_retry_delay")]
    pub delay: f64,
    /// Deadline for a single attempt in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout: f64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay.max(0.0))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.call_timeout.max(0.001))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay: default_retry_delay(),
            call_timeout: default_call_timeout(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_call_timeout() -> f64 {
    5.0
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Notification transports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default)]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recipient: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    /// Overrides the Bot API base URL
    #[serde(default = "default_telegram_url")]
    pub api_url: String,
}

fn default_telegram_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Metrics and log shipping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// JSON log lines are streamed here over TCP when set
    #[serde(default)]
    pub log_collector: Option<LogCollectorConfig>,
    /// `ip:port` for the Prometheus scrape endpoint
    #[serde(default)]
    pub metrics_listen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogCollectorConfig {
    pub host: String,
    pub port: u16,
}

/// API credentials for authenticated requests
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, api_secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            api_secret,
            passphrase,
        }
    }
}
