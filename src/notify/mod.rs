//! Trade notification transports

pub mod telegram;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::common::errors::{ArbError, Result};
use crate::common::traits::Notifier;
use crate::common::types::{Notification, Severity};
use crate::config::types::NotificationConfig;

pub use telegram::TelegramNotifier;

/// Writes notifications to the log; always available
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        match notification.severity {
            Severity::Info => info!(title = %notification.title, "{}", notification.body),
            Severity::Critical => error!(title = %notification.title, "{}", notification.body),
        }
        Ok(())
    }
}

/// Delivers to every inner notifier
///
/// One failing transport does not stop delivery to the rest; the first
/// error is returned after all have been tried.
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let mut first_error: Option<ArbError> = None;

        for notifier in &self.notifiers {
            if let Err(e) = notifier.send(notification).await {
                warn!(notifier = notifier.name(), "delivery failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Build the notifier set from configuration
///
/// The log notifier is always included. Telegram is added when enabled
/// and complete. Email has no transport in this build and is skipped with
/// a warning.
pub fn build_notifier(config: &NotificationConfig) -> Arc<dyn Notifier> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];

    if config.telegram.enabled {
        match TelegramNotifier::new(&config.telegram) {
            Ok(telegram) => {
                info!("Telegram notifications enabled");
                notifiers.push(Arc::new(telegram));
            }
            Err(e) => warn!("Telegram notifications disabled: {}", e),
        }
    }

    if config.email.enabled {
        warn!(
            smtp_host = %config.email.smtp_host,
            "Email notifications are configured but not supported, ignoring"
        );
    }

    Arc::new(FanoutNotifier::new(notifiers))
}
