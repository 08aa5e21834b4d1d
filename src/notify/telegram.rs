//! Telegram Bot API notifier

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::common::errors::{ArbError, Result};
use crate::common::traits::Notifier;
use crate::common::types::{Notification, Severity};
use crate::config::types::TelegramConfig;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
}

/// Posts notifications to a chat through `sendMessage`
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            return Err(ArbError::Configuration(
                "notifications.telegram needs bot_token and chat_id".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ArbError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn render(notification: &Notification) -> String {
        let marker = match notification.severity {
            Severity::Info => "",
            Severity::Critical => "🚨 ",
        };
        format!("{}{}\n\n{}", marker, notification.title, notification.body)
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    #[instrument(skip_all, fields(title = %notification.title))]
    async fn send(&self, notification: &Notification) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: Self::render(notification),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ArbError::Notification(format!(
                "telegram returned status {}: {}",
                status, body
            )));
        }

        debug!("telegram notification delivered");
        Ok(())
    }
}
