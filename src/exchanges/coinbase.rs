//! Coinbase Exchange REST adapter

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::auth::CoinbaseAuthHeaders;
use crate::common::errors::{ArbError, Result};
use crate::common::traits::ExchangeAdapter;
use crate::common::types::{split_symbol, Balance, OrderReceipt, Side, TickerQuote, VenueId};
use crate::config::types::ApiCredentials;

pub const DEFAULT_REST_URL: &str = "https://api.exchange.coinbase.com";

#[derive(Debug, Deserialize)]
struct ProductTickerResponse {
    #[serde(default)]
    bid: Option<Decimal>,
    #[serde(default)]
    ask: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    currency: String,
    balance: Decimal,
    available: Decimal,
}

#[derive(Debug, Serialize)]
struct MarketOrderRequest<'a> {
    #[serde(rename = "type")]
    order_type: &'static str,
    side: &'static str,
    product_id: &'a str,
    size: String,
    client_oid: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OrderDetailResponse {
    id: String,
    side: String,
    size: Decimal,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// REST adapter for Coinbase Exchange
#[derive(Debug, Clone)]
pub struct CoinbaseAdapter {
    venue: VenueId,
    client: Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
}

impl CoinbaseAdapter {
    /// Create an unauthenticated adapter; `timeout` bounds each HTTP request
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // Requests without a User-Agent are refused
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArbError::Internal(e.to_string()))?;

        Ok(Self {
            venue: VenueId::new("coinbase"),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Set API credentials for balance and order endpoints
    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// `SOL/USDT` → `SOL-USDT`
    pub fn product_id(symbol: &str) -> Result<String> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{}-{}", base, quote).to_uppercase())
    }

    fn auth_headers(&self, method: &str, path: &str, body: &str) -> Result<CoinbaseAuthHeaders> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ArbError::Authentication("coinbase: no API credentials configured".into()))?;
        CoinbaseAuthHeaders::generate(credentials, method, path, body)
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ArbError::from_status(self.venue.as_str(), status, body))
    }
}

#[async_trait]
impl ExchangeAdapter for CoinbaseAdapter {
    fn venue_id(&self) -> &VenueId {
        &self.venue
    }

    #[instrument(skip(self))]
    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerQuote> {
        let url = format!("{}/products/{}/ticker", self.base_url, Self::product_id(symbol)?);
        debug!("Fetching product ticker from: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = self.check(response).await?;

        let ticker: ProductTickerResponse = response.json().await?;
        Ok(TickerQuote {
            symbol: symbol.to_string(),
            bid: ticker.bid,
            ask: ticker.ask,
            observed_at: Utc::now(),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_balance(&self) -> Result<Vec<Balance>> {
        let path = "/accounts";
        let auth = self.auth_headers("GET", path, "")?;
        let url = format!("{}{}", self.base_url, path);

        let response = auth.apply_to_request(self.client.get(&url)).send().await?;
        let response = self.check(response).await?;

        let accounts: Vec<AccountResponse> = response.json().await?;
        Ok(accounts
            .into_iter()
            .filter(|a| !a.balance.is_zero())
            .map(|a| Balance {
                venue: self.venue.clone(),
                asset: a.currency,
                free: a.available,
                total: a.balance,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        client_order_id: &str,
    ) -> Result<OrderReceipt> {
        let product_id = Self::product_id(symbol)?;
        let request = MarketOrderRequest {
            order_type: "market",
            side: match side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            },
            product_id: &product_id,
            size: amount.normalize().to_string(),
            client_oid: client_order_id,
        };
        let body = serde_json::to_string(&request)?;

        let path = "/orders";
        let auth = self.auth_headers("POST", path, &body)?;
        let url = format!("{}{}", self.base_url, path);

        let response = auth
            .apply_to_request(self.client.post(&url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error()
            && !matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            )
        {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(ArbError::OrderRejected {
                venue: self.venue.to_string(),
                message,
            });
        }
        let response = self.check(response).await?;

        let order: OrderResponse = response.json().await?;
        debug!(order_id = %order.id, "order accepted");
        Ok(OrderReceipt {
            order_id: order.id,
            venue: self.venue.clone(),
            symbol: symbol.to_string(),
            side,
            amount,
        })
    }

    #[instrument(skip(self))]
    async fn find_order(&self, symbol: &str, client_order_id: &str) -> Result<Option<OrderReceipt>> {
        let path = format!("/orders/client:{}", client_order_id);
        let auth = self.auth_headers("GET", &path, "")?;
        let url = format!("{}{}", self.base_url, path);

        let response = auth.apply_to_request(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.check(response).await?;

        let order: OrderDetailResponse = response.json().await?;
        let side = match order.side.as_str() {
            "buy" => Side::Buy,
            "sell" => Side::Sell,
            other => {
                return Err(ArbError::InvalidResponse(format!(
                    "coinbase: unknown order side {}",
                    other
                )))
            }
        };
        Ok(Some(OrderReceipt {
            order_id: order.id,
            venue: self.venue.clone(),
            symbol: symbol.to_string(),
            side,
            amount: order.size,
        }))
    }
}
