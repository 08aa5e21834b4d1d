//! Binance spot REST adapter

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::form_urlencoded;

use super::auth::sign_hex;
use crate::common::errors::{ArbError, Result};
use crate::common::traits::ExchangeAdapter;
use crate::common::types::{split_symbol, Balance, OrderReceipt, Side, TickerQuote, VenueId};
use crate::config::types::ApiCredentials;

pub const DEFAULT_REST_URL: &str = "https://api.binance.com";

/// Milliseconds a signed request stays valid on the server
const RECV_WINDOW_MS: u64 = 5000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerResponse {
    #[serde(default)]
    bid_price: Option<Decimal>,
    #[serde(default)]
    ask_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: Decimal,
    locked: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryOrderResponse {
    order_id: u64,
    side: Side,
    orig_qty: Decimal,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: i64,
    msg: String,
}

/// "Order does not exist."
const ERR_NO_SUCH_ORDER: i64 = -2013;

/// REST adapter for Binance spot
#[derive(Debug, Clone)]
pub struct BinanceAdapter {
    venue: VenueId,
    client: Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
}

impl BinanceAdapter {
    /// Create an unauthenticated adapter; `timeout` bounds each HTTP request
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArbError::Internal(e.to_string()))?;

        Ok(Self {
            venue: VenueId::new("binance"),
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

    /// `SOL/USDT` → `SOLUSDT`
    pub fn market_symbol(symbol: &str) -> Result<String> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{}{}", base, quote).to_uppercase())
    }

    fn credentials(&self) -> Result<&ApiCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ArbError::Authentication("binance: no API credentials configured".into()))
    }

    /// Query string with `recvWindow`, `timestamp` and the trailing `signature`
    fn signed_query(&self, params: &[(&str, String)]) -> Result<String> {
        let credentials = self.credentials()?;

        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            query.append_pair(key, value);
        }
        query.append_pair("recvWindow", &RECV_WINDOW_MS.to_string());
        query.append_pair("timestamp", &Utc::now().timestamp_millis().to_string());
        let query = query.finish();

        let signature = sign_hex(&credentials.api_secret, &query)?;
        Ok(format!("{}&signature={}", query, signature))
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
impl ExchangeAdapter for BinanceAdapter {
    fn venue_id(&self) -> &VenueId {
        &self.venue
    }

    #[instrument(skip(self))]
    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerQuote> {
        let url = format!(
            "{}/api/v3/ticker/bookTicker?symbol={}",
            self.base_url,
            Self::market_symbol(symbol)?
        );
        debug!("Fetching book ticker from: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = self.check(response).await?;

        let ticker: BookTickerResponse = response.json().await?;
        Ok(TickerQuote {
            symbol: symbol.to_string(),
            bid: ticker.bid_price,
            ask: ticker.ask_price,
            observed_at: Utc::now(),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_balance(&self) -> Result<Vec<Balance>> {
        let query = self.signed_query(&[])?;
        let url = format!("{}/api/v3/account?{}", self.base_url, query);

        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.credentials()?.api_key)
            .send()
            .await?;
        let response = self.check(response).await?;

        let account: AccountResponse = response.json().await?;
        Ok(account
            .balances
            .into_iter()
            .filter(|b| !(b.free + b.locked).is_zero())
            .map(|b| Balance {
                venue: self.venue.clone(),
                total: b.free + b.locked,
                free: b.free,
                asset: b.asset,
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
        let query = self.signed_query(&[
            ("symbol", Self::market_symbol(symbol)?),
            ("side", side.to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", amount.normalize().to_string()),
            ("newClientOrderId", client_order_id.to_string()),
        ])?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.credentials()?.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error()
            && !matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            )
        {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.msg)
                .unwrap_or(body);
            return Err(ArbError::OrderRejected {
                venue: self.venue.to_string(),
                message,
            });
        }
        let response = self.check(response).await?;

        let order: OrderResponse = response.json().await?;
        debug!(order_id = order.order_id, "order accepted");
        Ok(OrderReceipt {
            order_id: order.order_id.to_string(),
            venue: self.venue.clone(),
            symbol: symbol.to_string(),
            side,
            amount,
        })
    }

    #[instrument(skip(self))]
    async fn find_order(&self, symbol: &str, client_order_id: &str) -> Result<Option<OrderReceipt>> {
        let query = self.signed_query(&[
            ("symbol", Self::market_symbol(symbol)?),
            ("origClientOrderId", client_order_id.to_string()),
        ])?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.credentials()?.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(e) if e.code == ERR_NO_SUCH_ORDER => Ok(None),
                _ => Err(ArbError::from_status(
                    self.venue.as_str(),
                    StatusCode::BAD_REQUEST,
                    body,
                )),
            };
        }
        let response = self.check(response).await?;

        let order: QueryOrderResponse = response.json().await?;
        Ok(Some(OrderReceipt {
            order_id: order.order_id.to_string(),
            venue: self.venue.clone(),
            symbol: symbol.to_string(),
            side: order.side,
            amount: order.orig_qty,
        }))
    }
}
