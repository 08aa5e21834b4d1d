//! Request signing for venue REST APIs

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{ArbError, Result};
use crate::config::types::ApiCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `payload` keyed with the raw secret (Binance)
pub fn sign_hex(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ArbError::Authentication(format!("Failed to create HMAC: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Base64 HMAC-SHA256 keyed with a base64-encoded secret (Coinbase Exchange)
///
/// # Arguments
/// * `secret` - API secret, base64 encoded
/// * `timestamp` - Unix timestamp in seconds
/// * `method` - HTTP method (GET, POST, etc.)
/// * `request_path` - Path including any query string
/// * `body` - Request body (empty string for GET requests)
pub fn sign_base64(
    secret: &str,
    timestamp: i64,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<String> {
    let secret_bytes = BASE64
        .decode(secret)
        .map_err(|e| ArbError::Authentication(format!("Failed to decode secret: {}", e)))?;

    let message = format!("{}{}{}{}", timestamp, method.to_uppercase(), request_path, body);

    let mut mac = HmacSha256::new_from_slice(&secret_bytes)
        .map_err(|e| ArbError::Authentication(format!("Failed to create HMAC: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Coinbase `CB-ACCESS-*` header set for one request
#[derive(Debug, Clone)]
pub struct CoinbaseAuthHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp: i64,
    pub passphrase: String,
}

impl CoinbaseAuthHeaders {
    pub fn generate(
        credentials: &ApiCredentials,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> Result<Self> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign_base64(&credentials.api_secret, timestamp, method, request_path, body)?;

        Ok(Self {
            api_key: credentials.api_key.clone(),
            signature,
            timestamp,
            passphrase: credentials.passphrase.clone(),
        })
    }

    /// Add authentication headers to a reqwest RequestBuilder
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("CB-ACCESS-KEY", &self.api_key)
            .header("CB-ACCESS-SIGN", &self.signature)
            .header("CB-ACCESS-TIMESTAMP", self.timestamp.to_string())
            .header("CB-ACCESS-PASSPHRASE", &self.passphrase)
    }
}
