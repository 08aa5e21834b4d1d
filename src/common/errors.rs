//! Error types for the application

use thiserror::Error;

use super::types::Side;

/// Result type alias using our ArbError
pub type Result<T> = std::result::Result<T, ArbError>;

/// Main error type for venue calls and the arbitrage engine
#[derive(Error, Debug)]
pub enum ArbError {
    /// HTTP transport errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Network or server-side failure on a single call
    #[error("Transient call failure: {0}")]
    TransientCallFailure(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}, retry after {retry_after_seconds:?} seconds")]
    RateLimit {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    /// A single call exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The venue accepted the request but refused the order
    #[error("Order rejected by {venue}: {message}")]
    OrderRejected { venue: String, message: String },

    /// Retry budget consumed; carries the last underlying cause
    #[error("{operation} failed after {attempts} attempts: {source}")]
    ExhaustedRetries {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<ArbError>,
    },

    /// Ticker missing a bid or ask
    #[error("Incomplete market data for {symbol} on {venue}: {detail}")]
    IncompleteMarketData {
        venue: String,
        symbol: String,
        detail: String,
    },

    /// Sizing produced a non-positive trade amount
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// A trade leg could not be placed
    #[error("Execution failed on {leg} leg: {source}")]
    ExecutionFailure {
        leg: Side,
        #[source]
        source: Box<ArbError>,
    },

    /// Venue id not present in the registry
    #[error("Unknown venue: {0}")]
    UnknownVenue(String),

    /// Symbol not of the form BASE/QUOTE
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// No configured venue could be reached at startup
    #[error("Venue initialization failed: {0}")]
    VenueInitialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArbError {
    /// Whether another attempt of the same call could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ArbError::Http(e) => !e.is_builder() && !e.is_decode(),
            ArbError::TransientCallFailure(_) | ArbError::RateLimit { .. } | ArbError::Timeout(_) => {
                true
            }
            _ => false,
        }
    }

    /// Map a non-success HTTP status from a venue into the error taxonomy
    pub fn from_status(venue: &str, status: reqwest::StatusCode, body: String) -> Self {
        use reqwest::StatusCode;

        match status {
            StatusCode::TOO_MANY_REQUESTS => ArbError::RateLimit {
                message: format!("{}: {}", venue, body),
                retry_after_seconds: None,
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ArbError::Authentication(format!("{} returned {}: {}", venue, status, body))
            }
            s if s.is_server_error() => {
                ArbError::TransientCallFailure(format!("{} returned {}: {}", venue, status, body))
            }
            _ => ArbError::InvalidResponse(format!("{} returned {}: {}", venue, status, body)),
        }
    }
}

impl From<tokio::task::JoinError> for ArbError {
    fn from(err: tokio::task::JoinError) -> Self {
        ArbError::Internal(format!("task failed: {}", err))
    }
}
