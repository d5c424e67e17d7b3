//! Error types shared by the exchange and trade-manager clients

use thiserror::Error;

/// Binance error code for "Order does not exist."
pub const BINANCE_NO_SUCH_ORDER: i64 = -2013;

/// Binance error code for "Unknown order sent." (cancel of a missing order)
pub const BINANCE_UNKNOWN_ORDER: i64 = -2011;

/// Errors returned by the external API clients.
///
/// `OrderNotFound` is split out because the position tracker treats it as a
/// closed take-profit order rather than a failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("order {order_id} not found for {symbol}")]
    OrderNotFound { symbol: String, order_id: u64 },

    #[error("API error ({status}) code={code:?}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("signing error: {0}")]
    Signing(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::OrderNotFound { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
