//! Binance spot REST client
//!
//! Public market data needs no key. Order and account endpoints are signed
//! with the query-string HMAC and the `X-MBX-APIKEY` header.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration as StdDuration;
use tracing::debug;

use super::types::{
    candle_from_raw, Account, ErrorBody, ExchangeInfo, OrderResponse, Ticker24h, TickerPrice,
};
use crate::auth::{encode_query, Credentials};
use crate::error::{ApiError, ApiResult, BINANCE_NO_SUCH_ORDER, BINANCE_UNKNOWN_ORDER};
use crate::exchange::{MarketData, OrderExecution};
use crate::types::{BuyAmount, Candle, MarketFill, OrderReport, SymbolFilters};

/// Base URL for Binance spot API
pub const BINANCE_API_BASE: &str = "https://api.binance.com";

/// Candles fetched per signal evaluation
const DEFAULT_CANDLE_LIMIT: u32 = 500;

const RECV_WINDOW_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    candle_limit: u32,
}

impl BinanceClient {
    pub fn new(credentials: Option<Credentials>) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;

        Ok(BinanceClient {
            client,
            base_url: BINANCE_API_BASE.to_string(),
            credentials,
            candle_limit: DEFAULT_CANDLE_LIMIT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_candle_limit(mut self, limit: u32) -> Self {
        self.candle_limit = limit.clamp(1, 1000);
        self
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", path, params);
        let response = self.client.get(&url).query(params).send().await?;
        decode(response).await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> ApiResult<T> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ApiError::Signing("Binance API credentials not configured".into()))?;

        params.push(("recvWindow", RECV_WINDOW_MS.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        let query = encode_query(&params);
        let signature = credentials.sign(&query)?;
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        debug!("{} {} {}", method, path, query);
        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", credentials.api_key())
            .send()
            .await?;
        decode(response).await
    }
}

/// Decode a success body, or turn an error body into [`ApiError::Api`]
async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => (Some(err.code), err.msg),
            Err(_) => (None, body),
        };
        return Err(ApiError::Api {
            status: status.as_u16(),
            code,
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn candles(&self, symbol: &str, interval: &str) -> ApiResult<Vec<Candle>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", self.candle_limit.to_string()),
        ];
        let raw: Vec<Vec<serde_json::Value>> = self.public_get("/api/v3/klines", &params).await?;
        Ok(raw.iter().filter_map(|row| candle_from_raw(row)).collect())
    }

    async fn price(&self, symbol: &str) -> ApiResult<Decimal> {
        let ticker: TickerPrice = self
            .public_get("/api/v3/ticker/price", &[("symbol", symbol.to_string())])
            .await?;
        Ok(ticker.price)
    }

    async fn symbol_filters(&self, symbol: &str) -> ApiResult<SymbolFilters> {
        let info: ExchangeInfo = self
            .public_get("/api/v3/exchangeInfo", &[("symbol", symbol.to_string())])
            .await?;
        info.symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .and_then(|s| s.into_filters())
            .ok_or_else(|| ApiError::Decode(format!("no PRICE_FILTER/LOT_SIZE for {}", symbol)))
    }

    async fn price_change_24h(&self, symbol: &str) -> ApiResult<Option<Decimal>> {
        let ticker: Ticker24h = self
            .public_get("/api/v3/ticker/24hr", &[("symbol", symbol.to_string())])
            .await?;
        Ok(Some(ticker.price_change_percent))
    }
}

#[async_trait]
impl OrderExecution for BinanceClient {
    async fn market_buy(&self, symbol: &str, amount: BuyAmount) -> ApiResult<MarketFill> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("side", "BUY".to_string()),
            ("type", "MARKET".to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ];
        match amount {
            BuyAmount::Quote(q) => params.push(("quoteOrderQty", q.normalize().to_string())),
            BuyAmount::Base(q) => params.push(("quantity", q.normalize().to_string())),
        }
        let resp: OrderResponse = self.signed(Method::POST, "/api/v3/order", params).await?;
        Ok(resp.into())
    }

    async fn limit_sell(&self, symbol: &str, price: Decimal, quantity: Decimal) -> ApiResult<u64> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("side", "SELL".to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("price", price.normalize().to_string()),
        ];
        let resp: OrderResponse = self.signed(Method::POST, "/api/v3/order", params).await?;
        Ok(resp.order_id)
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> ApiResult<()> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        match self
            .signed::<serde_json::Value>(Method::DELETE, "/api/v3/order", params)
            .await
        {
            Ok(_) => Ok(()),
            Err(ApiError::Api {
                code: Some(BINANCE_UNKNOWN_ORDER),
                ..
            }) => Err(ApiError::OrderNotFound {
                symbol: symbol.to_string(),
                order_id,
            }),
            Err(e) => Err(e),
        }
    }

    async fn order(&self, symbol: &str, order_id: u64) -> ApiResult<OrderReport> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        match self
            .signed::<OrderResponse>(Method::GET, "/api/v3/order", params)
            .await
        {
            Ok(resp) => Ok(resp.into()),
            Err(ApiError::Api {
                code: Some(BINANCE_NO_SUCH_ORDER),
                ..
            }) => Err(ApiError::OrderNotFound {
                symbol: symbol.to_string(),
                order_id,
            }),
            Err(e) => Err(e),
        }
    }

    async fn free_balances(&self) -> ApiResult<HashMap<String, Decimal>> {
        let account: Account = self.signed(Method::GET, "/api/v3/account", Vec::new()).await?;
        Ok(account
            .balances
            .into_iter()
            .filter(|b| !b.free.is_zero())
            .map(|b| (b.asset, b.free))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_request_requires_credentials() {
        let client = BinanceClient::new(None).unwrap();
        let err = client.free_balances().await.unwrap_err();
        assert!(matches!(err, ApiError::Signing(_)));
    }

    #[test]
    fn test_candle_limit_is_clamped() {
        let client = BinanceClient::new(None).unwrap().with_candle_limit(5000);
        assert_eq!(client.candle_limit, 1000);
    }
}
