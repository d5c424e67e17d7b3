//! 3Commas REST client
//!
//! Every request is signed: HMAC-SHA256 over the path (including
//! `/public/api`) plus query string, sent as the `Signature` header next to
//! `APIKEY`. Parameters always travel in the query string, POSTs included.

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::debug;

use super::types::{RawAddFunds, RawDeal, RawFundingData, RawMarketOrder};
use crate::auth::{encode_query, Credentials};
use crate::error::{ApiError, ApiResult};
use crate::exchange::TradeManager;
use crate::types::{AddFundsResult, Deal, DealOrder, FundingQuote};

pub const THREECOMMAS_API_BASE: &str = "https://api.3commas.io";

const API_PREFIX: &str = "/public/api/ver1";

#[derive(Debug, Clone)]
pub struct ThreeCommasClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ThreeCommasClient {
    pub fn new(credentials: Credentials) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: THREECOMMAS_API_BASE.to_string(),
            credentials,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Path and query that get signed and sent
    fn signed_target(path: &str, params: &[(&str, String)]) -> String {
        let full = format!("{}{}", API_PREFIX, path);
        if params.is_empty() {
            full
        } else {
            format!("{}?{}", full, encode_query(params))
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> ApiResult<(reqwest::StatusCode, String)> {
        let target = Self::signed_target(path, params);
        let signature = self.credentials.sign(&target)?;
        debug!("{} {}", method, target);

        let response: Response = self
            .client
            .request(method, format!("{}{}", self.base_url, target))
            .header("APIKEY", self.credentials.api_key())
            .header("Signature", signature)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> ApiResult<T> {
        let (status, body) = self.send(method, path, params).await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn api_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.error_description.or(e.error))
        .unwrap_or_else(|| body.to_string());
    ApiError::Api {
        status,
        code: None,
        message,
    }
}

#[async_trait]
impl TradeManager for ThreeCommasClient {
    async fn active_deals(&self) -> ApiResult<Vec<Deal>> {
        let raw: Vec<RawDeal> = self
            .request(Method::GET, "/deals", &[("scope", "active".to_string())])
            .await?;
        Ok(raw.into_iter().map(Deal::from).collect())
    }

    async fn deal_orders(&self, deal_id: u64) -> ApiResult<Vec<DealOrder>> {
        let raw: Vec<RawMarketOrder> = self
            .request(
                Method::GET,
                &format!("/deals/{}/market_orders", deal_id),
                &[("deal_id", deal_id.to_string())],
            )
            .await?;
        raw.into_iter().map(DealOrder::try_from).collect()
    }

    async fn funding_quote(&self, deal_id: u64) -> ApiResult<FundingQuote> {
        let raw: RawFundingData = self
            .request(
                Method::GET,
                &format!("/deals/{}/data_for_adding_funds", deal_id),
                &[("deal_id", deal_id.to_string())],
            )
            .await?;
        Ok(raw.into())
    }

    async fn add_funds(&self, deal_id: u64, quantity: Decimal) -> ApiResult<AddFundsResult> {
        let params = [
            ("quantity", quantity.normalize().to_string()),
            ("is_market", "true".to_string()),
            ("response_type", "market_order".to_string()),
            ("deal_id", deal_id.to_string()),
        ];
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/deals/{}/add_funds", deal_id),
                &params,
            )
            .await?;

        // Rejections carry error/error_description and are reported, not raised
        match serde_json::from_str::<RawAddFunds>(&body) {
            Ok(raw) if status.is_success() || raw.error.is_some() || raw.error_description.is_some() => {
                Ok(raw.into())
            }
            _ if status.is_success() => Err(ApiError::Decode(format!(
                "unexpected add_funds response: {}",
                body
            ))),
            _ => Err(api_error(status.as_u16(), &body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_target_includes_prefix_and_query() {
        assert_eq!(
            ThreeCommasClient::signed_target("/deals", &[("scope", "active".to_string())]),
            "/public/api/ver1/deals?scope=active"
        );
        assert_eq!(
            ThreeCommasClient::signed_target("/deals/7/market_orders", &[]),
            "/public/api/ver1/deals/7/market_orders"
        );
    }

    #[test]
    fn test_api_error_prefers_description() {
        let err = api_error(401, r#"{"error":"signature_invalid","error_description":"Provided signature is invalid"}"#);
        assert_eq!(
            err.to_string(),
            "API error (401) code=None: Provided signature is invalid"
        );
        let err = api_error(502, "Bad Gateway");
        assert!(err.to_string().ends_with("Bad Gateway"));
    }
}
