//! 3Commas REST payloads
//!
//! Deals name currencies from the bot's point of view: `from_currency` is
//! the quote (e.g. USDT) and `to_currency` the base (e.g. BTC).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ApiError;
use crate::types::{AddFundsResult, Deal, DealOrder, FillStatus, FundingQuote, OrderRole};

#[derive(Debug, Deserialize)]
pub struct RawDeal {
    pub id: u64,
    pub from_currency: String,
    pub to_currency: String,
    pub current_price: Decimal,
    pub actual_profit_percentage: Decimal,
    pub base_order_average_price: Decimal,
    #[serde(default)]
    pub completed_safety_orders_count: u32,
    #[serde(default)]
    pub max_safety_orders: u32,
    pub safety_order_step_percentage: Decimal,
    pub martingale_step_coefficient: Decimal,
    #[serde(default)]
    pub bought_amount: Decimal,
    #[serde(default)]
    pub bought_volume: Decimal,
}

impl From<RawDeal> for Deal {
    fn from(raw: RawDeal) -> Self {
        Deal {
            id: raw.id,
            base_currency: raw.to_currency,
            quote_currency: raw.from_currency,
            current_price: raw.current_price,
            actual_profit_percentage: raw.actual_profit_percentage,
            base_order_average_price: raw.base_order_average_price,
            completed_safety_orders: raw.completed_safety_orders_count,
            max_safety_orders: raw.max_safety_orders,
            safety_order_step_percentage: raw.safety_order_step_percentage,
            martingale_step_coefficient: raw.martingale_step_coefficient,
            bought_amount: raw.bought_amount,
            bought_volume: raw.bought_volume,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawMarketOrder {
    pub order_id: String,
    pub deal_order_type: String,
    pub status_string: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub average_price: Decimal,
    pub updated_at: String,
}

impl TryFrom<RawMarketOrder> for DealOrder {
    type Error = ApiError;

    fn try_from(raw: RawMarketOrder) -> Result<Self, Self::Error> {
        let updated_at = DateTime::parse_from_rfc3339(&raw.updated_at)
            .map_err(|e| ApiError::Decode(format!("updated_at {:?}: {}", raw.updated_at, e)))?
            .with_timezone(&Utc);
        Ok(DealOrder {
            order_id: raw.order_id,
            role: OrderRole::parse(&raw.deal_order_type),
            status: FillStatus::parse(&raw.status_string),
            quantity: raw.quantity,
            total: raw.total,
            average_price: raw.average_price,
            updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawFundingData {
    pub orderbook_price: Decimal,
    pub min_lot_size: Decimal,
}

impl From<RawFundingData> for FundingQuote {
    fn from(raw: RawFundingData) -> Self {
        FundingQuote {
            orderbook_price: raw.orderbook_price,
            min_lot_size: raw.min_lot_size,
        }
    }
}

/// Add-funds response; success and error bodies share this shape
#[derive(Debug, Default, Deserialize)]
pub struct RawAddFunds {
    #[serde(default, deserialize_with = "id_as_string")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub average_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl From<RawAddFunds> for AddFundsResult {
    fn from(raw: RawAddFunds) -> Self {
        AddFundsResult {
            order_id: raw.order_id,
            average_price: raw.average_price,
            quantity: raw.quantity,
            total: raw.total,
            error_description: raw.error_description.or(raw.error),
        }
    }
}

/// Order ids arrive as either strings or numbers
fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
