//! Binance spot REST payloads

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::types::{Candle, MarketFill, OrderReport, OrderStatus, SymbolFilters};

/// Valid Binance intervals
pub const BINANCE_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

pub fn is_valid_interval(interval: &str) -> bool {
    BINANCE_INTERVALS.contains(&interval)
}

/// Parse one kline row into a closing-price candle
///
/// Rows are arrays: [open_time, open, high, low, close, volume, close_time, ...]
pub fn candle_from_raw(raw: &[serde_json::Value]) -> Option<Candle> {
    if raw.len() < 7 {
        return None;
    }
    let close = Decimal::from_str(raw[4].as_str()?).ok()?;
    let close_time = DateTime::<Utc>::from_timestamp_millis(raw[6].as_i64()?)?;
    Some(Candle { close_time, close })
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub price_change_percent: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub filter_type: String,
    #[serde(default)]
    pub tick_size: Option<Decimal>,
    #[serde(default)]
    pub step_size: Option<Decimal>,
}

impl SymbolInfo {
    /// PRICE_FILTER and LOT_SIZE increments, `None` if either is missing
    pub fn into_filters(self) -> Option<SymbolFilters> {
        let tick_size = self
            .filters
            .iter()
            .find(|f| f.filter_type == "PRICE_FILTER")
            .and_then(|f| f.tick_size)?;
        let step_size = self
            .filters
            .iter()
            .find(|f| f.filter_type == "LOT_SIZE")
            .and_then(|f| f.step_size)?;
        Some(SymbolFilters {
            symbol: self.symbol,
            base_asset: self.base_asset,
            quote_asset: self.quote_asset,
            tick_size,
            step_size,
        })
    }
}

/// Order placement and query response
///
/// Binance spells the quote total "cummulativeQuoteQty".
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: u64,
    pub status: String,
    #[serde(default)]
    pub executed_qty: Decimal,
    #[serde(rename = "cummulativeQuoteQty", default)]
    pub cumulative_quote_qty: Decimal,
}

impl From<OrderResponse> for MarketFill {
    fn from(r: OrderResponse) -> Self {
        MarketFill {
            order_id: r.order_id,
            executed_qty: r.executed_qty,
            cumulative_quote_qty: r.cumulative_quote_qty,
        }
    }
}

impl From<OrderResponse> for OrderReport {
    fn from(r: OrderResponse) -> Self {
        OrderReport {
            order_id: r.order_id,
            status: OrderStatus::parse(&r.status),
            executed_qty: r.executed_qty,
            cumulative_quote_qty: r.cumulative_quote_qty,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub balances: Vec<Balance>,
}

#[derive(Debug, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_candle_from_raw() {
        let row = json!([
            1499040000000i64,
            "0.01634790",
            "0.80000000",
            "0.01575800",
            "0.01577100",
            "148976.11427815",
            1499644799999i64,
            "2434.19055334",
            308,
            "1756.87402397",
            "28.46694368",
            "0"
        ]);
        let candle = candle_from_raw(row.as_array().unwrap()).unwrap();
        assert_eq!(candle.close, dec!(0.01577100));
        assert_eq!(candle.close_time.timestamp_millis(), 1499644799999);

        let short = json!([1499040000000i64, "1"]);
        assert!(candle_from_raw(short.as_array().unwrap()).is_none());
    }

    #[test]
    fn test_exchange_info_filters() {
        let body = r#"{"symbols":[{"symbol":"BTCUSDT","baseAsset":"BTC","quoteAsset":"USDT",
            "filters":[
                {"filterType":"PRICE_FILTER","minPrice":"0.01","maxPrice":"1000000","tickSize":"0.01000000"},
                {"filterType":"LOT_SIZE","minQty":"0.00001","maxQty":"9000","stepSize":"0.00001000"},
                {"filterType":"NOTIONAL","minNotional":"5"}
            ]}]}"#;
        let info: ExchangeInfo = serde_json::from_str(body).unwrap();
        let filters = info.symbols.into_iter().next().unwrap().into_filters().unwrap();
        assert_eq!(filters.base_asset, "BTC");
        assert_eq!(filters.tick_size, dec!(0.01));
        assert_eq!(filters.step_size, dec!(0.00001));
    }

    #[test]
    fn test_order_response_conversion() {
        let body = r#"{"symbol":"BTCUSDT","orderId":28,"status":"FILLED",
            "executedQty":"0.00100000","cummulativeQuoteQty":"30.00000000"}"#;
        let resp: OrderResponse = serde_json::from_str(body).unwrap();
        let report: OrderReport = resp.into();
        assert_eq!(report.order_id, 28);
        assert_eq!(report.status, OrderStatus::Filled);
        assert_eq!(report.cumulative_quote_qty, dec!(30));
    }

    #[test]
    fn test_interval_validation() {
        assert!(is_valid_interval("5m"));
        assert!(!is_valid_interval("7m"));
    }
}
