//! Exchange collaborator interfaces
//!
//! The bots only talk to venues through these traits. [`crate::binance`]
//! implements the exchange side and [`crate::threecommas`] the trade manager.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::ApiResult;
use crate::types::{
    AddFundsResult, BuyAmount, Candle, Deal, DealOrder, FundingQuote, MarketFill, OrderReport,
    SymbolFilters,
};

/// Read-only market data
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Candles for `symbol` at `interval`, oldest first
    async fn candles(&self, symbol: &str, interval: &str) -> ApiResult<Vec<Candle>>;

    /// Latest traded price
    async fn price(&self, symbol: &str) -> ApiResult<Decimal>;

    /// Price and lot increments for `symbol`
    async fn symbol_filters(&self, symbol: &str) -> ApiResult<SymbolFilters>;

    /// 24h price change in percent, if the venue reports it
    async fn price_change_24h(&self, _symbol: &str) -> ApiResult<Option<Decimal>> {
        Ok(None)
    }
}

/// Order placement and account queries
#[async_trait]
pub trait OrderExecution: Send + Sync {
    async fn market_buy(&self, symbol: &str, amount: BuyAmount) -> ApiResult<MarketFill>;

    /// Place a GTC limit sell, returning the order id
    async fn limit_sell(&self, symbol: &str, price: Decimal, quantity: Decimal) -> ApiResult<u64>;

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> ApiResult<()>;

    /// Fails with [`crate::error::ApiError::OrderNotFound`] when the venue
    /// no longer knows the order
    async fn order(&self, symbol: &str, order_id: u64) -> ApiResult<OrderReport>;

    /// Free balance per asset
    async fn free_balances(&self) -> ApiResult<HashMap<String, Decimal>>;
}

/// Trade-manager deals and manual safety orders
#[async_trait]
pub trait TradeManager: Send + Sync {
    async fn active_deals(&self) -> ApiResult<Vec<Deal>>;

    /// Order history of one deal, in venue order
    async fn deal_orders(&self, deal_id: u64) -> ApiResult<Vec<DealOrder>>;

    /// Order book price and lot size for a manual safety order
    async fn funding_quote(&self, deal_id: u64) -> ApiResult<FundingQuote>;

    /// Request a market buy of `quantity` base units for the deal
    ///
    /// A venue-side rejection comes back as `Ok` with no order id so the
    /// caller can report its description.
    async fn add_funds(&self, deal_id: u64, quantity: Decimal) -> ApiResult<AddFundsResult>;
}
