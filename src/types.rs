//! Core data types used across the bots

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base URL for linking deals in log lines
pub const DEAL_URL_BASE: &str = "https://3commas.io/deals";

// =============================================================================
// Market data
// =============================================================================

/// Closing price of a fixed-interval candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub close_time: DateTime<Utc>,
    pub close: Decimal,
}

/// Venue increments for a trading pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolFilters {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Minimum price increment (PRICE_FILTER tickSize)
    pub tick_size: Decimal,
    /// Minimum quantity increment (LOT_SIZE stepSize)
    pub step_size: Decimal,
}

// =============================================================================
// Exchange orders
// =============================================================================

/// Size of a market buy, either spent quote or received base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyAmount {
    Quote(Decimal),
    Base(Decimal),
}

impl fmt::Display for BuyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuyAmount::Quote(q) => write!(f, "{} quote", q),
            BuyAmount::Base(q) => write!(f, "{} base", q),
        }
    }
}

/// Result of an executed market order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFill {
    pub order_id: u64,
    pub executed_qty: Decimal,
    pub cumulative_quote_qty: Decimal,
}

/// Exchange order status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    Other(String),
}

impl OrderStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "NEW" => Self::New,
            "PARTIALLY_FILLED" => Self::PartiallyFilled,
            "FILLED" => Self::Filled,
            "CANCELED" => Self::Canceled,
            "REJECTED" => Self::Rejected,
            "EXPIRED" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }

    /// Still resting on the book
    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
            Self::Other(s) => s.as_str(),
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of a previously placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub order_id: u64,
    pub status: OrderStatus,
    pub executed_qty: Decimal,
    pub cumulative_quote_qty: Decimal,
}

// =============================================================================
// Trade manager deals
// =============================================================================

/// An open position managed by the trade manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: u64,
    /// Asset being accumulated (e.g. BTC)
    pub base_currency: String,
    /// Asset spent (e.g. USDT)
    pub quote_currency: String,
    pub current_price: Decimal,
    pub actual_profit_percentage: Decimal,
    pub base_order_average_price: Decimal,
    pub completed_safety_orders: u32,
    pub max_safety_orders: u32,
    pub safety_order_step_percentage: Decimal,
    pub martingale_step_coefficient: Decimal,
    /// Base units bought so far
    pub bought_amount: Decimal,
    /// Quote units spent so far
    pub bought_volume: Decimal,
}

impl Deal {
    /// Exchange symbol, base code followed by quote code
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base_currency, self.quote_currency)
    }

    pub fn url(&self) -> String {
        format!("{}/{}", DEAL_URL_BASE, self.id)
    }

    pub fn has_safety_capacity(&self) -> bool {
        self.completed_safety_orders < self.max_safety_orders
    }
}

/// Role of an order within a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderRole {
    Base,
    Safety,
    ManualSafety,
    TakeProfit,
    Other,
}

impl OrderRole {
    pub fn parse(role: &str) -> Self {
        match role {
            "Base" => Self::Base,
            "Safety" => Self::Safety,
            "Manual Safety" => Self::ManualSafety,
            "Take Profit" => Self::TakeProfit,
            _ => Self::Other,
        }
    }

    /// Roles that add to the position
    pub fn is_buy(self) -> bool {
        matches!(self, Self::Base | Self::Safety | Self::ManualSafety)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillStatus {
    Filled,
    Active,
    Cancelled,
    Other,
}

impl FillStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "Filled" => Self::Filled,
            "Active" => Self::Active,
            "Cancelled" | "Canceled" => Self::Cancelled,
            _ => Self::Other,
        }
    }
}

/// Fill record from a deal's order history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealOrder {
    pub order_id: String,
    pub role: OrderRole,
    pub status: FillStatus,
    pub quantity: Decimal,
    pub total: Decimal,
    pub average_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl DealOrder {
    /// A filled base, safety or manual safety order
    pub fn is_qualifying_fill(&self) -> bool {
        self.role.is_buy() && self.status == FillStatus::Filled
    }
}

/// Order book price and lot size used when adding funds to a deal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingQuote {
    pub orderbook_price: Decimal,
    pub min_lot_size: Decimal,
}

/// Response to an add-funds request. A missing `order_id` means rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddFundsResult {
    pub order_id: Option<String>,
    pub average_price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub total: Option<Decimal>,
    pub error_description: Option<String>,
}

impl AddFundsResult {
    pub fn is_accepted(&self) -> bool {
        self.order_id.is_some()
    }
}

// =============================================================================
// Position tracking
// =============================================================================

/// Persisted accumulation state for one exchange symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub symbol: String,
    pub executed_qty: Decimal,
    pub cumulative_quote_qty: Decimal,
    pub num_orders: u32,
    pub take_profit_order_id: Option<u64>,
}

/// Lifecycle of a tracked position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Empty,
    Accumulating,
    TakeProfitOpen,
}

impl PositionRecord {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            executed_qty: Decimal::ZERO,
            cumulative_quote_qty: Decimal::ZERO,
            num_orders: 0,
            take_profit_order_id: None,
        }
    }

    pub fn state(&self) -> PositionState {
        if self.take_profit_order_id.is_some() {
            PositionState::TakeProfitOpen
        } else if self.num_orders > 0 {
            PositionState::Accumulating
        } else {
            PositionState::Empty
        }
    }

    /// Average cost per base unit, `None` while nothing is held
    pub fn average_price(&self) -> Option<Decimal> {
        if self.executed_qty.is_zero() {
            None
        } else {
            self.cumulative_quote_qty.checked_div(self.executed_qty)
        }
    }

    /// Add an executed market buy to the running totals
    pub fn record_fill(&mut self, fill: &MarketFill) {
        self.num_orders += 1;
        self.executed_qty += fill.executed_qty;
        self.cumulative_quote_qty += fill.cumulative_quote_qty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deal_symbol_and_url() {
        let deal = Deal {
            id: 42,
            base_currency: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            current_price: dec!(100),
            actual_profit_percentage: dec!(-1),
            base_order_average_price: dec!(110),
            completed_safety_orders: 2,
            max_safety_orders: 2,
            safety_order_step_percentage: dec!(1),
            martingale_step_coefficient: dec!(1),
            bought_amount: dec!(1),
            bought_volume: dec!(110),
        };
        assert_eq!(deal.symbol(), "BTCUSDT");
        assert_eq!(deal.url(), "https://3commas.io/deals/42");
        assert!(!deal.has_safety_capacity());
    }

    #[test]
    fn test_order_role_parsing() {
        assert_eq!(OrderRole::parse("Manual Safety"), OrderRole::ManualSafety);
        assert_eq!(OrderRole::parse("Take Profit"), OrderRole::TakeProfit);
        assert!(!OrderRole::parse("Take Profit").is_buy());
        assert_eq!(OrderRole::parse("Stop Loss"), OrderRole::Other);
    }

    #[test]
    fn test_order_status_parsing() {
        assert_eq!(OrderStatus::parse("FILLED"), OrderStatus::Filled);
        assert!(OrderStatus::parse("PARTIALLY_FILLED").is_open());
        assert!(!OrderStatus::parse("CANCELED").is_open());
        assert_eq!(
            OrderStatus::parse("PENDING_CANCEL"),
            OrderStatus::Other("PENDING_CANCEL".to_string())
        );
    }

    #[test]
    fn test_position_record_lifecycle() {
        let mut record = PositionRecord::empty("BTCUSDT");
        assert_eq!(record.state(), PositionState::Empty);
        assert_eq!(record.average_price(), None);

        record.record_fill(&MarketFill {
            order_id: 1,
            executed_qty: dec!(2),
            cumulative_quote_qty: dec!(30),
        });
        assert_eq!(record.state(), PositionState::Accumulating);
        assert_eq!(record.average_price(), Some(dec!(15)));

        record.take_profit_order_id = Some(7);
        assert_eq!(record.state(), PositionState::TakeProfitOpen);
    }
}
