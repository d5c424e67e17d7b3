//! Binance spot exchange client
//! Implements [`crate::exchange::MarketData`] and [`crate::exchange::OrderExecution`].

mod client;
mod types;

pub use client::{BinanceClient, BINANCE_API_BASE};
pub use types::*;
