//! 3Commas trade-manager client
//! Implements [`crate::exchange::TradeManager`].

mod client;
mod types;

pub use client::{ThreeCommasClient, THREECOMMAS_API_BASE};
pub use types::*;
