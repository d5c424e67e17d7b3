//! DCA Bots
//!
//! Dollar-cost-averaging and buy-the-dip bots for crypto spot markets:
//! a deal evaluator that adds manual safety orders to trade-manager deals,
//! a position tracker that accumulates and sells at a take-profit, and a
//! fixed recurring buy with a balance report.

pub mod auth;
pub mod binance;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod exchange;
pub mod indicators;
pub mod ladder;
pub mod notify;
pub mod policy;
pub mod recurring;
pub mod signal;
pub mod state_manager;
pub mod threecommas;
pub mod tracker;
pub mod types;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use types::*;
