//! Fixed recurring buy with a balance report
//!
//! Buys a fixed quote amount of one asset at market, then reports the free
//! balances of the base, quote and fee assets valued in the quote asset.
//! A failed buy still produces a report, with an `ERROR:` result line.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::exchange::{MarketData, OrderExecution};
use crate::ladder::{ceil_to_increment, round_to_increment};
use crate::notify::{notify_quietly, Notifier};
use crate::types::BuyAmount;

pub const SUBJECT_PREFIX: &str = "[dca-bots]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringConfig {
    #[serde(default = "default_base")]
    pub base_asset: String,
    #[serde(default = "default_quote")]
    pub quote_asset: String,
    #[serde(default = "default_quote_order_qty")]
    pub quote_order_qty: Decimal,
    /// Asset holding trading fees, reported alongside base and quote
    #[serde(default = "default_fee_asset")]
    pub fee_asset: Option<String>,
}

fn default_base() -> String {
    "BTC".to_string()
}

fn default_quote() -> String {
    "USDT".to_string()
}

fn default_quote_order_qty() -> Decimal {
    Decimal::TEN
}

fn default_fee_asset() -> Option<String> {
    Some("BNB".to_string())
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self {
            base_asset: default_base(),
            quote_asset: default_quote(),
            quote_order_qty: default_quote_order_qty(),
            fee_asset: default_fee_asset(),
        }
    }
}

impl RecurringConfig {
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base_asset.trim(), self.quote_asset.trim())
    }
}

/// Base quantity to buy: quote amount over price, rounded up to the lot step
pub fn buy_quantity(quote_amount: Decimal, price: Decimal, step_size: Decimal) -> Option<Decimal> {
    let raw = quote_amount.checked_div(price)?;
    let quantity = ceil_to_increment(raw, step_size);
    (quantity > Decimal::ZERO).then_some(quantity)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceLine {
    pub asset: String,
    pub amount: Decimal,
    /// Value in the quote asset
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub base_asset: String,
    pub quote_asset: String,
    pub price: Decimal,
    pub change_24h: Option<Decimal>,
    pub result: String,
    pub lines: Vec<BalanceLine>,
}

impl BalanceReport {
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|l| l.value).sum()
    }

    pub fn subject(&self) -> String {
        format!("{} {}", SUBJECT_PREFIX, self.result)
    }

    pub fn body(&self) -> String {
        let mut lines = vec![format!(
            "1 {} = {} {}",
            self.base_asset, self.price, self.quote_asset
        )];
        if let Some(change) = self.change_24h {
            lines.push(format!("24h Change: {}%", change));
        }
        lines.push(String::new());
        lines.push(self.result.clone());
        lines.push(String::new());
        lines.extend(self.lines.iter().map(|line| {
            format!(
                "{}: {} ≈ {} {}",
                line.asset, line.amount, line.value, self.quote_asset
            )
        }));
        lines.push(format!("Total balance: {} {}", self.total(), self.quote_asset));
        lines.join("\n")
    }
}

pub struct RecurringBuy {
    market: Arc<dyn MarketData>,
    execution: Arc<dyn OrderExecution>,
    notifier: Arc<dyn Notifier>,
    dry_run: bool,
}

impl RecurringBuy {
    pub fn new(
        market: Arc<dyn MarketData>,
        execution: Arc<dyn OrderExecution>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            market,
            execution,
            notifier,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self, config: &RecurringConfig) -> Result<BalanceReport> {
        let symbol = config.symbol();
        let (price, filters, change_24h) = tokio::try_join!(
            self.market.price(&symbol),
            self.market.symbol_filters(&symbol),
            self.market.price_change_24h(&symbol),
        )
        .with_context(|| format!("Failed to fetch market data for {}", symbol))?;

        let result = match buy_quantity(config.quote_order_qty, price, filters.step_size) {
            None => format!("ERROR: {} {} buys no {}", config.quote_order_qty, config.quote_asset, config.base_asset),
            Some(quantity) if self.dry_run => format!(
                "DRY RUN: Would buy {} {} at {} {}",
                quantity, config.base_asset, price, config.quote_asset
            ),
            Some(quantity) => match self.execution.market_buy(&symbol, BuyAmount::Base(quantity)).await {
                Ok(fill) => format!(
                    "SUCCESS: Bought {} {} with {} {}",
                    fill.executed_qty, config.base_asset, fill.cumulative_quote_qty, config.quote_asset
                ),
                Err(e) => {
                    error!(symbol = %symbol, "Recurring buy failed: {}", e);
                    format!("ERROR: {}", e)
                }
            },
        };
        info!(symbol = %symbol, "{}", result);

        let balances = self
            .execution
            .free_balances()
            .await
            .context("Failed to fetch balances")?;
        let free = |asset: &str| balances.get(asset).copied().unwrap_or(Decimal::ZERO);
        let value = |amount: Decimal, unit_price: Decimal| {
            round_to_increment(amount * unit_price, filters.tick_size)
        };

        let base_amount = free(&config.base_asset);
        let quote_amount = free(&config.quote_asset);
        let mut lines = vec![
            BalanceLine {
                asset: config.base_asset.clone(),
                amount: base_amount,
                value: value(base_amount, price),
            },
            BalanceLine {
                asset: config.quote_asset.clone(),
                amount: quote_amount,
                value: quote_amount,
            },
        ];

        if let Some(fee_asset) = config
            .fee_asset
            .as_ref()
            .filter(|a| **a != config.base_asset && **a != config.quote_asset)
        {
            let fee_symbol = format!("{}{}", fee_asset, config.quote_asset);
            let fee_price = match self.market.price(&fee_symbol).await {
                Ok(p) => p,
                Err(e) => {
                    warn!("No price for {}, valuing {} at zero: {}", fee_symbol, fee_asset, e);
                    Decimal::ZERO
                }
            };
            let amount = free(fee_asset);
            lines.push(BalanceLine {
                asset: fee_asset.clone(),
                amount,
                value: value(amount, fee_price),
            });
        }

        let report = BalanceReport {
            base_asset: config.base_asset.clone(),
            quote_asset: config.quote_asset.clone(),
            price,
            change_24h,
            result,
            lines,
        };

        info!("{}", report.body());
        notify_quietly(self.notifier.as_ref(), &report.subject(), &report.body()).await;
        Ok(report)
    }
}
