//! DCA position tracker
//!
//! Per symbol: accumulate with market buys of a fixed quote amount and keep
//! one take-profit limit sell at average cost plus a margin. When the
//! take-profit closes, report the realized profit and start over.
//!
//! ```text
//! Empty -> Accumulating -> TakeProfitOpen -> (Empty | Accumulating)
//! ```
//!
//! Planning ([`plan_cycle`], [`take_profit_order`]) is pure; [`PositionTracker`]
//! does the I/O around it.

use anyhow::{Context, Result};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::exchange::{MarketData, OrderExecution};
use crate::ladder::{floor_to_increment, round_to_increment};
use crate::notify::{notify_quietly, Notifier};
use crate::state_manager::PositionStore;
use crate::types::{
    BuyAmount, MarketFill, OrderReport, OrderStatus, PositionRecord, SymbolFilters,
};

pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-symbol settings, keyed by exchange symbol in the DCA map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSettings {
    /// Quote amount spent per market buy
    pub quote_order_qty: Decimal,
    /// Take-profit margin over average cost, in percent
    pub take_profit: Decimal,
    /// Buys at the base amount before martingale sizing kicks in
    pub accumulation_orders: u32,
    #[serde(default = "default_martingale")]
    pub martingale: Decimal,
    /// Stop starting new cycles; open take-profits are left alone
    #[serde(default)]
    pub interrupt: bool,
}

fn default_martingale() -> Decimal {
    Decimal::ONE
}

pub type SymbolMap = BTreeMap<String, SymbolSettings>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CyclePlan {
    Buy {
        quote_amount: Decimal,
        martingale_applied: bool,
    },
    /// Accumulation cap reached and price is not below average cost
    Hold {
        average_price: Decimal,
        price: Decimal,
    },
}

/// Decide the next buy from the record and current price
pub fn plan_cycle(
    record: &PositionRecord,
    settings: &SymbolSettings,
    price: Decimal,
    tick_size: Decimal,
) -> CyclePlan {
    if record.num_orders >= settings.accumulation_orders {
        if let Some(average) = record.average_price() {
            let average_price = round_to_increment(average, tick_size);
            if average_price > price {
                return CyclePlan::Buy {
                    quote_amount: round_to_increment(
                        settings.quote_order_qty * settings.martingale,
                        tick_size,
                    ),
                    martingale_applied: true,
                };
            }
            return CyclePlan::Hold {
                average_price,
                price,
            };
        }
    }
    CyclePlan::Buy {
        quote_amount: settings.quote_order_qty,
        martingale_applied: false,
    }
}

/// Limit sell covering the accumulated position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeProfitOrder {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Target price rounds to the tick; quantity floors to the lot step so the
/// order never exceeds what was bought
pub fn take_profit_order(
    record: &PositionRecord,
    take_profit: Decimal,
    filters: &SymbolFilters,
) -> Option<TakeProfitOrder> {
    let average = record.average_price()?;
    let factor = Decimal::ONE + take_profit / Decimal::ONE_HUNDRED;
    let price = round_to_increment(average * factor, filters.tick_size);
    let quantity = floor_to_increment(record.executed_qty, filters.step_size);
    if price <= Decimal::ZERO || quantity <= Decimal::ZERO {
        return None;
    }
    Some(TakeProfitOrder { price, quantity })
}

/// Realized profit of a closed take-profit against the position's cost
pub fn realized_profit(record: &PositionRecord, report: &OrderReport) -> Decimal {
    report.cumulative_quote_qty - record.cumulative_quote_qty
}

fn is_closed(status: &OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Interrupt set and nothing left open
    Interrupted,
    Held {
        average_price: Decimal,
        price: Decimal,
    },
    TakeProfitPlaced {
        fill: MarketFill,
        take_profit: TakeProfitOrder,
        order_id: u64,
    },
    DryRun {
        quote_amount: Decimal,
    },
    Skipped(String),
    Failed(String),
    TimedOut,
}

pub struct PositionTracker {
    market: Arc<dyn MarketData>,
    execution: Arc<dyn OrderExecution>,
    store: Arc<dyn PositionStore>,
    notifier: Arc<dyn Notifier>,
    unit_timeout: Duration,
    dry_run: bool,
}

impl PositionTracker {
    pub fn new(
        market: Arc<dyn MarketData>,
        execution: Arc<dyn OrderExecution>,
        store: Arc<dyn PositionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            market,
            execution,
            store,
            notifier,
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
            dry_run: false,
        }
    }

    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one cycle for every symbol concurrently
    pub async fn run(&self, symbols: &SymbolMap) -> Vec<(String, CycleOutcome)> {
        if symbols.is_empty() {
            info!("No symbols configured, nothing to do");
            return Vec::new();
        }

        info!("Running DCA cycle for {} symbols", symbols.len());
        let units = symbols.iter().map(|(symbol, settings)| async move {
            let outcome =
                match tokio::time::timeout(self.unit_timeout, self.run_symbol(symbol, settings))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(symbol = %symbol, "Cycle timed out after {:?}", self.unit_timeout);
                        notify_quietly(
                            self.notifier.as_ref(),
                            &format!("{} cycle timed out", symbol),
                            &format!("{} did not finish within {:?}", symbol, self.unit_timeout),
                        )
                        .await;
                        CycleOutcome::TimedOut
                    }
                };
            (symbol.clone(), outcome)
        });

        join_all(units).await
    }

    /// One cycle for one symbol; failures are logged and notified
    pub async fn run_symbol(&self, symbol: &str, settings: &SymbolSettings) -> CycleOutcome {
        match self.cycle(symbol, settings).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(symbol, "Cycle failed: {:#}", e);
                notify_quietly(
                    self.notifier.as_ref(),
                    &format!("{} {}", symbol, e),
                    &format!("{} {:#}", symbol, e),
                )
                .await;
                CycleOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    async fn cycle(&self, symbol: &str, settings: &SymbolSettings) -> Result<CycleOutcome> {
        let mut record = self
            .store
            .get(symbol)?
            .unwrap_or_else(|| PositionRecord::empty(symbol));

        if record.take_profit_order_id.is_none() && settings.interrupt {
            info!(symbol, "Bot is interrupted and will not start new trades");
            return Ok(CycleOutcome::Interrupted);
        }

        let (price, filters) = tokio::try_join!(
            self.market.price(symbol),
            self.market.symbol_filters(symbol)
        )
        .with_context(|| format!("Failed to fetch market snapshot for {}", symbol))?;

        if let Some(tp_id) = record.take_profit_order_id {
            match self.execution.order(symbol, tp_id).await {
                Ok(report) if report.status.is_open() => {
                    debug!(symbol, order_id = tp_id, "Take-profit still open");
                }
                Ok(report) if is_closed(&report.status) => {
                    if self.dry_run {
                        info!(
                            symbol,
                            order_id = tp_id,
                            status = %report.status,
                            "[DRY RUN] Take-profit closed, not reporting"
                        );
                    } else {
                        self.notify_closed(&record, &filters, &report).await;
                    }
                    if let Some(outcome) = self.reset(symbol, settings, &mut record)? {
                        return Ok(outcome);
                    }
                }
                Ok(report) => {
                    warn!(symbol, order_id = tp_id, status = %report.status, "Unexpected take-profit status");
                    return Ok(CycleOutcome::Skipped(format!(
                        "take-profit {} in status {}",
                        tp_id, report.status
                    )));
                }
                Err(e) if e.is_not_found() => {
                    warn!(symbol, order_id = tp_id, "Take-profit order not found, resetting position");
                    if !self.dry_run {
                        notify_quietly(
                            self.notifier.as_ref(),
                            &format!("{} take-profit not found", symbol),
                            &format!(
                                "Take-profit order {} for {} no longer exists; position record reset",
                                tp_id, symbol
                            ),
                        )
                        .await;
                    }
                    if let Some(outcome) = self.reset(symbol, settings, &mut record)? {
                        return Ok(outcome);
                    }
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to query take-profit order {}", tp_id))
                }
            }
        }

        let quote_amount = match plan_cycle(&record, settings, price, filters.tick_size) {
            CyclePlan::Hold {
                average_price,
                price,
            } => {
                info!(
                    symbol,
                    %price,
                    %average_price,
                    "Accumulation period expired and price is not below average, holding"
                );
                return Ok(CycleOutcome::Held {
                    average_price,
                    price,
                });
            }
            CyclePlan::Buy {
                quote_amount,
                martingale_applied,
            } => {
                if martingale_applied {
                    info!(
                        symbol,
                        %price,
                        %quote_amount,
                        "Accumulation period expired and price is below average, applying martingale"
                    );
                }
                quote_amount
            }
        };

        if self.dry_run {
            info!(
                symbol,
                "[DRY RUN] Would buy {} {} at market",
                quote_amount,
                filters.quote_asset
            );
            return Ok(CycleOutcome::DryRun { quote_amount });
        }

        let fill = self
            .execution
            .market_buy(symbol, BuyAmount::Quote(quote_amount))
            .await
            .with_context(|| format!("Market buy of {} {} failed", quote_amount, filters.quote_asset))?;
        info!(
            symbol,
            order_id = fill.order_id,
            "Market order executed: {} {} bought with {} {}",
            fill.executed_qty,
            filters.base_asset,
            fill.cumulative_quote_qty,
            filters.quote_asset
        );

        record.record_fill(&fill);
        self.store.put(&record)?;

        let Some(take_profit) = take_profit_order(&record, settings.take_profit, &filters) else {
            warn!(symbol, qty = %record.executed_qty, "Position too small for a take-profit order");
            return Ok(CycleOutcome::Skipped(
                "take-profit quantity rounds to zero".to_string(),
            ));
        };

        if let Some(old_id) = record.take_profit_order_id {
            match self.execution.cancel_order(symbol, old_id).await {
                Ok(()) => debug!(symbol, order_id = old_id, "Cancelled previous take-profit"),
                Err(e) if e.is_not_found() => {
                    debug!(symbol, order_id = old_id, "Previous take-profit already gone")
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to cancel previous take-profit {}", old_id)
                    })
                }
            }
            record.take_profit_order_id = None;
            self.store.put(&record)?;
        }

        let order_id = self
            .execution
            .limit_sell(symbol, take_profit.price, take_profit.quantity)
            .await
            .context("Failed to place take-profit order")?;
        info!(
            symbol,
            order_id,
            "Take-profit placed: sell {} {} at {}",
            take_profit.quantity,
            filters.base_asset,
            take_profit.price
        );

        record.take_profit_order_id = Some(order_id);
        self.store.put(&record)?;

        Ok(CycleOutcome::TakeProfitPlaced {
            fill,
            take_profit,
            order_id,
        })
    }

    /// Clear the record after its take-profit resolved. Returns an outcome
    /// when the cycle must stop here.
    ///
    /// In dry run the stored record is left untouched; only the in-memory
    /// copy is reset so planning continues from an empty position.
    fn reset(
        &self,
        symbol: &str,
        settings: &SymbolSettings,
        record: &mut PositionRecord,
    ) -> Result<Option<CycleOutcome>> {
        if settings.interrupt {
            info!(symbol, "Bot is interrupted and will not start new trades");
            if self.dry_run {
                info!(symbol, "[DRY RUN] Would delete the position record");
            } else {
                self.store.delete(symbol)?;
            }
            return Ok(Some(CycleOutcome::Interrupted));
        }
        *record = PositionRecord::empty(symbol);
        if self.dry_run {
            info!(symbol, "[DRY RUN] Would reset the position record");
        } else {
            self.store.put(record)?;
        }
        Ok(None)
    }

    async fn notify_closed(
        &self,
        record: &PositionRecord,
        filters: &SymbolFilters,
        report: &OrderReport,
    ) {
        let profit = realized_profit(record, report);
        info!(
            symbol = %record.symbol,
            order_id = report.order_id,
            status = %report.status,
            %profit,
            "Take-profit closed"
        );
        let subject = format!("{} take-profit closed {}", record.symbol, report.status);
        let body = format!(
            "Sold {} {} for {} {}. Profit: {} {}",
            report.executed_qty,
            filters.base_asset,
            report.cumulative_quote_qty,
            filters.quote_asset,
            profit,
            filters.quote_asset
        );
        notify_quietly(self.notifier.as_ref(), &subject, &body).await;
    }
}
