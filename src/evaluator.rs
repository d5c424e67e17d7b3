//! Buy-the-dip deal evaluator
//!
//! Fetches active deals from the trade manager, runs the decision policy on
//! each one concurrently and submits a market add-funds request for every
//! BUY. Each deal is isolated: a failure or timeout only affects its own
//! outcome. Every outcome is logged once, ending with the deal URL.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::exchange::{MarketData, TradeManager};
use crate::notify::{notify_quietly, Notifier};
use crate::policy::{Decision, DecisionPolicy, Evaluation, PolicyInputs};
use crate::signal::{SignalConfig, SignalEngine};
use crate::types::{AddFundsResult, Deal};

pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base/quote currency allowlists; an empty list allows everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealFilter {
    #[serde(default)]
    pub base: Vec<String>,
    #[serde(default)]
    pub quote: Vec<String>,
}

impl DealFilter {
    pub fn allows(&self, deal: &Deal) -> bool {
        let listed = |list: &[String], code: &str| {
            list.is_empty() || list.iter().any(|c| c.eq_ignore_ascii_case(code))
        };
        listed(&self.base, &deal.base_currency) && listed(&self.quote, &deal.quote_currency)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DealOutcome {
    Skipped { reason: String },
    Placed(AddFundsResult),
    Rejected { description: String },
    DryRun { quantity: Decimal },
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DealReport {
    pub deal_id: u64,
    pub symbol: String,
    pub outcome: DealOutcome,
}

impl DealReport {
    pub fn is_placed(&self) -> bool {
        matches!(self.outcome, DealOutcome::Placed(_))
    }
}

pub struct DealEvaluator {
    trade_manager: Arc<dyn TradeManager>,
    market: Arc<dyn MarketData>,
    policy: DecisionPolicy,
    signal: SignalConfig,
    notifier: Arc<dyn Notifier>,
    filter: DealFilter,
    unit_timeout: Duration,
    dry_run: bool,
}

impl DealEvaluator {
    pub fn new(
        trade_manager: Arc<dyn TradeManager>,
        market: Arc<dyn MarketData>,
        policy: DecisionPolicy,
        signal: SignalConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            trade_manager,
            market,
            policy,
            signal,
            notifier,
            filter: DealFilter::default(),
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
            dry_run: false,
        }
    }

    pub fn with_filter(mut self, filter: DealFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Evaluate all active deals once
    pub async fn run(&self) -> Result<Vec<DealReport>> {
        let deals = self
            .trade_manager
            .active_deals()
            .await
            .context("Failed to fetch active deals")?;

        let total = deals.len();
        let deals: Vec<Deal> = deals.into_iter().filter(|d| self.filter.allows(d)).collect();
        info!("{} active deals, {} after allowlist", total, deals.len());

        if deals.is_empty() {
            return Ok(Vec::new());
        }

        let units = deals.iter().map(|deal| async move {
            let outcome = match tokio::time::timeout(self.unit_timeout, self.evaluate_deal(deal)).await
            {
                Ok(outcome) => outcome,
                Err(_) => DealOutcome::TimedOut,
            };
            log_outcome(deal, &outcome);
            self.notify_outcome(deal, &outcome).await;
            DealReport {
                deal_id: deal.id,
                symbol: deal.symbol(),
                outcome,
            }
        });

        Ok(join_all(units).await)
    }

    /// Failures, timeouts and rejections reach the operator
    async fn notify_outcome(&self, deal: &Deal, outcome: &DealOutcome) {
        let symbol = deal.symbol();
        let (subject, detail) = match outcome {
            DealOutcome::Failed(e) => (format!("{} deal {} failed", symbol, deal.id), e.clone()),
            DealOutcome::TimedOut => (
                format!("{} deal {} timed out", symbol, deal.id),
                format!("No result within {:?}", self.unit_timeout),
            ),
            DealOutcome::Rejected { description } => (
                format!("{} deal {} safety order rejected", symbol, deal.id),
                description.clone(),
            ),
            _ => return,
        };
        notify_quietly(
            self.notifier.as_ref(),
            &subject,
            &format!("{}. {}", detail, deal.url()),
        )
        .await;
    }

    async fn evaluate_deal(&self, deal: &Deal) -> DealOutcome {
        if deal.completed_safety_orders > deal.max_safety_orders {
            warn!(
                deal_id = deal.id,
                "Deal reports {} completed safety orders of max {}",
                deal.completed_safety_orders,
                deal.max_safety_orders
            );
        }

        if let Some(evaluation) = self.policy.precheck(deal) {
            log_trace(deal, &evaluation);
            return skipped(&evaluation);
        }

        let symbol = deal.symbol();
        let engine = SignalEngine::new(self.market.as_ref(), &self.signal);
        let needs_signal = self.policy.needs_signal();

        let (orders, signal, funding) = tokio::join!(
            self.trade_manager.deal_orders(deal.id),
            async {
                if needs_signal {
                    engine.signal(&symbol).await.map(Some)
                } else {
                    Ok(None)
                }
            },
            self.trade_manager.funding_quote(deal.id),
        );

        let orders = match orders {
            Ok(orders) => orders,
            Err(e) => return DealOutcome::Failed(format!("order history: {}", e)),
        };
        let signal = match signal {
            Ok(signal) => signal,
            Err(e) => return DealOutcome::Failed(format!("market data: {}", e)),
        };
        let funding = match funding {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(deal_id = deal.id, "Funding quote unavailable: {}", e);
                None
            }
        };

        let evaluation = self.policy.evaluate(&PolicyInputs {
            deal,
            orders: &orders,
            signal,
            funding,
            now: Utc::now(),
        });
        log_trace(deal, &evaluation);

        let quantity = match evaluation.decision {
            Decision::Skip => return skipped(&evaluation),
            Decision::Buy { quantity } => quantity,
        };

        if self.dry_run {
            return DealOutcome::DryRun { quantity };
        }

        match self.trade_manager.add_funds(deal.id, quantity).await {
            Ok(result) if result.is_accepted() => DealOutcome::Placed(result),
            Ok(result) => DealOutcome::Rejected {
                description: result
                    .error_description
                    .unwrap_or_else(|| "no order id returned".to_string()),
            },
            Err(e) => DealOutcome::Failed(format!("add funds: {}", e)),
        }
    }
}

fn skipped(evaluation: &Evaluation) -> DealOutcome {
    let reason = evaluation
        .failed_check()
        .map(|c| format!("{}: {}", c.step, c.detail))
        .unwrap_or_else(|| "skipped".to_string());
    DealOutcome::Skipped { reason }
}

fn log_trace(deal: &Deal, evaluation: &Evaluation) {
    for check in &evaluation.trace {
        debug!(
            deal_id = deal.id,
            step = %check.step,
            passed = check.passed,
            "{}",
            check.detail
        );
    }
}

fn log_outcome(deal: &Deal, outcome: &DealOutcome) {
    let symbol = deal.symbol();
    let url = deal.url();
    match outcome {
        DealOutcome::Placed(order) => info!(
            deal_id = deal.id,
            "Manual safety order placed ({}). Rate: {} {}, Amount: {} {}, Volume: {} {}. {}",
            order.order_id.as_deref().unwrap_or("?"),
            or_unknown(order.average_price),
            symbol,
            or_unknown(order.quantity),
            deal.base_currency,
            or_unknown(order.total),
            deal.quote_currency,
            url
        ),
        DealOutcome::Rejected { description } => warn!(
            deal_id = deal.id,
            "Error placing safety order ({}). {}. {}", symbol, description, url
        ),
        DealOutcome::DryRun { quantity } => info!(
            deal_id = deal.id,
            "[DRY RUN] Would add {} {} to {}. {}", quantity, deal.base_currency, symbol, url
        ),
        DealOutcome::Skipped { reason } => {
            info!(deal_id = deal.id, "Skipping {} ({}). {}", symbol, reason, url)
        }
        DealOutcome::Failed(e) => error!(deal_id = deal.id, "Failed evaluating {}: {}. {}", symbol, e, url),
        DealOutcome::TimedOut => error!(deal_id = deal.id, "Timed out evaluating {}. {}", symbol, url),
    }
}

fn or_unknown(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn deal(base: &str, quote: &str) -> Deal {
        Deal {
            id: 1,
            base_currency: base.to_string(),
            quote_currency: quote.to_string(),
            current_price: dec!(1),
            actual_profit_percentage: dec!(-1),
            base_order_average_price: dec!(1),
            completed_safety_orders: 0,
            max_safety_orders: 1,
            safety_order_step_percentage: dec!(1),
            martingale_step_coefficient: dec!(1),
            bought_amount: dec!(1),
            bought_volume: dec!(1),
        }
    }

    #[test]
    fn test_empty_filter_allows_all() {
        assert!(DealFilter::default().allows(&deal("BTC", "USDT")));
    }

    #[test]
    fn test_filter_allowlists() {
        let filter = DealFilter {
            base: vec!["BTT".to_string()],
            quote: vec!["usdt".to_string()],
        };
        assert!(filter.allows(&deal("BTT", "USDT")));
        assert!(!filter.allows(&deal("BTC", "USDT")));
        assert!(!filter.allows(&deal("BTT", "BUSD")));
    }

    #[test]
    fn test_skipped_reason_names_failed_step() {
        let policy = DecisionPolicy::new(Default::default());
        let mut d = deal("BTC", "USDT");
        d.actual_profit_percentage = dec!(1.5);
        let evaluation = policy.precheck(&d).unwrap();
        match skipped(&evaluation) {
            DealOutcome::Skipped { reason } => assert!(reason.starts_with("profitability:")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
