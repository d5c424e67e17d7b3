//! Decision policy for adding funds to a deal
//!
//! One configurable policy replaces the separate buy-the-dip variants. Gates
//! run in a fixed priority order (profitability, price, cooldown, signal) and
//! the first failing gate short-circuits to [`Decision::Skip`]. The policy is
//! pure: it returns the decision plus a rationale trace and leaves logging
//! and I/O to the caller.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::ladder::{round_to_increment, Ladder};
use crate::signal::MarketSignal;
use crate::types::{Deal, DealOrder, FundingQuote};

/// A condition that must hold before buying
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Profitability,
    Price,
    Cooldown,
    Signal,
}

impl Gate {
    /// Evaluation order
    pub const PRIORITY: [Gate; 4] = [Gate::Profitability, Gate::Price, Gate::Cooldown, Gate::Signal];
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gate::Profitability => "profitability",
            Gate::Price => "price",
            Gate::Cooldown => "cooldown",
            Gate::Signal => "signal",
        };
        write!(f, "{}", s)
    }
}

/// What the price gate compares the current price against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceReference {
    /// Max buy price of the next safety-order ladder step
    #[default]
    Ladder,
    /// Average price of the most recent filled order
    LastFill,
}

/// How the buy quantity is sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityRule {
    /// Repeat the last filled order's quantity
    #[default]
    ReplayLast,
    /// Sum of all filled base/safety quantities (full double-down)
    SumFilled,
    /// Bought amount times the martingale coefficient
    AmountTimesMartingale,
    /// Fraction of bought volume scaled by how oversold RSI is
    RsiScaled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_gates")]
    pub gates: Vec<Gate>,
    #[serde(default)]
    pub quantity_rule: QuantityRule,
    #[serde(default)]
    pub price_reference: PriceReference,
    /// Profitability gate also requires safety orders left
    #[serde(default = "default_true")]
    pub require_safety_capacity: bool,
    /// Minimum time since the last fill
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
    /// Ladder step override; the deal's own setting is used when absent
    #[serde(default)]
    pub step_percentage: Option<Decimal>,
    /// Martingale override; the deal's own setting is used when absent
    #[serde(default)]
    pub martingale: Option<Decimal>,
    /// Percent of bought volume for the RSI-scaled rule at RSI 50
    #[serde(default = "default_scaled_percentage")]
    pub scaled_percentage: Decimal,
}

fn default_gates() -> Vec<Gate> {
    vec![Gate::Profitability, Gate::Cooldown, Gate::Signal]
}

fn default_true() -> bool {
    true
}

fn default_cooldown_secs() -> i64 {
    600
}

fn default_scaled_percentage() -> Decimal {
    Decimal::TEN
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            gates: default_gates(),
            quantity_rule: QuantityRule::default(),
            price_reference: PriceReference::default(),
            require_safety_capacity: true,
            cooldown_secs: default_cooldown_secs(),
            step_percentage: None,
            martingale: None,
            scaled_percentage: default_scaled_percentage(),
        }
    }
}

impl PolicyConfig {
    pub fn has(&self, gate: Gate) -> bool {
        self.gates.contains(&gate)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs)
    }
}

/// Everything the policy looks at for one deal
#[derive(Debug, Clone)]
pub struct PolicyInputs<'a> {
    pub deal: &'a Deal,
    pub orders: &'a [DealOrder],
    pub signal: Option<MarketSignal>,
    pub funding: Option<FundingQuote>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Buy { quantity: Decimal },
    Skip,
}

/// Step of the rationale trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Gate(Gate),
    Quantity,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Gate(g) => write!(f, "{}", g),
            Step::Quantity => write!(f, "quantity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub step: Step,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    pub trace: Vec<Check>,
}

impl Evaluation {
    /// The check that caused a skip
    pub fn failed_check(&self) -> Option<&Check> {
        self.trace.iter().find(|c| !c.passed)
    }

    pub fn is_buy(&self) -> bool {
        matches!(self.decision, Decision::Buy { .. })
    }
}

/// Most recent filled base/safety order
///
/// Ties on `updated_at` go to the highest numeric order id, then the
/// lexicographically greatest id.
pub fn last_filled_order(orders: &[DealOrder]) -> Option<&DealOrder> {
    orders
        .iter()
        .filter(|o| o.is_qualifying_fill())
        .max_by(|a, b| compare_recency(a, b))
}

fn compare_recency(a: &DealOrder, b: &DealOrder) -> Ordering {
    a.updated_at
        .cmp(&b.updated_at)
        .then_with(|| {
            let a_id = a.order_id.parse::<u64>().ok();
            let b_id = b.order_id.parse::<u64>().ok();
            a_id.cmp(&b_id)
        })
        .then_with(|| a.order_id.cmp(&b.order_id))
}

/// Total quantity of filled base/safety orders
pub fn filled_quantity(orders: &[DealOrder]) -> Decimal {
    orders
        .iter()
        .filter(|o| o.is_qualifying_fill())
        .map(|o| o.quantity)
        .sum()
}

pub struct DecisionPolicy {
    config: PolicyConfig,
}

impl DecisionPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Whether an indicator reading is needed for this configuration
    pub fn needs_signal(&self) -> bool {
        self.config.has(Gate::Signal) || self.config.quantity_rule == QuantityRule::RsiScaled
    }

    /// Profitability check on the deal alone, so callers can skip fetching
    /// order history and candles for deals that would never qualify
    pub fn precheck(&self, deal: &Deal) -> Option<Evaluation> {
        if !self.config.has(Gate::Profitability) {
            return None;
        }
        let check = self.check_profitability(deal);
        if check.passed {
            None
        } else {
            Some(Evaluation {
                decision: Decision::Skip,
                trace: vec![check],
            })
        }
    }

    pub fn evaluate(&self, inputs: &PolicyInputs<'_>) -> Evaluation {
        let mut trace = Vec::new();

        for gate in Gate::PRIORITY {
            if !self.config.has(gate) {
                continue;
            }
            let check = match gate {
                Gate::Profitability => self.check_profitability(inputs.deal),
                Gate::Price => self.check_price(inputs),
                Gate::Cooldown => self.check_cooldown(inputs),
                Gate::Signal => check_signal(inputs),
            };
            let passed = check.passed;
            trace.push(check);
            if !passed {
                return Evaluation {
                    decision: Decision::Skip,
                    trace,
                };
            }
        }

        let (quantity, check) = self.size(inputs);
        trace.push(check);
        let decision = match quantity {
            Some(quantity) => Decision::Buy { quantity },
            None => Decision::Skip,
        };
        Evaluation { decision, trace }
    }

    fn ladder(&self, deal: &Deal) -> Result<Ladder, String> {
        Ladder::new(
            self.config
                .step_percentage
                .unwrap_or(deal.safety_order_step_percentage),
            self.martingale(deal),
        )
        .map_err(|e| e.to_string())
    }

    fn martingale(&self, deal: &Deal) -> Decimal {
        self.config
            .martingale
            .unwrap_or(deal.martingale_step_coefficient)
    }

    fn check_profitability(&self, deal: &Deal) -> Check {
        let step = Step::Gate(Gate::Profitability);
        if !deal.actual_profit_percentage.is_sign_negative() || deal.actual_profit_percentage.is_zero() {
            return fail(
                step,
                format!("profit {}% is not negative", deal.actual_profit_percentage),
            );
        }
        if self.config.require_safety_capacity && !deal.has_safety_capacity() {
            return fail(
                step,
                format!(
                    "safety orders exhausted ({}/{})",
                    deal.completed_safety_orders, deal.max_safety_orders
                ),
            );
        }
        pass(
            step,
            format!(
                "profit {}%, safety orders {}/{}",
                deal.actual_profit_percentage, deal.completed_safety_orders, deal.max_safety_orders
            ),
        )
    }

    fn check_price(&self, inputs: &PolicyInputs<'_>) -> Check {
        let step = Step::Gate(Gate::Price);
        let deal = inputs.deal;
        let price = deal.current_price;

        match self.config.price_reference {
            PriceReference::Ladder => {
                if !deal.has_safety_capacity() {
                    return fail(step, "no ladder step left".to_string());
                }
                let max_price = match self.ladder(deal).and_then(|ladder| {
                    ladder
                        .max_buy_price(deal.base_order_average_price, deal.completed_safety_orders)
                        .map_err(|e| e.to_string())
                }) {
                    Ok(p) => p,
                    Err(e) => return fail(step, e),
                };
                if price <= max_price {
                    pass(step, format!("price {} <= ladder max {}", price, max_price))
                } else {
                    fail(step, format!("price {} above ladder max {}", price, max_price))
                }
            }
            PriceReference::LastFill => match last_filled_order(inputs.orders) {
                None => fail(step, "no filled orders".to_string()),
                Some(last) if price < last.average_price => pass(
                    step,
                    format!("price {} below last fill {}", price, last.average_price),
                ),
                Some(last) => fail(
                    step,
                    format!("price {} not below last fill {}", price, last.average_price),
                ),
            },
        }
    }

    fn check_cooldown(&self, inputs: &PolicyInputs<'_>) -> Check {
        let step = Step::Gate(Gate::Cooldown);
        let Some(last) = last_filled_order(inputs.orders) else {
            return fail(step, "no filled orders".to_string());
        };
        let elapsed = inputs.now - last.updated_at;
        if elapsed > self.config.cooldown() {
            pass(
                step,
                format!("{}s since last fill {}", elapsed.num_seconds(), last.order_id),
            )
        } else {
            fail(
                step,
                format!(
                    "only {}s since last fill {} (cooldown {}s)",
                    elapsed.num_seconds(),
                    last.order_id,
                    self.config.cooldown_secs
                ),
            )
        }
    }

    fn size(&self, inputs: &PolicyInputs<'_>) -> (Option<Decimal>, Check) {
        let raw = match self.raw_quantity(inputs) {
            Ok(q) => q,
            Err(detail) => return (None, fail(Step::Quantity, detail)),
        };

        let quantity = match inputs.funding {
            Some(quote) => round_to_increment(raw, quote.min_lot_size),
            None => raw,
        };

        if quantity <= Decimal::ZERO {
            return (
                None,
                fail(
                    Step::Quantity,
                    format!("{:?} sized {} -> {}", self.config.quantity_rule, raw, quantity),
                ),
            );
        }

        (
            Some(quantity),
            pass(
                Step::Quantity,
                format!("{:?} -> {}", self.config.quantity_rule, quantity),
            ),
        )
    }

    fn raw_quantity(&self, inputs: &PolicyInputs<'_>) -> Result<Decimal, String> {
        let deal = inputs.deal;
        match self.config.quantity_rule {
            QuantityRule::ReplayLast => last_filled_order(inputs.orders)
                .map(|o| o.quantity)
                .ok_or_else(|| "no filled orders to replay".to_string()),
            QuantityRule::SumFilled => Ok(filled_quantity(inputs.orders)),
            QuantityRule::AmountTimesMartingale => deal
                .bought_amount
                .checked_mul(self.martingale(deal))
                .ok_or_else(|| "overflow sizing bought amount".to_string()),
            QuantityRule::RsiScaled => {
                let rsi = inputs
                    .signal
                    .and_then(|s| s.rsi)
                    .and_then(Decimal::from_f64)
                    .ok_or_else(|| "RSI unavailable".to_string())?;
                let price = inputs
                    .funding
                    .map(|f| f.orderbook_price)
                    .unwrap_or(deal.current_price);
                if price <= Decimal::ZERO {
                    return Err(format!("invalid price {}", price));
                }
                // RSI 0 -> 2x, RSI 50 -> 1x, RSI 100 -> 0x
                let bonus = (Decimal::ONE_HUNDRED - rsi) * Decimal::TWO / Decimal::ONE_HUNDRED;
                Ok(deal.bought_volume * self.config.scaled_percentage / Decimal::ONE_HUNDRED * bonus
                    / price)
            }
        }
    }
}

fn check_signal(inputs: &PolicyInputs<'_>) -> Check {
    let step = Step::Gate(Gate::Signal);
    match inputs.signal {
        Some(s) if s.oversold_cross => pass(step, format!("oversold cross (rsi {:?})", s.rsi)),
        Some(s) => fail(step, format!("no oversold cross (rsi {:?})", s.rsi)),
        None => fail(step, "signal unavailable".to_string()),
    }
}

fn pass(step: Step, detail: String) -> Check {
    Check {
        step,
        passed: true,
        detail,
    }
}

fn fail(step: Step, detail: String) -> Check {
    Check {
        step,
        passed: false,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FillStatus, OrderRole};
    use rust_decimal_macros::dec;

    fn deal(profit: Decimal) -> Deal {
        Deal {
            id: 1,
            base_currency: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            current_price: dec!(95),
            actual_profit_percentage: profit,
            base_order_average_price: dec!(100),
            completed_safety_orders: 1,
            max_safety_orders: 5,
            safety_order_step_percentage: dec!(2),
            martingale_step_coefficient: dec!(1),
            bought_amount: dec!(3),
            bought_volume: dec!(300),
        }
    }

    fn order(id: &str, role: OrderRole, status: FillStatus, qty: Decimal, mins_ago: i64) -> DealOrder {
        DealOrder {
            order_id: id.to_string(),
            role,
            status,
            quantity: qty,
            total: qty * dec!(100),
            average_price: dec!(100),
            updated_at: now() - Duration::minutes(mins_ago),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn signal(cross: bool) -> Option<MarketSignal> {
        Some(MarketSignal {
            oversold_cross: cross,
            rsi: Some(25.0),
        })
    }

    fn all_gates() -> PolicyConfig {
        PolicyConfig {
            gates: Gate::PRIORITY.to_vec(),
            ..PolicyConfig::default()
        }
    }

    #[test]
    fn test_last_filled_tie_break_prefers_highest_id() {
        let orders = vec![
            order("9", OrderRole::Safety, FillStatus::Filled, dec!(1), 30),
            order("11", OrderRole::Safety, FillStatus::Filled, dec!(2), 30),
            order("10", OrderRole::Safety, FillStatus::Filled, dec!(3), 30),
            order("12", OrderRole::Safety, FillStatus::Active, dec!(4), 1),
            order("13", OrderRole::TakeProfit, FillStatus::Filled, dec!(5), 1),
        ];
        assert_eq!(last_filled_order(&orders).unwrap().order_id, "11");
        assert_eq!(filled_quantity(&orders), dec!(6));
    }

    #[test]
    fn test_non_negative_profit_always_skips() {
        let policy = DecisionPolicy::new(all_gates());
        let orders = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 60)];
        for profit in [dec!(0), dec!(0.01), dec!(5)] {
            let d = deal(profit);
            let eval = policy.evaluate(&PolicyInputs {
                deal: &d,
                orders: &orders,
                signal: signal(true),
                funding: None,
                now: now(),
            });
            assert_eq!(eval.decision, Decision::Skip);
            assert_eq!(eval.trace.len(), 1);
            assert!(policy.precheck(&d).is_some());
        }
    }

    #[test]
    fn test_exhausted_safety_orders_skip() {
        let policy = DecisionPolicy::new(all_gates());
        let mut d = deal(dec!(-3));
        d.completed_safety_orders = 5;
        let orders = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 60)];
        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &orders,
            signal: signal(true),
            funding: None,
            now: now(),
        });
        assert_eq!(eval.decision, Decision::Skip);
        assert!(eval.failed_check().unwrap().detail.contains("exhausted"));
    }

    #[test]
    fn test_ladder_price_gate() {
        let config = PolicyConfig {
            gates: vec![Gate::Price],
            ..PolicyConfig::default()
        };
        let policy = DecisionPolicy::new(config);
        let orders = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 60)];

        // completed=1, step 2%, coefficient 1 -> max price 96
        let mut d = deal(dec!(-1));
        d.current_price = dec!(96);
        let inputs = PolicyInputs {
            deal: &d,
            orders: &orders,
            signal: None,
            funding: None,
            now: now(),
        };
        assert!(policy.evaluate(&inputs).is_buy());

        let mut d = deal(dec!(-1));
        d.current_price = dec!(96.01);
        let inputs = PolicyInputs { deal: &d, ..inputs };
        assert!(!policy.evaluate(&inputs).is_buy());
    }

    #[test]
    fn test_last_fill_price_gate() {
        let config = PolicyConfig {
            gates: vec![Gate::Price],
            price_reference: PriceReference::LastFill,
            ..PolicyConfig::default()
        };
        let policy = DecisionPolicy::new(config);
        let d = deal(dec!(-1));
        let orders = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 60)];
        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &orders,
            signal: None,
            funding: None,
            now: now(),
        });
        assert!(eval.is_buy());

        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &[],
            signal: None,
            funding: None,
            now: now(),
        });
        assert_eq!(eval.failed_check().unwrap().detail, "no filled orders");
    }

    #[test]
    fn test_cooldown_is_strict() {
        let config = PolicyConfig {
            gates: vec![Gate::Cooldown],
            cooldown_secs: 600,
            ..PolicyConfig::default()
        };
        let policy = DecisionPolicy::new(config);
        let d = deal(dec!(-1));

        let recent = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 10)];
        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &recent,
            signal: None,
            funding: None,
            now: now(),
        });
        assert!(!eval.is_buy());

        let old = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 11)];
        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &old,
            signal: None,
            funding: None,
            now: now(),
        });
        assert!(eval.is_buy());
    }

    #[test]
    fn test_quantity_rules() {
        let d = deal(dec!(-1));
        let orders = vec![
            order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 120),
            order("2", OrderRole::Safety, FillStatus::Filled, dec!(2), 60),
            order("3", OrderRole::ManualSafety, FillStatus::Filled, dec!(4), 30),
        ];
        let inputs = PolicyInputs {
            deal: &d,
            orders: &orders,
            signal: signal(true),
            funding: None,
            now: now(),
        };

        let cases = [
            (QuantityRule::ReplayLast, dec!(4)),
            (QuantityRule::SumFilled, dec!(7)),
            (QuantityRule::AmountTimesMartingale, dec!(3)),
        ];
        for (rule, want) in cases {
            let policy = DecisionPolicy::new(PolicyConfig {
                gates: vec![],
                quantity_rule: rule,
                ..PolicyConfig::default()
            });
            assert_eq!(
                policy.evaluate(&inputs).decision,
                Decision::Buy { quantity: want },
                "{:?}",
                rule
            );
        }
    }

    #[test]
    fn test_rsi_scaled_quantity() {
        let policy = DecisionPolicy::new(PolicyConfig {
            gates: vec![],
            quantity_rule: QuantityRule::RsiScaled,
            scaled_percentage: dec!(10),
            ..PolicyConfig::default()
        });
        let d = deal(dec!(-1));
        let funding = FundingQuote {
            orderbook_price: dec!(2),
            min_lot_size: dec!(0.1),
        };
        // 300 * 10% * (100 - 25) * 2 / 100 / 2 = 22.5
        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &[],
            signal: signal(false),
            funding: Some(funding),
            now: now(),
        });
        assert_eq!(eval.decision, Decision::Buy { quantity: dec!(22.5) });

        // RSI 100 sizes to zero
        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &[],
            signal: Some(MarketSignal {
                oversold_cross: false,
                rsi: Some(100.0),
            }),
            funding: Some(funding),
            now: now(),
        });
        assert_eq!(eval.decision, Decision::Skip);

        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &[],
            signal: Some(MarketSignal::absent()),
            funding: Some(funding),
            now: now(),
        });
        assert_eq!(eval.failed_check().unwrap().detail, "RSI unavailable");
    }

    #[test]
    fn test_quantity_rounded_to_lot() {
        let policy = DecisionPolicy::new(PolicyConfig {
            gates: vec![],
            quantity_rule: QuantityRule::ReplayLast,
            ..PolicyConfig::default()
        });
        let d = deal(dec!(-1));
        let orders = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1.23456), 60)];
        let eval = policy.evaluate(&PolicyInputs {
            deal: &d,
            orders: &orders,
            signal: None,
            funding: Some(FundingQuote {
                orderbook_price: dec!(95),
                min_lot_size: dec!(0.001),
            }),
            now: now(),
        });
        assert_eq!(eval.decision, Decision::Buy { quantity: dec!(1.235) });
    }

    #[test]
    fn test_gate_order_short_circuits() {
        let policy = DecisionPolicy::new(all_gates());
        // Above the ladder max of 96, so the price gate stops evaluation
        let mut high = deal(dec!(-1));
        high.current_price = dec!(99);
        let orders = vec![order("1", OrderRole::Base, FillStatus::Filled, dec!(1), 1)];
        let eval = policy.evaluate(&PolicyInputs {
            deal: &high,
            orders: &orders,
            signal: signal(false),
            funding: None,
            now: now(),
        });
        let steps: Vec<Step> = eval.trace.iter().map(|c| c.step).collect();
        assert_eq!(
            steps,
            vec![Step::Gate(Gate::Profitability), Step::Gate(Gate::Price)]
        );
    }

    #[test]
    fn test_policy_config_serde_defaults() {
        let config: PolicyConfig =
            serde_json::from_str(r#"{"gates":["signal","cooldown"],"quantity_rule":"sum_filled"}"#)
                .unwrap();
        assert_eq!(config.gates, vec![Gate::Signal, Gate::Cooldown]);
        assert_eq!(config.quantity_rule, QuantityRule::SumFilled);
        assert_eq!(config.price_reference, PriceReference::Ladder);
        assert_eq!(config.cooldown_secs, 600);
        assert!(config.require_safety_capacity);
    }
}
