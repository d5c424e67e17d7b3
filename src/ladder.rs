//! Safety-order ladder arithmetic
//!
//! Reproduces the price grid a trade manager builds from a deal's step
//! percentage and martingale step coefficient, so a manual order can line up
//! with (or front-run) the automatic one. Everything stays in `Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LadderError {
    #[error("arithmetic overflow computing ladder step {step}")]
    Overflow { step: u32 },

    #[error("invalid ladder parameter: {0}")]
    InvalidParameter(String),
}

/// Ladder parameters for one deal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ladder {
    /// Price step between safety orders, in percent
    pub step_percentage: Decimal,
    /// Growth factor applied to each successive step
    pub martingale: Decimal,
}

impl Ladder {
    pub fn new(step_percentage: Decimal, martingale: Decimal) -> Result<Self, LadderError> {
        if step_percentage.is_sign_negative() {
            return Err(LadderError::InvalidParameter(format!(
                "step percentage {} is negative",
                step_percentage
            )));
        }
        if martingale <= Decimal::ZERO {
            return Err(LadderError::InvalidParameter(format!(
                "martingale coefficient {} must be positive",
                martingale
            )));
        }
        Ok(Self {
            step_percentage,
            martingale,
        })
    }

    /// Cumulative deviation from the base price, in percent, for the safety
    /// order placed after `completed` orders have filled
    ///
    /// Arithmetic ladder when the coefficient is 1, otherwise the sum of the
    /// geometric series `s * (m^(n+1) - 1) / (m - 1)`.
    pub fn deviation(&self, completed: u32) -> Result<Decimal, LadderError> {
        let steps = completed
            .checked_add(1)
            .ok_or(LadderError::Overflow { step: completed })?;
        let overflow = || LadderError::Overflow { step: completed };

        if self.martingale == Decimal::ONE {
            return self
                .step_percentage
                .checked_mul(Decimal::from(steps))
                .ok_or_else(overflow);
        }

        let power = checked_pow(self.martingale, steps).ok_or_else(overflow)?;
        let numerator = power
            .checked_sub(Decimal::ONE)
            .and_then(|v| v.checked_mul(self.step_percentage))
            .ok_or_else(overflow)?;
        numerator
            .checked_div(self.martingale - Decimal::ONE)
            .ok_or_else(overflow)
    }

    /// Highest price at which the next safety order would be placed
    pub fn max_buy_price(&self, base_price: Decimal, completed: u32) -> Result<Decimal, LadderError> {
        let deviation = self.deviation(completed)?;
        base_price
            .checked_mul(HUNDRED - deviation)
            .and_then(|v| v.checked_div(HUNDRED))
            .ok_or(LadderError::Overflow { step: completed })
    }
}

/// Exact integer power by repeated multiplication
fn checked_pow(base: Decimal, exp: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    for _ in 0..exp {
        result = result.checked_mul(base)?;
    }
    Some(result)
}

/// Round to the nearest multiple of `increment`, halves away from zero
pub fn round_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment.is_zero() {
        return value;
    }
    let steps = (value / increment).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (steps * increment).normalize()
}

/// Round down to a multiple of `increment`
pub fn floor_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment.is_zero() {
        return value;
    }
    ((value / increment).floor() * increment).normalize()
}

/// Round up to a multiple of `increment`
pub fn ceil_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment.is_zero() {
        return value;
    }
    ((value / increment).ceil() * increment).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_geometric_ladder_reference_table() {
        let ladder = Ladder::new(dec!(1.75), dec!(1.1)).unwrap();
        // 1.75 * (1.1^(n+1) - 1) / 0.1
        let expected = [
            dec!(1.75),
            dec!(3.675),
            dec!(5.7925),
            dec!(8.12175),
            dec!(10.683925),
            dec!(13.5023175),
            dec!(16.60254925),
            dec!(20.012804175),
        ];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(ladder.deviation(n as u32).unwrap(), *want, "step {}", n);
        }
    }

    #[test]
    fn test_arithmetic_ladder_when_coefficient_is_one() {
        let ladder = Ladder::new(dec!(2.5), Decimal::ONE).unwrap();
        for n in 0..10u32 {
            assert_eq!(
                ladder.deviation(n).unwrap(),
                dec!(2.5) * Decimal::from(n + 1)
            );
        }
    }

    #[test]
    fn test_geometric_converges_to_arithmetic_near_one() {
        let arithmetic = Ladder::new(dec!(2), Decimal::ONE).unwrap();
        let near = Ladder::new(dec!(2), dec!(1.000001)).unwrap();
        for n in 0..8u32 {
            let diff = (near.deviation(n).unwrap() - arithmetic.deviation(n).unwrap()).abs();
            assert!(diff < dec!(0.001), "step {} diverged by {}", n, diff);
        }
    }

    #[test]
    fn test_max_buy_price() {
        let ladder = Ladder::new(dec!(2), Decimal::ONE).unwrap();
        // Two completed safety orders -> third step at 6% below base
        assert_eq!(ladder.max_buy_price(dec!(100), 2).unwrap(), dec!(94));

        let ladder = Ladder::new(dec!(1.75), dec!(1.1)).unwrap();
        assert_eq!(ladder.max_buy_price(dec!(200), 1).unwrap(), dec!(192.65));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Ladder::new(dec!(-1), Decimal::ONE).is_err());
        assert!(Ladder::new(dec!(1), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_round_to_increment() {
        assert_eq!(round_to_increment(dec!(10.4999), dec!(0.01)), dec!(10.5));
        assert_eq!(round_to_increment(dec!(10.125), dec!(0.01)), dec!(10.13));
        assert_eq!(round_to_increment(dec!(7), dec!(5)), dec!(5));
        assert_eq!(round_to_increment(dec!(7.5), dec!(5)), dec!(10));
        assert_eq!(round_to_increment(dec!(3.3), Decimal::ZERO), dec!(3.3));
    }

    #[test]
    fn test_floor_and_ceil_to_increment() {
        assert_eq!(floor_to_increment(dec!(10.999), dec!(1)), dec!(10));
        assert_eq!(ceil_to_increment(dec!(0.00012001), dec!(0.00001)), dec!(0.00013));
        assert_eq!(ceil_to_increment(dec!(0.5), dec!(0.1)), dec!(0.5));
    }
}
