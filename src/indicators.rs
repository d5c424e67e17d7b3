//! Technical indicators
//!
//! RSI, Bollinger %B and crossover detection over closing prices. Series are
//! aligned to the tail of the input: the last element always belongs to the
//! most recent candle.

use rust_decimal::prelude::ToPrimitive;
use ta::indicators::BollingerBands;
use ta::Next;
use thiserror::Error;

use crate::types::Candle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid indicator period: {0}")]
    InvalidPeriod(usize),
}

/// Closing prices as f64, oldest first
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .filter_map(|c| c.close.to_f64())
        .collect()
}

/// Calculate RSI with Wilder smoothing
///
/// Returns `values.len() - period` samples. The first average gain/loss is the
/// simple mean over the first `period` deltas, later ones are smoothed with
/// `(prev * (period - 1) + current) / period`.
pub fn rsi(values: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod(period));
    }
    if values.len() < period + 1 {
        return Err(IndicatorError::InsufficientData {
            required: period + 1,
            available: values.len(),
        });
    }

    let mut gains = Vec::with_capacity(values.len() - 1);
    let mut losses = Vec::with_capacity(values.len() - 1);

    for pair in values.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let n = period as f64;
    let mut avg_gain = gains[..period].iter().sum::<f64>() / n;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / n;

    let mut rsi_values = Vec::with_capacity(values.len() - period);
    rsi_values.push(rsi_from_averages(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (n - 1.0) + gains[i]) / n;
        avg_loss = (avg_loss * (n - 1.0) + losses[i]) / n;
        rsi_values.push(rsi_from_averages(avg_gain, avg_loss));
    }

    Ok(rsi_values)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

/// One Bollinger band sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands (rolling mean ± num_std population stddev)
///
/// Returns `values.len() - period + 1` samples.
pub fn bollinger_bands(
    values: &[f64],
    period: usize,
    num_std: f64,
) -> Result<Vec<Band>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod(period));
    }
    if values.len() < period {
        return Err(IndicatorError::InsufficientData {
            required: period,
            available: values.len(),
        });
    }

    let mut bb =
        BollingerBands::new(period, num_std).map_err(|_| IndicatorError::InvalidPeriod(period))?;

    let mut bands = Vec::with_capacity(values.len() + 1 - period);
    for (i, &value) in values.iter().enumerate() {
        let out = bb.next(value);
        // ta emits partial-window values during warm-up
        if i + 1 >= period {
            bands.push(Band {
                upper: out.upper,
                middle: out.average,
                lower: out.lower,
            });
        }
    }

    Ok(bands)
}

/// Bollinger %B: (price - lower) / (upper - lower)
///
/// `None` where the band has zero width.
pub fn percent_b(
    values: &[f64],
    period: usize,
    num_std: f64,
) -> Result<Vec<Option<f64>>, IndicatorError> {
    let bands = bollinger_bands(values, period, num_std)?;
    let prices = &values[period - 1..];

    Ok(prices
        .iter()
        .zip(bands.iter())
        .map(|(&price, band)| {
            let width = band.upper - band.lower;
            if width.abs() < f64::EPSILON {
                None
            } else {
                Some((price - band.lower) / width)
            }
        })
        .collect())
}

/// True when the series moved from at/below `threshold` to strictly above it
/// on the most recent sample
pub fn crossed_above(series: &[f64], threshold: f64) -> bool {
    match series {
        [.., prev, last] => *prev <= threshold && *last > threshold,
        _ => false,
    }
}

/// %B re-entering the lower band from below on the latest sample
pub fn percent_b_crossed_above_zero(series: &[Option<f64>]) -> bool {
    match series {
        [.., Some(prev), Some(last)] => *prev <= 0.0 && *last > 0.0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rsi_insufficient_data() {
        let values = vec![1.0, 2.0, 3.0];
        assert_eq!(
            rsi(&values, 3),
            Err(IndicatorError::InsufficientData {
                required: 4,
                available: 3
            })
        );
        assert_eq!(rsi(&values, 0), Err(IndicatorError::InvalidPeriod(0)));
    }

    #[test]
    fn test_rsi_length_is_tail_aligned() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + (i % 4) as f64).collect();
        let result = rsi(&values, 14).unwrap();
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn test_rsi_wilder_reference() {
        // Deltas: +1, -1, +2, -1, then +1
        let values = vec![10.0, 11.0, 10.0, 12.0, 11.0, 12.0];
        let result = rsi(&values, 4).unwrap();

        // First: avg gain 3/4, avg loss 2/4 -> rs 1.5 -> 60
        assert_relative_eq!(result[0], 60.0, epsilon = 1e-9);
        // Second: gain (0.75*3+1)/4 = 0.8125, loss (0.5*3)/4 = 0.375
        let rs = 0.8125 / 0.375;
        assert_relative_eq!(result[1], 100.0 - 100.0 / (1.0 + rs), epsilon = 1e-9);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let values: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let result = rsi(&values, 14).unwrap();
        assert!(result.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_bollinger_bands_flat_series() {
        let values = vec![5.0; 25];
        let bands = bollinger_bands(&values, 20, 2.0).unwrap();
        assert_eq!(bands.len(), 6);
        for band in bands {
            assert_relative_eq!(band.middle, 5.0, epsilon = 1e-9);
            assert_relative_eq!(band.upper, 5.0, epsilon = 1e-9);
            assert_relative_eq!(band.lower, 5.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_percent_b_zero_width_is_none() {
        let values = vec![5.0; 25];
        let pb = percent_b(&values, 20, 2.0).unwrap();
        assert!(pb.iter().all(|v| v.is_none()));
        assert!(!percent_b_crossed_above_zero(&pb));
    }

    #[test]
    fn test_percent_b_middle_is_half() {
        let values = vec![1.0, 3.0, 1.0, 3.0, 2.0];
        let pb = percent_b(&values, 5, 2.0).unwrap();
        assert_eq!(pb.len(), 1);
        assert_relative_eq!(pb[0].unwrap(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_percent_b_reentry_signal() {
        // Price drops below the lower band, then bounces back inside
        let mut values = vec![100.0; 19];
        values.extend([101.0, 99.0, 100.0, 80.0, 95.0]);
        let pb = percent_b(&values, 20, 2.0).unwrap();
        let tail = &pb[pb.len() - 2..];
        assert!(tail[0].unwrap() <= 0.0);
        assert!(tail[1].unwrap() > 0.0);
        assert!(percent_b_crossed_above_zero(&pb));
    }

    #[test]
    fn test_crossed_above() {
        assert!(crossed_above(&[25.0, 30.0, 31.0], 30.0));
        assert!(!crossed_above(&[25.0, 29.0, 30.0], 30.0));
        assert!(!crossed_above(&[35.0, 40.0], 30.0));
        assert!(!crossed_above(&[10.0, 20.0], 30.0));
        assert!(!crossed_above(&[31.0], 30.0));
        assert!(!crossed_above(&[], 30.0));
    }
}
