//! Oversold signal detection for a symbol
//!
//! Fetches candles through [`MarketData`] and runs the configured indicator.
//! Missing or short data is reported as "no signal" rather than an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiResult;
use crate::exchange::MarketData;
use crate::indicators::{self, IndicatorError};

/// Indicator used for the signal gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorConfig {
    /// RSI crossing above the oversold level
    Rsi { period: usize, oversold: f64 },
    /// Price re-entering the lower Bollinger band (%B crossing above 0)
    Bollinger { period: usize, std_dev: f64 },
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig::Rsi {
            period: 14,
            oversold: 30.0,
        }
    }
}

/// Signal settings for one deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Candle interval, e.g. "1m", "5m", "1d"
    pub interval: String,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    /// RSI period used to report the latest RSI value (for RSI-scaled sizing)
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// Treat a failed candle fetch as a failure of the unit instead of "no signal"
    #[serde(default)]
    pub strict: bool,
}

fn default_rsi_period() -> usize {
    14
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            interval: "5m".to_string(),
            indicator: IndicatorConfig::default(),
            rsi_period: default_rsi_period(),
            strict: false,
        }
    }
}

/// Indicator readings for the latest candle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketSignal {
    /// Configured indicator crossed its threshold upward on the latest sample
    pub oversold_cross: bool,
    /// Latest RSI value, `None` when it could not be computed
    pub rsi: Option<f64>,
}

impl MarketSignal {
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Evaluate the configured indicator over closing prices
pub fn evaluate_closes(closes: &[f64], config: &SignalConfig) -> MarketSignal {
    let oversold_cross = match detect_cross(closes, &config.indicator) {
        Ok(crossed) => crossed,
        Err(e) => {
            debug!("Indicator unavailable, treating as no signal: {}", e);
            false
        }
    };

    let rsi = indicators::rsi(closes, config.rsi_period)
        .ok()
        .and_then(|series| series.last().copied());

    MarketSignal {
        oversold_cross,
        rsi,
    }
}

fn detect_cross(closes: &[f64], indicator: &IndicatorConfig) -> Result<bool, IndicatorError> {
    match indicator {
        IndicatorConfig::Rsi { period, oversold } => {
            let series = indicators::rsi(closes, *period)?;
            Ok(indicators::crossed_above(&series, *oversold))
        }
        IndicatorConfig::Bollinger { period, std_dev } => {
            let series = indicators::percent_b(closes, *period, *std_dev)?;
            Ok(indicators::percent_b_crossed_above_zero(&series))
        }
    }
}

/// Fetches candles and evaluates [`SignalConfig`] for a symbol
pub struct SignalEngine<'a> {
    market: &'a dyn MarketData,
    config: &'a SignalConfig,
}

impl<'a> SignalEngine<'a> {
    pub fn new(market: &'a dyn MarketData, config: &'a SignalConfig) -> Self {
        Self { market, config }
    }

    pub async fn signal(&self, symbol: &str) -> ApiResult<MarketSignal> {
        let candles = match self.market.candles(symbol, &self.config.interval).await {
            Ok(candles) => candles,
            Err(e) if self.config.strict => return Err(e),
            Err(e) => {
                warn!(symbol, "Candle fetch failed, no signal: {}", e);
                return Ok(MarketSignal::absent());
            }
        };

        let closes = indicators::closes(&candles);
        let signal = evaluate_closes(&closes, self.config);
        debug!(
            symbol,
            candles = closes.len(),
            oversold_cross = signal.oversold_cross,
            rsi = ?signal.rsi,
            "Signal evaluated"
        );
        Ok(signal)
    }
}
