//! Configuration management
//!
//! Handles loading and parsing of the JSON configuration file with
//! environment variable support for API credentials. Every bot section is
//! optional; a missing section makes that command a no-op.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::auth::Credentials;
use crate::binance::BINANCE_API_BASE;
use crate::evaluator::DealFilter;
use crate::policy::PolicyConfig;
use crate::recurring::RecurringConfig;
use crate::signal::SignalConfig;
use crate::threecommas::THREECOMMAS_API_BASE;
use crate::tracker::SymbolMap;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub trade_manager: TradeManagerConfig,
    #[serde(default)]
    pub deals: Option<DealsConfig>,
    #[serde(default)]
    pub dca: Option<DcaConfig>,
    #[serde(default)]
    pub recurring: Option<RecurringConfig>,
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from `path` if given, otherwise from environment variables only
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                info!("No config file given, using defaults and environment");
                let mut config = Config::default();
                config.apply_env_overrides(|name| std::env::var(name).ok());
                Ok(config)
            }
        }
    }

    /// Credentials and webhook URL from the environment take precedence
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("BINANCE_API_KEY") {
            self.exchange.api_key = Some(v);
        }
        if let Some(v) = lookup("BINANCE_API_SECRET") {
            self.exchange.api_secret = Some(v);
        }
        if let Some(v) = lookup("THREECOMMAS_API_KEY") {
            self.trade_manager.api_key = Some(v);
        }
        if let Some(v) = lookup("THREECOMMAS_API_SECRET") {
            self.trade_manager.api_secret = Some(v);
        }
        if let Some(v) = lookup("NOTIFY_WEBHOOK_URL") {
            self.notification.webhook_url = Some(v);
        }
    }
}

fn credentials(key: &Option<String>, secret: &Option<String>) -> Option<Credentials> {
    match (key, secret) {
        (Some(k), Some(s)) if !k.is_empty() && !s.is_empty() => Some(Credentials::new(k, s)),
        _ => None,
    }
}

fn default_unit_timeout_secs() -> u64 {
    30
}

/// Binance exchange settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_secret: Option<String>,
    #[serde(default = "default_binance_url")]
    pub base_url: String,
    /// Candles fetched per indicator evaluation
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,
}

fn default_binance_url() -> String {
    BINANCE_API_BASE.to_string()
}

fn default_candle_limit() -> u32 {
    500
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: default_binance_url(),
            candle_limit: default_candle_limit(),
        }
    }
}

impl ExchangeConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        credentials(&self.api_key, &self.api_secret)
    }
}

/// 3Commas settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeManagerConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_secret: Option<String>,
    #[serde(default = "default_threecommas_url")]
    pub base_url: String,
}

fn default_threecommas_url() -> String {
    THREECOMMAS_API_BASE.to_string()
}

impl Default for TradeManagerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: default_threecommas_url(),
        }
    }
}

impl TradeManagerConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        credentials(&self.api_key, &self.api_secret)
    }
}

/// Buy-the-dip deal evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealsConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub filter: DealFilter,
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,
}

impl Default for DealsConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            signal: SignalConfig::default(),
            filter: DealFilter::default(),
            unit_timeout_secs: default_unit_timeout_secs(),
        }
    }
}

impl DealsConfig {
    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }
}

/// Position tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaConfig {
    /// Per-symbol settings, keyed by exchange symbol
    #[serde(default)]
    pub symbols: SymbolMap,
    /// Fetch the symbol map from this URL instead of `symbols`
    #[serde(default)]
    pub config_url: Option<String>,
    /// SQLite file for position records; in-memory when absent
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,
}

impl Default for DcaConfig {
    fn default() -> Self {
        Self {
            symbols: SymbolMap::new(),
            config_url: None,
            database: None,
            unit_timeout_secs: default_unit_timeout_secs(),
        }
    }
}

impl DcaConfig {
    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    /// Symbol map, fetched from `config_url` when set
    pub async fn resolve_symbols(&self) -> Result<SymbolMap> {
        let Some(url) = &self.config_url else {
            return Ok(self.symbols.clone());
        };
        info!("Fetching DCA symbol map from {}", url);
        let symbols = reqwest::get(url)
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Symbol map request to {} failed", url))?
            .json::<SymbolMap>()
            .await
            .context("Failed to parse symbol map JSON")?;
        Ok(symbols)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Gate, QuantityRule};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_has_no_sections() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.deals.is_none());
        assert!(config.dca.is_none());
        assert!(config.recurring.is_none());
        assert_eq!(config.exchange.base_url, BINANCE_API_BASE);
        assert!(config.exchange.credentials().is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let json = r#"{
            "deals": {
                "policy": {"gates": ["profitability", "cooldown", "signal"], "quantity_rule": "replay_last"},
                "signal": {"interval": "5m", "indicator": {"kind": "rsi", "period": 14, "oversold": 30}},
                "filter": {"quote": ["USDT"]}
            },
            "dca": {
                "symbols": {"BTCUSDT": {"quoteOrderQty": 15, "takeProfit": 1.5, "accumulationOrders": 4}},
                "database": "data/positions.db"
            },
            "recurring": {"base_asset": "ETH", "quote_order_qty": "25"},
            "notification": {"webhook_url": "https://hooks.example.com/x"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        let deals = config.deals.unwrap();
        assert_eq!(deals.policy.gates.len(), 3);
        assert_eq!(deals.policy.gates[2], Gate::Signal);
        assert_eq!(deals.policy.quantity_rule, QuantityRule::ReplayLast);
        assert_eq!(deals.unit_timeout(), Duration::from_secs(30));
        assert_eq!(deals.filter.quote, vec!["USDT".to_string()]);

        let dca = config.dca.unwrap();
        assert_eq!(dca.symbols["BTCUSDT"].quote_order_qty, dec!(15));
        assert_eq!(dca.database, Some(PathBuf::from("data/positions.db")));

        let recurring = config.recurring.unwrap();
        assert_eq!(recurring.symbol(), "ETHUSDT");
        assert_eq!(recurring.quote_order_qty, dec!(25));
    }

    #[test]
    fn test_env_overrides_credentials() {
        let env: HashMap<&str, &str> = [
            ("BINANCE_API_KEY", "bk"),
            ("BINANCE_API_SECRET", "bs"),
            ("THREECOMMAS_API_KEY", "tk"),
            ("NOTIFY_WEBHOOK_URL", "https://hooks.example.com/y"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.exchange.credentials().unwrap().api_key(), "bk");
        // Key without secret is not usable
        assert!(config.trade_manager.credentials().is_none());
        assert_eq!(
            config.notification.webhook_url.as_deref(),
            Some("https://hooks.example.com/y")
        );
    }

    #[test]
    fn test_sections_built_in_code_keep_default_timeout() {
        assert_eq!(DealsConfig::default().unit_timeout(), Duration::from_secs(30));
        assert_eq!(DcaConfig::default().unit_timeout(), Duration::from_secs(30));

        let dca = DcaConfig {
            database: Some(PathBuf::from("positions.db")),
            ..Default::default()
        };
        assert_eq!(dca.unit_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_resolve_symbols_without_url_uses_inline_map() {
        let dca = DcaConfig::default();
        assert!(dca.resolve_symbols().await.unwrap().is_empty());
    }
}
