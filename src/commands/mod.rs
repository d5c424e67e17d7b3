//! Subcommand implementations and shared client wiring

pub mod dca;
pub mod deals;
pub mod recurring;

use anyhow::Result;
use dca_bots::binance::BinanceClient;
use dca_bots::notify::{LogNotifier, Notifier, WebhookNotifier};
use dca_bots::Config;
use std::sync::Arc;
use tracing::{info, warn};

/// Binance client from the exchange section; unsigned when no credentials
pub fn binance_client(config: &Config) -> Result<Arc<BinanceClient>> {
    let credentials = config.exchange.credentials();
    if credentials.is_none() {
        warn!("Binance credentials not set, only public market data is available");
    }
    let client = BinanceClient::new(credentials)?
        .with_base_url(config.exchange.base_url.clone())
        .with_candle_limit(config.exchange.candle_limit);
    Ok(Arc::new(client))
}

/// Webhook notifier when a URL is configured, log-only otherwise
pub fn notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match &config.notification.webhook_url {
        Some(url) => {
            info!("Notifications go to webhook");
            Ok(Arc::new(WebhookNotifier::new(url.clone())?))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}
