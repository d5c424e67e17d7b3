//! Buy-the-dip command: evaluate active 3Commas deals once

use anyhow::{Context, Result};
use dca_bots::binance::is_valid_interval;
use dca_bots::evaluator::{DealEvaluator, DealOutcome};
use dca_bots::policy::DecisionPolicy;
use dca_bots::threecommas::ThreeCommasClient;
use dca_bots::Config;
use std::sync::Arc;
use tracing::{info, warn};

pub fn run(config: Config, dry_run: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_async(config, dry_run))
}

async fn run_async(config: Config, dry_run: bool) -> Result<()> {
    let Some(deals) = config.deals.clone() else {
        warn!("No deals section configured, nothing to do");
        return Ok(());
    };
    let Some(credentials) = config.trade_manager.credentials() else {
        warn!("3Commas credentials not set, nothing to do");
        return Ok(());
    };

    let policy = DecisionPolicy::new(deals.policy.clone());
    if policy.needs_signal() && !is_valid_interval(&deals.signal.interval) {
        warn!("Invalid candle interval {:?}, nothing to do", deals.signal.interval);
        return Ok(());
    }
    info!(
        gates = ?policy.config().gates,
        quantity_rule = ?policy.config().quantity_rule,
        "Decision policy loaded"
    );

    let trade_manager = ThreeCommasClient::new(credentials)
        .context("Failed to create 3Commas client")?
        .with_base_url(config.trade_manager.base_url.clone());
    let market = super::binance_client(&config)?;

    if dry_run {
        info!("[DRY RUN] Add-funds requests will not be submitted");
    }

    let evaluator = DealEvaluator::new(
        Arc::new(trade_manager),
        market,
        policy,
        deals.signal.clone(),
        super::notifier(&config)?,
    )
    .with_filter(deals.filter.clone())
    .with_unit_timeout(deals.unit_timeout())
    .with_dry_run(dry_run);

    let reports = evaluator.run().await?;

    let placed = reports.iter().filter(|r| r.is_placed()).count();
    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, DealOutcome::Failed(_) | DealOutcome::TimedOut))
        .count();
    info!(
        "Evaluated {} deals: {} orders placed, {} failed",
        reports.len(),
        placed,
        failed
    );
    Ok(())
}
