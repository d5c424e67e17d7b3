//! Recurring buy command

use anyhow::Result;
use dca_bots::recurring::RecurringBuy;
use dca_bots::Config;
use tracing::warn;

pub fn run(config: Config, dry_run: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_async(config, dry_run))
}

async fn run_async(config: Config, dry_run: bool) -> Result<()> {
    let Some(recurring) = config.recurring.clone() else {
        warn!("No recurring section configured, nothing to do");
        return Ok(());
    };
    if config.exchange.credentials().is_none() {
        warn!("Binance credentials not set, nothing to do");
        return Ok(());
    }

    let client = super::binance_client(&config)?;
    RecurringBuy::new(client.clone(), client, super::notifier(&config)?)
        .with_dry_run(dry_run)
        .run(&recurring)
        .await?;
    Ok(())
}
