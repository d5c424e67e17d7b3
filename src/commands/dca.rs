//! Position tracker command: one DCA cycle per configured symbol

use anyhow::Result;
use dca_bots::state_manager::create_position_store;
use dca_bots::tracker::{CycleOutcome, PositionTracker};
use dca_bots::Config;
use tracing::{info, warn};

pub fn run(config: Config, dry_run: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_async(config, dry_run))
}

async fn run_async(config: Config, dry_run: bool) -> Result<()> {
    let Some(dca) = config.dca.clone() else {
        warn!("No dca section configured, nothing to do");
        return Ok(());
    };
    if config.exchange.credentials().is_none() {
        warn!("Binance credentials not set, nothing to do");
        return Ok(());
    }

    let symbols = dca.resolve_symbols().await?;
    if symbols.is_empty() {
        warn!("Symbol map is empty, nothing to do");
        return Ok(());
    }
    info!("Symbols: {:?}", symbols.keys().collect::<Vec<_>>());

    let client = super::binance_client(&config)?;
    let store = create_position_store(dca.database.as_deref())?;
    let tracker = PositionTracker::new(client.clone(), client, store, super::notifier(&config)?)
        .with_unit_timeout(dca.unit_timeout())
        .with_dry_run(dry_run);

    let outcomes = tracker.run(&symbols).await;
    for (symbol, outcome) in &outcomes {
        match outcome {
            CycleOutcome::TakeProfitPlaced { order_id, take_profit, .. } => info!(
                symbol = %symbol,
                "Take-profit {} open at {}",
                order_id,
                take_profit.price
            ),
            other => info!(symbol = %symbol, "Cycle finished: {:?}", other),
        }
    }
    Ok(())
}
