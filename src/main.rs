//! DCA bots - main entry point
//!
//! This binary provides three subcommands, each a single run-to-completion
//! invocation meant for a scheduler:
//! - deals: buy-the-dip evaluation of active 3Commas deals
//! - dca: position tracker cycle for each configured Binance symbol
//! - recurring: fixed recurring buy with a balance report

use anyhow::Result;
use clap::{Parser, Subcommand};
use dca_bots::Config;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "dca-bots")]
#[command(about = "DCA and buy-the-dip bots for crypto spot markets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Evaluate and log without placing orders
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate active deals and add manual safety orders
    Deals,

    /// Run one accumulation / take-profit cycle per symbol
    Dca,

    /// Buy a fixed quote amount and report balances
    Recurring,
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // Log file naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(true);

    // Same format, no ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Deals => "deals",
        Commands::Dca => "dca",
        Commands::Recurring => "recurring",
    };
    setup_logging(cli.verbose, command_name)?;

    let config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from: {}", path.display());
    }

    match cli.command {
        Commands::Deals => commands::deals::run(config, cli.dry_run),
        Commands::Dca => commands::dca::run(config, cli.dry_run),
        Commands::Recurring => commands::recurring::run(config, cli.dry_run),
    }
}
