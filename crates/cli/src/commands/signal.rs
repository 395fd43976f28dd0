//! `signal` command: print the model's current call for the pair.

use anyhow::{Context, Result};
use clap::Args;
use pairs_trade_core::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

use super::run::{load_config, signal_provider};

#[derive(Args, Debug, Clone)]
pub struct SignalArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "PAIRS_CONFIG")]
    pub config: PathBuf,

    /// Spread file to read instead of the configured one
    #[arg(long)]
    pub file: Option<PathBuf>,
}

pub async fn run(args: SignalArgs) -> Result<()> {
    let mut app = load_config(&args.config, None)?;
    if let Some(file) = args.file {
        app.signals.path = file;
    }
    let provider = signal_provider(&app)?;

    let row = provider
        .latest_row()
        .await
        .with_context(|| format!("No signal for {}", provider.pair()))?;

    println!("{}: {}", provider.pair(), row.signal);
    println!("  zscore:      {}", row.zscore);
    println!("  hedge ratio: {}", row.hedge_ratio);
    println!("  as of:       {}", row.timestamp);
    Ok(())
}
