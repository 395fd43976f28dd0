//! `tickers` command: print a parsed ticker list.

use anyhow::{Context, Result};
use clap::Args;
use pairs_trade_signals::read_tickers;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct TickersArgs {
    /// Comma-separated ticker file
    #[arg(short, long, default_value = "symbols.csv")]
    pub file: PathBuf,
}

pub fn run(args: &TickersArgs) -> Result<()> {
    let tickers = read_tickers(&args.file)
        .with_context(|| format!("Failed to load tickers from {}", args.file.display()))?;

    println!("{} tickers: {}", tickers.len(), tickers.join(", "));
    Ok(())
}
