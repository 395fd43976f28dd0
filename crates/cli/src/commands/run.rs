//! `run` command: the strategy loop against the paper broker.

use anyhow::{Context, Result};
use clap::Args;
use pairs_trade_core::{
    AppConfig, ConfigLoader, InstrumentPair, Sizing, StrategyConfig, DEFAULT_CONFIG_PATH,
};
use pairs_trade_execution::{
    resolve_config, Confirmation, PaperBroker, StopHandle, StrategyRunner, TerminationReason,
};
use pairs_trade_signals::CsvSignalProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "PAIRS_CONFIG")]
    pub config: PathBuf,

    /// Profile overlay, loads `pairs.<profile>.toml` next to the config
    #[arg(long)]
    pub profile: Option<String>,

    /// Confirm the trade plan; without it the session aborts before any order
    #[arg(long, default_value = "false")]
    pub confirm: bool,
}

pub fn load_config(path: &Path, profile: Option<&str>) -> Result<AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile),
        None => ConfigLoader::load_from(path),
    }
}

pub fn signal_provider(app: &AppConfig) -> Result<CsvSignalProvider> {
    let pair = InstrumentPair::from_list(&app.strategy.pair)
        .context("Invalid strategy pair")?;
    let provider = CsvSignalProvider::new(app.signals.path.clone(), pair);
    Ok(match app.signals.max_age_secs {
        Some(secs) => provider.with_max_age(Duration::from_secs(secs)),
        None => provider,
    })
}

fn print_plan(config: &StrategyConfig, confirmed: bool) {
    let pair = config.pair();
    println!("=== Pairs Strategy ===");
    println!("Pair:          {} / {}", pair.first(), pair.second());
    println!("Hedge ratio:   {}", config.hedge_ratio());
    println!("Leverage:      {}", config.leverage());
    match config.sizing() {
        Sizing::Units { base_quantity } => println!("Sizing:        {base_quantity} units"),
        Sizing::EquityFraction { fraction } => println!("Sizing:        {fraction} of equity"),
    }
    println!("Take profit:   {}", config.take_profit_pct());
    println!("Stop loss:     {}", config.stop_loss_pct());
    println!("Poll interval: {}s", config.poll_interval().as_secs());
    if !confirmed {
        println!();
        println!("Not confirmed. Re-run with --confirm to start trading.");
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let app = load_config(&args.config, args.profile.as_deref())?;
    let signals = Arc::new(signal_provider(&app)?);

    let config = resolve_config(&app.strategy, signals.as_ref())
        .await
        .context("Failed to build strategy config")?;
    print_plan(&config, args.confirm);

    let broker = PaperBroker::new(app.paper.clone(), Arc::clone(&signals));
    let stop = StopHandle::new();
    let mut runner =
        StrategyRunner::with_threshold_risk(config, signals, broker).with_stop_handle(stop.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping after the current iteration");
            stop.stop();
        }
    });

    let reason = runner
        .run(Confirmation::from_flag(args.confirm))
        .await
        .context("Strategy failed to start")?;

    let broker = runner.broker();
    info!(
        reason = %reason,
        realized_pnl = %broker.realized_pnl(),
        orders = broker.orders().len(),
        "Session finished"
    );

    println!();
    println!("=== Session Result ===");
    println!("Termination:   {reason}");
    println!("Final phase:   {}", runner.phase());
    println!("Orders filled: {}", broker.orders().len());
    println!("Realized PnL:  {}", broker.realized_pnl());
    println!("Commission:    {}", broker.commission_paid());

    match reason {
        TerminationReason::BrokerError(_) | TerminationReason::SignalFailure { .. } => {
            anyhow::bail!("strategy terminated abnormally: {reason}")
        }
        _ => Ok(()),
    }
}
