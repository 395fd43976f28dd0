use clap::{Parser, Subcommand};

mod commands;

use commands::{EvaluateArgs, RunArgs, SignalArgs, TickersArgs};

#[derive(Parser)]
#[command(name = "pairs-trade")]
#[command(about = "Pairs trading execution controller", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the strategy loop against the paper broker
    Run(RunArgs),
    /// Print the latest spread signal for the configured pair
    Signal(SignalArgs),
    /// Show which action the policy takes for a phase and signal
    Evaluate(EvaluateArgs),
    /// Print the tickers parsed from a comma-separated file
    Tickers(TickersArgs),
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter()).init();
        }
    }

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Signal(args) => commands::signal::run(args).await?,
        Commands::Evaluate(args) => commands::evaluate::run(&args)?,
        Commands::Tickers(args) => commands::tickers::run(&args)?,
    }

    Ok(())
}
