//! CLI commands for the pairs execution controller.

pub mod evaluate;
pub mod run;
pub mod signal;
pub mod tickers;

pub use evaluate::EvaluateArgs;
pub use run::RunArgs;
pub use signal::SignalArgs;
pub use tickers::TickersArgs;
