//! Pairs strategy execution.
//!
//! [`StrategyRunner`] drives the poll loop against any
//! [`BrokerGateway`](pairs_trade_core::BrokerGateway); [`PaperBroker`] is the
//! in-memory gateway used when no live account is wired in.

pub mod events;
pub mod orchestrator;
pub mod paper;
pub mod stop;

pub use events::{EventSink, RecordingSink, StrategyEvent, TracingSink};
pub use orchestrator::{
    resolve_config, run_strategy, BrokerFailure, Confirmation, ExecutionError, FailureStage,
    StartupError, StrategyRunner, TerminationReason,
};
pub use paper::{PaperBroker, StaticQuotes};
pub use stop::StopHandle;
