pub mod policy;
pub mod risk_monitor;
pub mod state_machine;

pub use policy::{decide, evaluate, Action, Decision, PolicyRule};
pub use risk_monitor::{PairPnl, RiskMonitor, RiskOutcome, RiskTrigger, ThresholdRiskMonitor};
pub use state_machine::{transition, Phase, PositionState, TransitionError};
