//! Signal-to-action decision policy.
//!
//! A pure function of the current phase and the latest signal. It never
//! touches the broker, so it doubles as the dry-run entry point.
//!
//! | Phase       | Signal | Action     | Rule            |
//! |-------------|--------|------------|-----------------|
//! | Flat        | +1     | EnterLong  | `OpenLong`      |
//! | Flat        | -1     | EnterShort | `OpenShort`     |
//! | Flat        | 0      | Hold       | `StayFlat`      |
//! | in position | 0      | Exit       | `ExitOnNeutral` |
//! | in position | same   | Hold       | `NoPyramiding`  |
//! | in position | flip   | Hold       | `NoReversal`    |

use pairs_trade_core::SignalValue;
use serde::{Deserialize, Serialize};

use crate::state_machine::Phase;

/// What the orchestrator should do this poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    EnterLong,
    EnterShort,
    Exit,
    Hold,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnterLong => write!(f, "enter_long"),
            Self::EnterShort => write!(f, "enter_short"),
            Self::Exit => write!(f, "exit"),
            Self::Hold => write!(f, "hold"),
        }
    }
}

/// Which row of the policy table produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyRule {
    OpenLong,
    OpenShort,
    StayFlat,
    ExitOnNeutral,
    NoPyramiding,
    NoReversal,
}

/// An action together with the rule that selected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub rule: PolicyRule,
}

/// Maps `(phase, signal)` to a decision. Total over every combination.
#[must_use]
pub const fn decide(phase: Phase, signal: SignalValue) -> Decision {
    let (action, rule) = match (phase, signal) {
        (Phase::Flat, SignalValue::Long) => (Action::EnterLong, PolicyRule::OpenLong),
        (Phase::Flat, SignalValue::Short) => (Action::EnterShort, PolicyRule::OpenShort),
        (Phase::Flat, SignalValue::Neutral) => (Action::Hold, PolicyRule::StayFlat),

        // Neutral always exits an open hedge
        (Phase::LongHedge | Phase::ShortHedge, SignalValue::Neutral) => {
            (Action::Exit, PolicyRule::ExitOnNeutral)
        }

        (Phase::LongHedge, SignalValue::Long) | (Phase::ShortHedge, SignalValue::Short) => {
            (Action::Hold, PolicyRule::NoPyramiding)
        }
        (Phase::LongHedge, SignalValue::Short) | (Phase::ShortHedge, SignalValue::Long) => {
            (Action::Hold, PolicyRule::NoReversal)
        }
    };

    Decision { action, rule }
}

/// Maps `(phase, signal)` to an action.
#[must_use]
pub const fn evaluate(phase: Phase, signal: SignalValue) -> Action {
    decide(phase, signal).action
}
