//! Position lifecycle state machine.
//!
//! The phase only moves once the broker has confirmed the orders behind an
//! action; callers execute first and [`PositionState::commit`] afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::Action;

/// Lifecycle phase of the pair position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Flat,
    /// Long the first leg, short the second.
    LongHedge,
    /// Short the first leg, long the second.
    ShortHedge,
}

impl Phase {
    pub const ALL: [Self; 3] = [Self::Flat, Self::LongHedge, Self::ShortHedge];

    #[must_use]
    pub const fn is_flat(self) -> bool {
        matches!(self, Self::Flat)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::LongHedge => write!(f, "long_hedge"),
            Self::ShortHedge => write!(f, "short_hedge"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition from {from} via {action}")]
pub struct TransitionError {
    pub from: Phase,
    pub action: Action,
}

/// Target phase of `action` taken from `from`.
///
/// # Errors
/// Returns [`TransitionError`] for entries while in a position (pyramiding or
/// reversal) and for exits while flat.
pub const fn transition(from: Phase, action: Action) -> Result<Phase, TransitionError> {
    match (from, action) {
        (phase, Action::Hold) => Ok(phase),
        (Phase::Flat, Action::EnterLong) => Ok(Phase::LongHedge),
        (Phase::Flat, Action::EnterShort) => Ok(Phase::ShortHedge),
        (Phase::LongHedge | Phase::ShortHedge, Action::Exit) => Ok(Phase::Flat),
        (from, action) => Err(TransitionError { from, action }),
    }
}

/// Mutable position state owned by the execution loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionState {
    phase: Phase,
    entered_at: Option<DateTime<Utc>>,
    transitions: u32,
}

impl PositionState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Flat,
            entered_at: None,
            transitions: 0,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// When the current hedge was opened, `None` while flat.
    #[must_use]
    pub const fn entered_at(&self) -> Option<DateTime<Utc>> {
        self.entered_at
    }

    /// Number of committed phase changes this session.
    #[must_use]
    pub const fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Checks `action` against the current phase without changing it.
    ///
    /// # Errors
    /// Returns [`TransitionError`] if the action is not legal from here.
    pub const fn validate(&self, action: Action) -> Result<Phase, TransitionError> {
        transition(self.phase, action)
    }

    /// Commits a confirmed action and returns the new phase.
    ///
    /// # Errors
    /// Returns [`TransitionError`] and leaves the state untouched if the
    /// action is not legal from the current phase.
    pub fn commit(&mut self, action: Action) -> Result<Phase, TransitionError> {
        let next = transition(self.phase, action)?;
        if next != self.phase {
            self.entered_at = if next.is_flat() { None } else { Some(Utc::now()) };
            self.transitions += 1;
            self.phase = next;
        }
        Ok(next)
    }
}

impl Default for PositionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_flat() {
        let state = PositionState::new();
        assert_eq!(state.phase(), Phase::Flat);
        assert!(state.entered_at().is_none());
    }

    #[test]
    fn full_cycle_long_then_exit() {
        let mut state = PositionState::new();

        assert_eq!(state.commit(Action::EnterLong), Ok(Phase::LongHedge));
        assert!(state.entered_at().is_some());

        assert_eq!(state.commit(Action::Exit), Ok(Phase::Flat));
        assert!(state.entered_at().is_none());
        assert_eq!(state.transitions(), 2);
    }

    #[test]
    fn hold_never_changes_phase() {
        let mut state = PositionState::new();
        state.commit(Action::EnterShort).unwrap();

        assert_eq!(state.commit(Action::Hold), Ok(Phase::ShortHedge));
        assert_eq!(state.transitions(), 1);
    }

    #[test]
    fn rejects_reversal_and_pyramiding() {
        let mut state = PositionState::new();
        state.commit(Action::EnterLong).unwrap();

        let err = state.commit(Action::EnterShort).unwrap_err();
        assert_eq!(
            err,
            TransitionError {
                from: Phase::LongHedge,
                action: Action::EnterShort
            }
        );
        assert!(state.commit(Action::EnterLong).is_err());
        assert_eq!(state.phase(), Phase::LongHedge);
    }

    #[test]
    fn rejects_exit_while_flat() {
        let mut state = PositionState::new();
        assert!(state.commit(Action::Exit).is_err());
        assert_eq!(state.phase(), Phase::Flat);
    }

    #[test]
    fn validate_does_not_mutate() {
        let state = PositionState::new();
        assert_eq!(state.validate(Action::EnterLong), Ok(Phase::LongHedge));
        assert_eq!(state.phase(), Phase::Flat);
    }
}
