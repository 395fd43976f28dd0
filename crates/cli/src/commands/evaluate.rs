//! `evaluate` command: dry-run of the decision policy.

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use pairs_trade_core::SignalValue;
use pairs_trade_strategy::{decide, Phase};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseArg {
    Flat,
    LongHedge,
    ShortHedge,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Flat => Self::Flat,
            PhaseArg::LongHedge => Self::LongHedge,
            PhaseArg::ShortHedge => Self::ShortHedge,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Current position phase
    #[arg(long, value_enum, default_value = "flat")]
    pub phase: PhaseArg,

    /// Signal value: 1, -1 or 0
    #[arg(long, allow_negative_numbers = true)]
    pub signal: i8,
}

pub fn run(args: &EvaluateArgs) -> Result<()> {
    let signal = SignalValue::try_from(args.signal).map_err(|e| anyhow!(e))?;
    let phase = Phase::from(args.phase);
    let decision = decide(phase, signal);

    println!(
        "{phase} + {signal} ({}) -> {} [{:?}]",
        i8::from(signal),
        decision.action,
        decision.rule
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_signal() {
        let args = EvaluateArgs {
            phase: PhaseArg::Flat,
            signal: 3,
        };
        assert!(run(&args).is_err());
    }

    #[test]
    fn phase_arg_maps_to_phase() {
        assert_eq!(Phase::from(PhaseArg::ShortHedge), Phase::ShortHedge);
    }
}
