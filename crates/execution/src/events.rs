//! Structured events emitted by the strategy loop.

use chrono::{DateTime, Utc};
use pairs_trade_core::{InstrumentPair, OrderConfirmation, SignalValue};
use pairs_trade_strategy::{Action, Phase, PolicyRule, RiskTrigger};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::orchestrator::TerminationReason;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StrategyEvent {
    Started {
        pair: InstrumentPair,
        hedge_ratio: Decimal,
        leverage: Decimal,
        poll_interval_secs: u64,
    },
    RiskChecked {
        phase: Phase,
        pnl_pct: Option<Decimal>,
        trigger: Option<RiskTrigger>,
    },
    SignalReceived {
        signal: SignalValue,
        as_of: DateTime<Utc>,
        action: Action,
        rule: PolicyRule,
    },
    SignalUnavailable {
        reason: String,
    },
    OrderConfirmed(OrderConfirmation),
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    Terminated {
        reason: String,
        #[serde(skip)]
        detail: TerminationReason,
    },
}

impl StrategyEvent {
    pub(crate) fn terminated(reason: &TerminationReason) -> Self {
        Self::Terminated {
            reason: reason.to_string(),
            detail: reason.clone(),
        }
    }
}

/// Receives strategy events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: StrategyEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: StrategyEvent) {
        match event {
            StrategyEvent::Started {
                pair,
                hedge_ratio,
                leverage,
                poll_interval_secs,
            } => info!(
                pair = %pair,
                hedge_ratio = %hedge_ratio,
                leverage = %leverage,
                poll_interval_secs,
                "Pairs strategy starting"
            ),
            StrategyEvent::RiskChecked {
                phase,
                pnl_pct,
                trigger,
            } => match pnl_pct {
                Some(pnl_pct) => info!(
                    phase = %phase,
                    pnl_pct = %pnl_pct,
                    trigger = ?trigger,
                    "Position profit"
                ),
                None => debug!(phase = %phase, "Flat, risk check skipped"),
            },
            StrategyEvent::SignalReceived {
                signal,
                as_of,
                action,
                rule,
            } => info!(
                signal = %signal,
                as_of = %as_of,
                action = %action,
                rule = ?rule,
                "Signal evaluated"
            ),
            StrategyEvent::SignalUnavailable { reason } => {
                warn!(reason = %reason, "No usable signal, holding");
            }
            StrategyEvent::OrderConfirmed(order) => info!(
                order_id = %order.order_id,
                symbol = %order.symbol,
                side = %order.side,
                quantity = %order.quantity,
                price = %order.fill_price,
                "Order filled"
            ),
            StrategyEvent::PhaseChanged { from, to } => {
                info!(from = %from, to = %to, "Position phase changed");
            }
            StrategyEvent::Terminated { reason, .. } => {
                info!(reason = %reason, "Pairs strategy terminated");
            }
        }
    }
}

/// Buffers events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<StrategyEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<StrategyEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Phase changes in the order they happened.
    #[must_use]
    pub fn phase_changes(&self) -> Vec<(Phase, Phase)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                StrategyEvent::PhaseChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: StrategyEvent) {
        self.events.lock().push(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: StrategyEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_clones_share_buffer() {
        let sink = RecordingSink::new();
        let clone = sink.clone();

        clone.emit(StrategyEvent::PhaseChanged {
            from: Phase::Flat,
            to: Phase::LongHedge,
        });
        clone.emit(StrategyEvent::SignalUnavailable {
            reason: "no rows".to_string(),
        });

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.phase_changes(), vec![(Phase::Flat, Phase::LongHedge)]);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = StrategyEvent::PhaseChanged {
            from: Phase::ShortHedge,
            to: Phase::Flat,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"phase_changed","from":"ShortHedge","to":"Flat"}"#);
    }
}
