//! Stop-loss and take-profit guard on the open hedge.

use async_trait::async_trait;
use pairs_trade_core::{BrokerError, BrokerGateway, Holding, InstrumentPair, StrategyConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state_machine::Phase;

/// Which bound closed the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTrigger {
    StopLoss,
    TakeProfit,
}

impl std::fmt::Display for RiskTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "stop_loss"),
            Self::TakeProfit => write!(f, "take_profit"),
        }
    }
}

/// Result of one risk check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskOutcome {
    pub trigger: Option<RiskTrigger>,
    /// Unrealized `PnL` as a fraction of entry notional, `None` while flat.
    pub pnl_pct: Option<Decimal>,
}

impl RiskOutcome {
    /// Outcome for a flat book.
    #[must_use]
    pub const fn flat() -> Self {
        Self {
            trigger: None,
            pnl_pct: None,
        }
    }

    #[must_use]
    pub const fn triggered(&self) -> bool {
        self.trigger.is_some()
    }
}

#[async_trait]
pub trait RiskMonitor: Send + Sync {
    /// Measures the open hedge against the configured bounds.
    ///
    /// Must not touch the broker when `phase` is flat.
    ///
    /// # Errors
    /// Propagates any position or quote failure from the broker.
    async fn check(
        &self,
        phase: Phase,
        pair: &InstrumentPair,
        broker: &dyn BrokerGateway,
    ) -> Result<RiskOutcome, BrokerError>;
}

/// Combined mark-to-market of both legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairPnl {
    pub unrealized: Decimal,
    pub gross_notional: Decimal,
}

impl PairPnl {
    /// Adds one leg marked at `price`.
    pub fn add_leg(&mut self, holding: &Holding, price: Decimal) {
        self.unrealized += holding.unrealized_pnl(price);
        self.gross_notional += holding.entry_notional();
    }

    /// `PnL` as a fraction of gross entry notional; zero with no notional.
    #[must_use]
    pub fn pct(&self) -> Decimal {
        if self.gross_notional.is_zero() {
            return Decimal::ZERO;
        }
        self.unrealized / self.gross_notional
    }
}

/// Fixed-threshold monitor. A threshold of zero disables that bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdRiskMonitor {
    take_profit_pct: Decimal,
    stop_loss_pct: Decimal,
}

impl ThresholdRiskMonitor {
    #[must_use]
    pub const fn new(take_profit_pct: Decimal, stop_loss_pct: Decimal) -> Self {
        Self {
            take_profit_pct,
            stop_loss_pct,
        }
    }

    #[must_use]
    pub const fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.take_profit_pct(), config.stop_loss_pct())
    }

    /// Classifies a `PnL` fraction. Stop-loss is checked first.
    #[must_use]
    pub fn classify(&self, pnl_pct: Decimal) -> Option<RiskTrigger> {
        if !self.stop_loss_pct.is_zero() && -pnl_pct >= self.stop_loss_pct {
            tracing::warn!(
                pnl_pct = %pnl_pct,
                threshold = %self.stop_loss_pct,
                "Stop loss triggered"
            );
            return Some(RiskTrigger::StopLoss);
        }

        if !self.take_profit_pct.is_zero() && pnl_pct >= self.take_profit_pct {
            tracing::info!(
                pnl_pct = %pnl_pct,
                threshold = %self.take_profit_pct,
                "Take profit triggered"
            );
            return Some(RiskTrigger::TakeProfit);
        }

        None
    }
}

#[async_trait]
impl RiskMonitor for ThresholdRiskMonitor {
    async fn check(
        &self,
        phase: Phase,
        pair: &InstrumentPair,
        broker: &dyn BrokerGateway,
    ) -> Result<RiskOutcome, BrokerError> {
        if phase.is_flat() {
            return Ok(RiskOutcome::flat());
        }

        let mut pnl = PairPnl::default();
        for symbol in pair.legs() {
            // A leg the broker no longer reports contributes nothing
            let Some(holding) = broker.position(symbol).await? else {
                tracing::warn!(symbol = %symbol, phase = %phase, "Leg missing at broker");
                continue;
            };
            if holding.is_flat() {
                continue;
            }
            let price = broker.quote(symbol).await?;
            pnl.add_leg(&holding, price);
        }

        let pnl_pct = pnl.pct();
        Ok(RiskOutcome {
            trigger: self.classify(pnl_pct),
            pnl_pct: Some(pnl_pct),
        })
    }
}
