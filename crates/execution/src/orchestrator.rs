//! The pairs strategy execution loop.
//!
//! Each iteration runs the risk check, reads the latest signal, asks the
//! policy for an action and executes it at the broker. The position phase is
//! committed only after every order behind an action is confirmed.

use pairs_trade_core::position_sizing::{equity_base_quantity, hedge_leg_quantities};
use pairs_trade_core::{
    BrokerError, BrokerGateway, ConfigError, InstrumentPair, LegQuantities, OrderConfirmation,
    Side, SignalError, SignalProvider, Sizing, SizingError, StrategyConfig, StrategySettings,
};
use pairs_trade_strategy::{
    decide, Action, Phase, PositionState, RiskMonitor, RiskTrigger, ThresholdRiskMonitor,
    TransitionError,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::events::{EventSink, StrategyEvent, TracingSink};
use crate::stop::StopHandle;

// =============================================================================
// Start-up
// =============================================================================

/// Explicit operator go-ahead for the first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    #[must_use]
    pub const fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Declined
        }
    }

    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Failures that prevent the loop from starting. Nothing was traded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupError {
    #[error("account already holds {quantity} {symbol}; flatten it before starting")]
    AlreadyInPosition { symbol: String, quantity: Decimal },

    #[error("broker error during start-up: {0}")]
    Broker(#[from] BrokerError),

    #[error("invalid strategy configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("could not read the model hedge ratio: {0}")]
    Signal(#[from] SignalError),
}

/// Builds a validated config from file settings.
///
/// When the settings leave `hedge_ratio` unset the latest signal's ratio is
/// used; otherwise the provider is not consulted.
///
/// # Errors
/// [`StartupError::Config`] for invalid settings and
/// [`StartupError::Signal`] if the fallback ratio cannot be read.
pub async fn resolve_config<S>(
    settings: &StrategySettings,
    signals: &S,
) -> Result<StrategyConfig, StartupError>
where
    S: SignalProvider + ?Sized,
{
    let fallback = match settings.hedge_ratio {
        Some(ratio) => ratio,
        None => {
            let pair = InstrumentPair::from_list(&settings.pair)?;
            let signal = signals.latest_signal(pair.first(), pair.second()).await?;
            info!(
                pair = %pair,
                hedge_ratio = %signal.hedge_ratio,
                "Using model hedge ratio"
            );
            signal.hedge_ratio
        }
    };

    Ok(StrategyConfig::from_settings(settings, fallback)?)
}

// =============================================================================
// Termination
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("sizing failed: {0}")]
    Sizing(#[from] SizingError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Where in the loop a broker-side failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    RiskCheck,
    Action(Action),
    RiskExit(RiskTrigger),
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RiskCheck => write!(f, "risk check"),
            Self::Action(action) => write!(f, "{action}"),
            Self::RiskExit(trigger) => write!(f, "{trigger} exit"),
        }
    }
}

/// A failed transition. `phase` is the last confirmed phase, which the loop
/// left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerFailure {
    pub stage: FailureStage,
    pub phase: Phase,
    pub error: ExecutionError,
    /// Orders that did fill before the failure; they are not rolled back.
    pub confirmed_orders: Vec<OrderConfirmation>,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// Confirmation was declined; only position queries were made.
    Aborted,
    StopLoss { pnl_pct: Decimal },
    TakeProfit { pnl_pct: Decimal },
    BrokerError(BrokerFailure),
    /// The signal provider failed with something other than missing data.
    SignalFailure { error: SignalError },
    /// Stopped through the [`StopHandle`]; any open position is left as is.
    Cancelled { phase: Phase },
}

impl TerminationReason {
    #[must_use]
    pub const fn is_risk_exit(&self) -> bool {
        matches!(self, Self::StopLoss { .. } | Self::TakeProfit { .. })
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted => write!(f, "aborted before the first order"),
            Self::StopLoss { pnl_pct } => write!(f, "stop loss hit at {pnl_pct} pnl"),
            Self::TakeProfit { pnl_pct } => write!(f, "take profit hit at {pnl_pct} pnl"),
            Self::BrokerError(failure) => write!(
                f,
                "broker failure during {} while {}: {} ({} orders filled)",
                failure.stage,
                failure.phase,
                failure.error,
                failure.confirmed_orders.len()
            ),
            Self::SignalFailure { error } => write!(f, "{error}"),
            Self::Cancelled { phase } => write!(f, "cancelled while {phase}"),
        }
    }
}

// =============================================================================
// Strategy Runner
// =============================================================================

/// Owns one strategy session: config, collaborators and the position state.
pub struct StrategyRunner<S, B, R> {
    config: StrategyConfig,
    signals: S,
    broker: B,
    risk: R,
    sink: Arc<dyn EventSink>,
    state: PositionState,
    stop: StopHandle,
}

impl<S, B, R> std::fmt::Debug for StrategyRunner<S, B, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRunner")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("stopped", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}

impl<S, B> StrategyRunner<S, B, ThresholdRiskMonitor>
where
    S: SignalProvider,
    B: BrokerGateway,
{
    /// Runner using the config's own thresholds for the risk check.
    #[must_use]
    pub fn with_threshold_risk(config: StrategyConfig, signals: S, broker: B) -> Self {
        let risk = ThresholdRiskMonitor::from_config(&config);
        Self::new(config, signals, broker, risk)
    }
}

impl<S, B, R> StrategyRunner<S, B, R>
where
    S: SignalProvider,
    B: BrokerGateway,
    R: RiskMonitor,
{
    #[must_use]
    pub fn new(config: StrategyConfig, signals: S, broker: B, risk: R) -> Self {
        Self {
            config,
            signals,
            broker,
            risk,
            sink: Arc::new(TracingSink),
            state: PositionState::new(),
            stop: StopHandle::new(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Uses an externally created stop handle, e.g. one wired to Ctrl-C.
    #[must_use]
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    #[must_use]
    pub const fn config(&self) -> &StrategyConfig {
        &self.config
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[must_use]
    pub const fn broker(&self) -> &B {
        &self.broker
    }

    /// Runs the loop until a risk exit, a failure or cancellation.
    ///
    /// # Errors
    /// Returns [`StartupError`] if the broker already holds either leg or
    /// cannot be queried at start. Every later outcome is a
    /// [`TerminationReason`].
    pub async fn run(
        &mut self,
        confirmation: Confirmation,
    ) -> Result<TerminationReason, StartupError> {
        self.ensure_flat_at_broker().await?;

        if !confirmation.is_confirmed() {
            info!(pair = %self.config.pair(), "Confirmation declined, not trading");
            return Ok(self.finish(TerminationReason::Aborted));
        }

        self.sink.emit(StrategyEvent::Started {
            pair: self.config.pair().clone(),
            hedge_ratio: self.config.hedge_ratio(),
            leverage: self.config.leverage(),
            poll_interval_secs: self.config.poll_interval().as_secs(),
        });

        loop {
            if self.stop.is_stopped() {
                let phase = self.state.phase();
                return Ok(self.finish(TerminationReason::Cancelled { phase }));
            }

            if let Some(reason) = self.poll_once().await {
                return Ok(self.finish(reason));
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval()) => {}
                () = self.stop.stopped() => {
                    debug!("Stop requested while sleeping");
                }
            }
        }
    }

    async fn ensure_flat_at_broker(&self) -> Result<(), StartupError> {
        for symbol in self.config.pair().legs() {
            if let Some(holding) = self.broker.position(symbol).await? {
                if !holding.is_flat() {
                    warn!(
                        symbol = %symbol,
                        quantity = %holding.quantity,
                        "Existing position at broker, refusing to start"
                    );
                    return Err(StartupError::AlreadyInPosition {
                        symbol: symbol.to_string(),
                        quantity: holding.quantity,
                    });
                }
            }
        }
        Ok(())
    }

    /// One iteration. Returns a reason when the loop must end.
    async fn poll_once(&mut self) -> Option<TerminationReason> {
        let phase = self.state.phase();

        let outcome = match self.risk.check(phase, self.config.pair(), &self.broker).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, phase = %phase, "Risk check failed");
                return Some(TerminationReason::BrokerError(BrokerFailure {
                    stage: FailureStage::RiskCheck,
                    phase,
                    error: e.into(),
                    confirmed_orders: Vec::new(),
                }));
            }
        };
        self.sink.emit(StrategyEvent::RiskChecked {
            phase,
            pnl_pct: outcome.pnl_pct,
            trigger: outcome.trigger,
        });

        if let Some(trigger) = outcome.trigger {
            let pnl_pct = outcome.pnl_pct.unwrap_or_default();
            return Some(self.exit_on_risk(trigger, pnl_pct).await);
        }

        let pair = self.config.pair();
        let signal = match self.signals.latest_signal(pair.first(), pair.second()).await {
            Ok(signal) => signal,
            Err(e) if e.is_insufficient_data() => {
                self.sink.emit(StrategyEvent::SignalUnavailable {
                    reason: e.to_string(),
                });
                return None;
            }
            Err(e) => {
                error!(error = %e, "Signal provider failed");
                return Some(TerminationReason::SignalFailure { error: e });
            }
        };

        let decision = decide(phase, signal.value);
        self.sink.emit(StrategyEvent::SignalReceived {
            signal: signal.value,
            as_of: signal.as_of,
            action: decision.action,
            rule: decision.rule,
        });

        if decision.action == Action::Hold {
            return None;
        }

        match self.execute(decision.action).await {
            Ok(()) => None,
            Err(failure) => Some(TerminationReason::BrokerError(failure)),
        }
    }

    /// Places the orders behind `action` and commits the phase once all are
    /// confirmed.
    async fn execute(&mut self, action: Action) -> Result<(), BrokerFailure> {
        let from = self.state.phase();
        let stage = FailureStage::Action(action);

        if let Err(e) = self.state.validate(action) {
            return Err(self.failure(stage, e.into(), Vec::new()));
        }

        match action {
            Action::EnterLong => self.enter(stage, Side::Buy).await?,
            Action::EnterShort => self.enter(stage, Side::Sell).await?,
            Action::Exit => self.close_both(stage).await?,
            Action::Hold => return Ok(()),
        }

        self.commit(from, action, stage)
    }

    /// Opens both legs; `first_side` is the side of the first leg.
    async fn enter(&self, stage: FailureStage, first_side: Side) -> Result<(), BrokerFailure> {
        let legs = self
            .size_legs()
            .await
            .map_err(|e| self.failure(stage, e, Vec::new()))?;

        let pair = self.config.pair();
        let orders = [
            (pair.first(), first_side, legs.first),
            (pair.second(), first_side.opposite(), legs.second),
        ];

        let mut confirmed = Vec::with_capacity(orders.len());
        for (symbol, side, quantity) in orders {
            match self.broker.place_order(symbol, side, quantity).await {
                Ok(confirmation) => {
                    self.sink.emit(StrategyEvent::OrderConfirmed(confirmation.clone()));
                    confirmed.push(confirmation);
                }
                Err(e) => {
                    error!(
                        symbol = %symbol,
                        side = %side,
                        quantity = %quantity,
                        error = %e,
                        "Order failed"
                    );
                    return Err(self.failure(stage, e.into(), confirmed));
                }
            }
        }

        Ok(())
    }

    async fn size_legs(&self) -> Result<LegQuantities, ExecutionError> {
        let base = match self.config.sizing() {
            Sizing::Units { base_quantity } => base_quantity,
            Sizing::EquityFraction { fraction } => {
                let equity = self.broker.account_equity().await?;
                let price = self.broker.quote(self.config.pair().first()).await?;
                equity_base_quantity(equity, fraction, price)?
            }
        };

        Ok(hedge_leg_quantities(
            base,
            self.config.leverage(),
            self.config.hedge_ratio(),
        )?)
    }

    async fn close_both(&self, stage: FailureStage) -> Result<(), BrokerFailure> {
        for symbol in self.config.pair().legs() {
            if let Err(e) = self.broker.close_position(symbol).await {
                error!(symbol = %symbol, error = %e, "Close failed");
                return Err(self.failure(stage, e.into(), Vec::new()));
            }
        }
        Ok(())
    }

    async fn exit_on_risk(&mut self, trigger: RiskTrigger, pnl_pct: Decimal) -> TerminationReason {
        let from = self.state.phase();
        let stage = FailureStage::RiskExit(trigger);

        if let Err(failure) = self.close_both(stage).await {
            return TerminationReason::BrokerError(failure);
        }
        if let Err(failure) = self.commit(from, Action::Exit, stage) {
            return TerminationReason::BrokerError(failure);
        }

        match trigger {
            RiskTrigger::StopLoss => TerminationReason::StopLoss { pnl_pct },
            RiskTrigger::TakeProfit => TerminationReason::TakeProfit { pnl_pct },
        }
    }

    fn commit(
        &mut self,
        from: Phase,
        action: Action,
        stage: FailureStage,
    ) -> Result<(), BrokerFailure> {
        match self.state.commit(action) {
            Ok(to) => {
                if to != from {
                    self.sink.emit(StrategyEvent::PhaseChanged { from, to });
                }
                Ok(())
            }
            Err(e) => Err(self.failure(stage, e.into(), Vec::new())),
        }
    }

    fn failure(
        &self,
        stage: FailureStage,
        error: ExecutionError,
        confirmed_orders: Vec<OrderConfirmation>,
    ) -> BrokerFailure {
        BrokerFailure {
            stage,
            phase: self.state.phase(),
            error,
            confirmed_orders,
        }
    }

    fn finish(&self, reason: TerminationReason) -> TerminationReason {
        self.sink.emit(StrategyEvent::terminated(&reason));
        reason
    }
}

/// Runs one strategy session with the default tracing sink.
///
/// # Errors
/// See [`StrategyRunner::run`].
pub async fn run_strategy<S, B, R>(
    config: StrategyConfig,
    signals: S,
    broker: B,
    risk: R,
    confirmation: Confirmation,
) -> Result<TerminationReason, StartupError>
where
    S: SignalProvider,
    B: BrokerGateway,
    R: RiskMonitor,
{
    StrategyRunner::new(config, signals, broker, risk)
        .run(confirmation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn confirmation_from_flag() {
        assert_eq!(Confirmation::from_flag(true), Confirmation::Confirmed);
        assert!(!Confirmation::from_flag(false).is_confirmed());
    }

    #[test]
    fn termination_reasons_describe_themselves() {
        let reason = TerminationReason::StopLoss {
            pnl_pct: dec!(-0.06),
        };
        assert_eq!(reason.to_string(), "stop loss hit at -0.06 pnl");
        assert!(reason.is_risk_exit());

        let reason = TerminationReason::BrokerError(BrokerFailure {
            stage: FailureStage::Action(Action::EnterLong),
            phase: Phase::Flat,
            error: BrokerError::rejected("PEP", "no borrow").into(),
            confirmed_orders: Vec::new(),
        });
        assert_eq!(
            reason.to_string(),
            "broker failure during enter_long while flat: order rejected for PEP: no borrow (0 orders filled)"
        );
    }

    #[test]
    fn startup_error_names_the_leg() {
        let err = StartupError::AlreadyInPosition {
            symbol: "KO".to_string(),
            quantity: dec!(10),
        };
        assert_eq!(
            err.to_string(),
            "account already holds 10 KO; flatten it before starting"
        );
    }

    #[test]
    fn config_errors_convert() {
        let err: StartupError = InstrumentPair::new("KO", "ko").unwrap_err().into();
        assert!(matches!(err, StartupError::Config(ConfigError::DuplicateInstrument(_))));
    }
}
