//! Errors raised by the external collaborators of the execution loop.

use thiserror::Error;

/// Errors returned by a [`BrokerGateway`](crate::traits::BrokerGateway).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The broker refused the order or close request.
    #[error("order rejected for {symbol}: {reason}")]
    OrderRejected {
        /// Instrument the request was for.
        symbol: String,
        /// Rejection reason reported by the broker.
        reason: String,
    },

    /// No live price could be obtained for the instrument.
    #[error("no quote available for {0}")]
    QuoteUnavailable(String),

    /// Connectivity or API failure.
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

impl BrokerError {
    /// Creates an order rejection for `symbol`.
    #[must_use]
    pub fn rejected(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OrderRejected {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by a [`SignalProvider`](crate::traits::SignalProvider).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// No recent spread data exists for the pair.
    #[error("insufficient spread data for {pair}: {detail}")]
    InsufficientData {
        /// Pair the signal was requested for, as `FIRST/SECOND`.
        pair: String,
        /// What was missing or stale.
        detail: String,
    },

    /// The provider itself failed (unreadable source, malformed data).
    #[error("signal provider failed: {0}")]
    Provider(String),
}

impl SignalError {
    #[must_use]
    pub fn insufficient(pair: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InsufficientData {
            pair: pair.into(),
            detail: detail.into(),
        }
    }

    /// True for the recoverable "nothing to act on yet" case.
    #[must_use]
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
