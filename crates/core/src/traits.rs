use crate::error::{BrokerError, SignalError};
use crate::position::Holding;
use crate::types::{OrderConfirmation, Side, Signal};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Source of the latest discrete spread signal for a pair.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Returns the most recent signal for `first`/`second`.
    ///
    /// # Errors
    /// [`SignalError::InsufficientData`] when no recent spread data exists.
    async fn latest_signal(&self, first: &str, second: &str) -> Result<Signal, SignalError>;
}

/// Account, position, quote and order access at the broker.
///
/// Calls are treated as blocking boundaries with no retry; any timeout policy
/// belongs to the implementation.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Current holding in `symbol`, `None` when the account holds nothing.
    async fn position(&self, symbol: &str) -> Result<Option<Holding>, BrokerError>;

    /// Latest trade price for `symbol`.
    async fn quote(&self, symbol: &str) -> Result<Decimal, BrokerError>;

    /// Places a market order and waits for its confirmation.
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderConfirmation, BrokerError>;

    /// Flattens the whole holding in `symbol`.
    async fn close_position(&self, symbol: &str) -> Result<(), BrokerError>;

    /// Total account equity.
    async fn account_equity(&self) -> Result<Decimal, BrokerError>;
}

/// Live price lookup used by simulated brokers.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn price(&self, symbol: &str) -> Result<Decimal, BrokerError>;
}

#[async_trait]
impl<T: SignalProvider + ?Sized> SignalProvider for Arc<T> {
    async fn latest_signal(&self, first: &str, second: &str) -> Result<Signal, SignalError> {
        (**self).latest_signal(first, second).await
    }
}

#[async_trait]
impl<T: BrokerGateway + ?Sized> BrokerGateway for Arc<T> {
    async fn position(&self, symbol: &str) -> Result<Option<Holding>, BrokerError> {
        (**self).position(symbol).await
    }

    async fn quote(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        (**self).quote(symbol).await
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderConfirmation, BrokerError> {
        (**self).place_order(symbol, side, quantity).await
    }

    async fn close_position(&self, symbol: &str) -> Result<(), BrokerError> {
        (**self).close_position(symbol).await
    }

    async fn account_equity(&self) -> Result<Decimal, BrokerError> {
        (**self).account_equity().await
    }
}

#[async_trait]
impl<T: QuoteSource + ?Sized> QuoteSource for Arc<T> {
    async fn price(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        (**self).price(symbol).await
    }
}
