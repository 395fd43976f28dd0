//! Paper trading broker for running the strategy without a live account.
//!
//! Orders fill immediately and in full at the quote source's current price.
//! Cash, holdings and realized `PnL` are tracked in memory for the session.

use async_trait::async_trait;
use chrono::Utc;
use pairs_trade_core::{
    BrokerError, BrokerGateway, Holding, OrderConfirmation, PaperBrokerConfig, QuoteSource, Side,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// Quote Sources
// =============================================================================

/// Fixed, manually updated prices.
#[derive(Debug, Default)]
pub struct StaticQuotes {
    prices: RwLock<HashMap<String, Decimal>>,
}

impl StaticQuotes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(self, symbol: impl Into<String>, price: Decimal) -> Self {
        self.set(symbol, price);
        self
    }

    pub fn set(&self, symbol: impl Into<String>, price: Decimal) {
        self.prices.write().insert(symbol.into(), price);
    }
}

#[async_trait]
impl QuoteSource for StaticQuotes {
    async fn price(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        self.prices
            .read()
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::QuoteUnavailable(symbol.to_string()))
    }
}

// =============================================================================
// Internal State
// =============================================================================

#[derive(Debug)]
struct PaperState {
    cash: Decimal,
    holdings: HashMap<String, Holding>,
    /// Last known price per symbol, used to mark equity.
    marks: HashMap<String, Decimal>,
    orders: Vec<OrderConfirmation>,
    realized_pnl: Decimal,
    commission_paid: Decimal,
    rejected_orders: u32,
}

impl PaperState {
    fn new(initial_equity: Decimal) -> Self {
        Self {
            cash: initial_equity,
            holdings: HashMap::new(),
            marks: HashMap::new(),
            orders: Vec::new(),
            realized_pnl: Decimal::ZERO,
            commission_paid: Decimal::ZERO,
            rejected_orders: 0,
        }
    }

    fn equity(&self) -> Decimal {
        let marked: Decimal = self
            .holdings
            .values()
            .map(|holding| {
                let mark = self
                    .marks
                    .get(&holding.symbol)
                    .copied()
                    .unwrap_or(holding.avg_cost);
                holding.quantity * mark
            })
            .sum();
        self.cash + marked
    }
}

// =============================================================================
// Paper Broker
// =============================================================================

/// Simulated broker backed by a [`QuoteSource`].
pub struct PaperBroker<Q> {
    config: PaperBrokerConfig,
    quotes: Q,
    state: RwLock<PaperState>,
    reject_orders: AtomicBool,
}

impl<Q> std::fmt::Debug for PaperBroker<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperBroker")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<Q: QuoteSource> PaperBroker<Q> {
    #[must_use]
    pub fn new(config: PaperBrokerConfig, quotes: Q) -> Self {
        Self {
            state: RwLock::new(PaperState::new(config.initial_equity)),
            config,
            quotes,
            reject_orders: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent order and close request fail with `OrderRejected`.
    pub fn set_reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    #[must_use]
    pub fn quotes(&self) -> &Q {
        &self.quotes
    }

    #[must_use]
    pub fn orders(&self) -> Vec<OrderConfirmation> {
        self.state.read().orders.clone()
    }

    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.state.read().cash
    }

    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.state.read().realized_pnl
    }

    #[must_use]
    pub fn commission_paid(&self) -> Decimal {
        self.state.read().commission_paid
    }

    #[must_use]
    pub fn rejected_orders(&self) -> u32 {
        self.state.read().rejected_orders
    }

    fn check_accepting(&self, symbol: &str) -> Result<(), BrokerError> {
        if self.reject_orders.load(Ordering::SeqCst) {
            self.state.write().rejected_orders += 1;
            warn!(symbol = %symbol, "Paper broker rejecting order");
            return Err(BrokerError::rejected(symbol, "paper broker is rejecting orders"));
        }
        Ok(())
    }

    async fn fill(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderConfirmation, BrokerError> {
        let price = self.quotes.price(symbol).await?;
        if price <= Decimal::ZERO {
            return Err(BrokerError::QuoteUnavailable(symbol.to_string()));
        }

        let commission = self.config.commission_per_unit * quantity;
        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            fill_price: price,
            filled_at: Utc::now(),
        };

        let mut state = self.state.write();
        let holding = state
            .holdings
            .entry(symbol.to_string())
            .or_insert_with(|| Holding::new(symbol, Decimal::ZERO, Decimal::ZERO));
        let realized = holding.apply_fill(side, quantity, price);
        if holding.is_flat() {
            state.holdings.remove(symbol);
        }

        let notional = price * quantity;
        match side {
            Side::Buy => state.cash -= notional,
            Side::Sell => state.cash += notional,
        }
        state.cash -= commission;
        state.commission_paid += commission;
        if let Some(pnl) = realized {
            state.realized_pnl += pnl;
        }
        state.marks.insert(symbol.to_string(), price);
        state.orders.push(confirmation.clone());

        info!(
            order_id = %confirmation.order_id,
            symbol = %symbol,
            side = %side,
            quantity = %quantity,
            price = %price,
            "Paper order filled"
        );

        Ok(confirmation)
    }
}

#[async_trait]
impl<Q: QuoteSource> BrokerGateway for PaperBroker<Q> {
    async fn position(&self, symbol: &str) -> Result<Option<Holding>, BrokerError> {
        Ok(self
            .state
            .read()
            .holdings
            .get(symbol)
            .filter(|holding| !holding.is_flat())
            .cloned())
    }

    async fn quote(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        let price = self.quotes.price(symbol).await?;
        self.state.write().marks.insert(symbol.to_string(), price);
        Ok(price)
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderConfirmation, BrokerError> {
        if quantity <= Decimal::ZERO {
            return Err(BrokerError::rejected(symbol, "quantity must be positive"));
        }
        self.check_accepting(symbol)?;
        self.fill(symbol, side, quantity).await
    }

    async fn close_position(&self, symbol: &str) -> Result<(), BrokerError> {
        self.check_accepting(symbol)?;

        let open = self
            .state
            .read()
            .holdings
            .get(symbol)
            .and_then(|holding| holding.side().map(|side| (side, holding.quantity.abs())));

        match open {
            Some((side, quantity)) => {
                self.fill(symbol, side.opposite(), quantity).await?;
            }
            None => debug!(symbol = %symbol, "Nothing to close"),
        }
        Ok(())
    }

    async fn account_equity(&self) -> Result<Decimal, BrokerError> {
        Ok(self.state.read().equity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn broker() -> PaperBroker<StaticQuotes> {
        let quotes = StaticQuotes::new().with("KO", dec!(60)).with("PEP", dec!(170));
        PaperBroker::new(PaperBrokerConfig::default(), quotes)
    }

    #[tokio::test]
    async fn fills_update_holdings_and_cash() {
        let broker = broker();

        broker.place_order("KO", Side::Buy, dec!(10)).await.unwrap();
        broker.place_order("PEP", Side::Sell, dec!(4)).await.unwrap();

        let ko = broker.position("KO").await.unwrap().unwrap();
        assert_eq!(ko.quantity, dec!(10));
        assert_eq!(ko.avg_cost, dec!(60));

        let pep = broker.position("PEP").await.unwrap().unwrap();
        assert_eq!(pep.quantity, dec!(-4));

        // 100000 - 600 + 680
        assert_eq!(broker.cash(), dec!(100080));
        assert_eq!(broker.account_equity().await.unwrap(), dec!(100000));
    }

    #[tokio::test]
    async fn close_flattens_and_realizes() {
        let broker = broker();
        broker.place_order("KO", Side::Buy, dec!(10)).await.unwrap();
        broker.quotes().set("KO", dec!(63));

        broker.close_position("KO").await.unwrap();

        assert_eq!(broker.position("KO").await.unwrap(), None);
        assert_eq!(broker.realized_pnl(), dec!(30));
        assert_eq!(broker.account_equity().await.unwrap(), dec!(100030));
        assert_eq!(broker.orders().len(), 2);
    }

    #[tokio::test]
    async fn closing_nothing_is_a_no_op() {
        let broker = broker();
        broker.close_position("KO").await.unwrap();
        assert!(broker.orders().is_empty());
    }

    #[tokio::test]
    async fn rejection_switch_blocks_orders_and_closes() {
        let broker = broker();
        broker.set_reject_orders(true);

        let err = broker.place_order("KO", Side::Buy, dec!(1)).await.unwrap_err();
        assert!(matches!(err, BrokerError::OrderRejected { .. }));
        assert!(broker.close_position("KO").await.is_err());
        assert_eq!(broker.rejected_orders(), 2);
        assert_eq!(broker.position("KO").await.unwrap(), None);
    }

    #[tokio::test]
    async fn commission_is_charged_per_unit() {
        let config = PaperBrokerConfig {
            initial_equity: dec!(1000),
            commission_per_unit: dec!(0.01),
        };
        let broker = PaperBroker::new(config, StaticQuotes::new().with("KO", dec!(60)));

        broker.place_order("KO", Side::Buy, dec!(10)).await.unwrap();

        assert_eq!(broker.commission_paid(), dec!(0.1));
        assert_eq!(broker.cash(), dec!(399.9));
    }

    #[tokio::test]
    async fn unknown_symbol_has_no_quote() {
        let broker = broker();
        let err = broker.place_order("MSFT", Side::Buy, dec!(1)).await.unwrap_err();
        assert_eq!(err, BrokerError::QuoteUnavailable("MSFT".to_string()));
    }
}
