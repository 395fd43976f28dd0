use crate::types::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Broker-reported holding in a single instrument.
///
/// `quantity` is signed: positive for long, negative for short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
}

impl Holding {
    #[must_use]
    pub fn new(symbol: impl Into<String>, quantity: Decimal, avg_cost: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_cost,
        }
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Side that opened this holding, `None` when flat.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        if self.quantity > Decimal::ZERO {
            Some(Side::Buy)
        } else if self.quantity < Decimal::ZERO {
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// Gross entry notional, always non-negative.
    #[must_use]
    pub fn entry_notional(&self) -> Decimal {
        (self.quantity * self.avg_cost).abs()
    }

    /// Unrealized `PnL` at `price`. Shorts gain when the price falls.
    #[must_use]
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.avg_cost) * self.quantity
    }

    /// Applies a fill and returns the realized `PnL`, if any quantity was closed.
    ///
    /// Adding in the holding's direction re-weights `avg_cost`; trading against
    /// it realizes `PnL` on the closed quantity and flips the holding when the
    /// fill is larger than the open quantity.
    pub fn apply_fill(&mut self, side: Side, quantity: Decimal, price: Decimal) -> Option<Decimal> {
        let signed = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };

        match self.side() {
            // Opening from flat
            None => {
                self.quantity = signed;
                self.avg_cost = price;
                None
            }

            // Adding to the existing direction
            Some(open) if open == side => {
                let total_cost = self.entry_notional() + price * quantity;
                self.quantity += signed;
                self.avg_cost = total_cost / self.quantity.abs();
                None
            }

            // Reducing, closing, or flipping
            Some(_) => {
                let open_quantity = self.quantity.abs();
                let closed = quantity.min(open_quantity);
                let direction = if self.quantity > Decimal::ZERO {
                    Decimal::ONE
                } else {
                    Decimal::NEGATIVE_ONE
                };
                let pnl = (price - self.avg_cost) * closed * direction;

                self.quantity += signed;
                if self.quantity.is_zero() {
                    self.avg_cost = Decimal::ZERO;
                } else if quantity > open_quantity {
                    self.avg_cost = price;
                }

                Some(pnl)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn long_and_short_pnl_signs() {
        let long = Holding::new("KO", dec!(10), dec!(60));
        assert_eq!(long.unrealized_pnl(dec!(63)), dec!(30));

        let short = Holding::new("PEP", dec!(-20), dec!(170));
        assert_eq!(short.unrealized_pnl(dec!(165)), dec!(100));
        assert_eq!(short.entry_notional(), dec!(3400));
    }

    #[test]
    fn adding_reweights_average_cost() {
        let mut holding = Holding::new("KO", dec!(0), dec!(0));
        assert!(holding.apply_fill(Side::Buy, dec!(10), dec!(60)).is_none());
        assert!(holding.apply_fill(Side::Buy, dec!(10), dec!(62)).is_none());

        assert_eq!(holding.quantity, dec!(20));
        assert_eq!(holding.avg_cost, dec!(61));
    }

    #[test]
    fn closing_short_realizes_pnl() {
        let mut holding = Holding::new("PEP", dec!(0), dec!(0));
        holding.apply_fill(Side::Sell, dec!(5), dec!(170));

        let pnl = holding.apply_fill(Side::Buy, dec!(5), dec!(160));

        assert_eq!(pnl, Some(dec!(50)));
        assert!(holding.is_flat());
    }

    #[test]
    fn oversized_fill_flips_direction() {
        let mut holding = Holding::new("KO", dec!(0), dec!(0));
        holding.apply_fill(Side::Buy, dec!(5), dec!(60));

        let pnl = holding.apply_fill(Side::Sell, dec!(8), dec!(58));

        assert_eq!(pnl, Some(dec!(-10)));
        assert_eq!(holding.quantity, dec!(-3));
        assert_eq!(holding.avg_cost, dec!(58));
        assert_eq!(holding.side(), Some(Side::Sell));
    }
}
