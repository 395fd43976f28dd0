use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimal places kept on order quantities.
pub const QUANTITY_SCALE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizingError {
    #[error("cannot size against non-positive price {0}")]
    NonPositivePrice(Decimal),

    #[error("cannot size against non-positive equity {0}")]
    NonPositiveEquity(Decimal),

    #[error("computed {leg} leg quantity rounds to zero")]
    ZeroQuantity { leg: &'static str },

    #[error("{leg} leg quantity overflows")]
    Overflow { leg: &'static str },
}

/// Quantities for both legs of a hedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegQuantities {
    pub first: Decimal,
    pub second: Decimal,
}

/// Calculate hedge leg quantities
///
/// # Arguments
/// * `base_quantity` - Units of the first instrument before leverage
/// * `leverage` - Multiplier on the first leg
/// * `hedge_ratio` - Units of the second instrument per unit of the first
///
/// # Returns
/// First leg = `base_quantity × leverage`, second leg = first × `hedge_ratio`,
/// both truncated to [`QUANTITY_SCALE`] places.
///
/// # Errors
/// Returns [`SizingError::ZeroQuantity`] if either leg truncates to zero and
/// [`SizingError::Overflow`] if a product does not fit a `Decimal`.
pub fn hedge_leg_quantities(
    base_quantity: Decimal,
    leverage: Decimal,
    hedge_ratio: Decimal,
) -> Result<LegQuantities, SizingError> {
    let first = base_quantity
        .checked_mul(leverage)
        .map(round_quantity)
        .ok_or(SizingError::Overflow { leg: "first" })?;
    if first <= Decimal::ZERO {
        return Err(SizingError::ZeroQuantity { leg: "first" });
    }

    let second = first
        .checked_mul(hedge_ratio)
        .map(round_quantity)
        .ok_or(SizingError::Overflow { leg: "second" })?;
    if second <= Decimal::ZERO {
        return Err(SizingError::ZeroQuantity { leg: "second" });
    }

    Ok(LegQuantities { first, second })
}

/// Converts a fraction of account equity into units of an instrument.
///
/// # Errors
/// Returns an error for non-positive equity or price, or when the notional
/// overflows.
pub fn equity_base_quantity(
    account_equity: Decimal,
    fraction: Decimal,
    price: Decimal,
) -> Result<Decimal, SizingError> {
    if account_equity <= Decimal::ZERO {
        return Err(SizingError::NonPositiveEquity(account_equity));
    }
    if price <= Decimal::ZERO {
        return Err(SizingError::NonPositivePrice(price));
    }

    account_equity
        .checked_mul(fraction)
        .and_then(|notional| notional.checked_div(price))
        .ok_or(SizingError::Overflow { leg: "first" })
}

fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unit_sizing_scales_second_leg_by_hedge_ratio() {
        let legs = hedge_leg_quantities(dec!(1), dec!(1.0), dec!(2.0)).unwrap();

        assert_eq!(legs.first, dec!(1));
        assert_eq!(legs.second, dec!(2));
    }

    #[test]
    fn leverage_multiplies_both_legs() {
        let legs = hedge_leg_quantities(dec!(10), dec!(3), dec!(0.5)).unwrap();

        // 10 × 3 = 30 units of the first leg, 30 × 0.5 = 15 of the second
        assert_eq!(legs.first, dec!(30));
        assert_eq!(legs.second, dec!(15));
    }

    #[test]
    fn quantities_truncate_to_eight_places() {
        let legs = hedge_leg_quantities(dec!(1), dec!(1), dec!(0.123456789)).unwrap();
        assert_eq!(legs.second, dec!(0.12345678));
    }

    #[test]
    fn dust_quantities_are_rejected() {
        let result = hedge_leg_quantities(dec!(0.000000001), dec!(1), dec!(1));
        assert_eq!(result, Err(SizingError::ZeroQuantity { leg: "first" }));
    }

    #[test]
    fn extreme_leverage_is_an_error_not_a_panic() {
        assert_eq!(
            hedge_leg_quantities(Decimal::MAX, dec!(1000), dec!(1)),
            Err(SizingError::Overflow { leg: "first" })
        );
        assert_eq!(
            hedge_leg_quantities(dec!(1), Decimal::MAX, dec!(10)),
            Err(SizingError::Overflow { leg: "second" })
        );
        assert_eq!(
            equity_base_quantity(Decimal::MAX, dec!(5), dec!(1)),
            Err(SizingError::Overflow { leg: "first" })
        );
    }

    #[test]
    fn equity_fraction_converts_at_price() {
        // $50k × 0.2 = $10k notional at $125 = 80 units
        let quantity = equity_base_quantity(dec!(50000), dec!(0.2), dec!(125)).unwrap();
        assert_eq!(quantity, dec!(80));
    }

    #[test]
    fn equity_fraction_rejects_bad_inputs() {
        assert_eq!(
            equity_base_quantity(dec!(50000), dec!(0.2), dec!(0)),
            Err(SizingError::NonPositivePrice(dec!(0)))
        );
        assert!(equity_base_quantity(dec!(0), dec!(0.2), dec!(10)).is_err());
    }
}
