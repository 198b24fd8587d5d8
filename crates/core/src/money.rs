//! Money helpers.
//!
//! Amounts are decimal currency units (not cents). Every computed amount is
//! rounded to two places, midpoint away from zero, at the point it is stored.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Number of decimal places kept for stored amounts.
pub const MONEY_SCALE: u32 = 2;

/// Currency amount.
pub type Money = Decimal;

/// Round an amount to cents.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Reject negative amounts for a named field.
pub fn ensure_non_negative(field: &str, value: Decimal) -> DomainResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(ensure_non_negative("price", dec!(0)).is_ok());
        assert!(ensure_non_negative("price", dec!(-0.01)).is_err());
    }
}
