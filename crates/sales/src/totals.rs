//! Sales amount arithmetic.
//!
//! Per line: `subtotal = quantity * unit_price - discount`,
//! `tax = subtotal * tax_rate / 100`, `total = subtotal + tax`.
//! Per order: `total = Σ subtotal + Σ tax + shipping - discount`.
//! Each computed field is rounded to cents as it is produced, so the stored
//! fields always add up exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::money::ensure_non_negative;
use stockroom_core::{DomainError, DomainResult, round_money};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Validate one line's inputs and compute its amounts.
pub fn compute_line(
    quantity: i64,
    unit_price: Decimal,
    tax_rate: Decimal,
    discount: Decimal,
) -> DomainResult<LineAmounts> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    ensure_non_negative("unit_price", unit_price)?;
    ensure_non_negative("discount", discount)?;
    if tax_rate < Decimal::ZERO || tax_rate > HUNDRED {
        return Err(DomainError::validation("tax_rate must be between 0 and 100"));
    }

    let gross = Decimal::from(quantity) * unit_price;
    if discount > gross {
        return Err(DomainError::validation("line discount exceeds line amount"));
    }

    let subtotal = round_money(gross - discount);
    let tax_amount = round_money(subtotal * tax_rate / HUNDRED);
    Ok(LineAmounts {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    })
}

/// Aggregate line amounts with order-level shipping and discount.
pub fn compute_order<'a>(
    lines: impl IntoIterator<Item = &'a LineAmounts>,
    shipping_cost: Decimal,
    discount: Decimal,
) -> DomainResult<OrderTotals> {
    ensure_non_negative("shipping_cost", shipping_cost)?;
    ensure_non_negative("discount", discount)?;

    let (subtotal, tax_amount) = lines
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(s, t), l| (s + l.subtotal, t + l.tax_amount));

    let before_discount = subtotal + tax_amount + shipping_cost;
    if discount > before_discount {
        return Err(DomainError::validation("order discount exceeds order amount"));
    }

    Ok(OrderTotals {
        subtotal: round_money(subtotal),
        tax_amount: round_money(tax_amount),
        total: round_money(before_discount - discount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_amounts() {
        let line = compute_line(3, dec!(9.99), dec!(8.25), dec!(1.00)).unwrap();
        assert_eq!(line.subtotal, dec!(28.97));
        // 28.97 * 0.0825 = 2.390025
        assert_eq!(line.tax_amount, dec!(2.39));
        assert_eq!(line.total, dec!(31.36));
    }

    #[test]
    fn line_validation() {
        assert!(compute_line(0, dec!(1), dec!(0), dec!(0)).is_err());
        assert!(compute_line(1, dec!(-1), dec!(0), dec!(0)).is_err());
        assert!(compute_line(1, dec!(1), dec!(100.01), dec!(0)).is_err());
        assert!(compute_line(1, dec!(1), dec!(0), dec!(1.01)).is_err());
        assert!(compute_line(1, dec!(1), dec!(100), dec!(1)).is_ok());
    }

    #[test]
    fn order_totals_include_shipping_and_discount() {
        let lines = [
            compute_line(2, dec!(10), dec!(10), dec!(0)).unwrap(),
            compute_line(1, dec!(5), dec!(0), dec!(0)).unwrap(),
        ];
        let totals = compute_order(&lines, dec!(4.50), dec!(2)).unwrap();
        assert_eq!(totals.subtotal, dec!(25));
        assert_eq!(totals.tax_amount, dec!(2));
        assert_eq!(totals.total, dec!(29.50));

        assert!(compute_order(&lines, dec!(0), dec!(27.01)).is_err());
    }
}
