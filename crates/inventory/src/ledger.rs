//! Inventory ledger rows and the deltas that mutate them.
//!
//! A ledger row holds the on-hand `quantity` and the `reserved_quantity` of
//! one item at one location. Every mutation is a [`LedgerDelta`]; applying
//! one must keep `0 <= reserved_quantity <= quantity`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::{DomainError, DomainResult, TenantId};

use crate::movement::MovementKind;

/// Quantity of one item at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub updated_at: DateTime<Utc>,
}

/// A signed change to one ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub kind: MovementKind,
    pub quantity_delta: i64,
    pub reserved_delta: i64,
    /// On-hand quantity the row must still hold for the delta to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_quantity: Option<i64>,
}

fn ensure_positive(what: &str, quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!("{what} quantity must be positive")));
    }
    Ok(())
}

impl LedgerDelta {
    fn on_hand(item_id: ItemId, location_id: LocationId, kind: MovementKind, delta: i64) -> Self {
        Self {
            item_id,
            location_id,
            kind,
            quantity_delta: delta,
            reserved_delta: 0,
            expected_quantity: None,
        }
    }

    pub fn receipt(item_id: ItemId, location_id: LocationId, quantity: i64) -> DomainResult<Self> {
        ensure_positive("receipt", quantity)?;
        Ok(Self::on_hand(item_id, location_id, MovementKind::Receipt, quantity))
    }

    pub fn transfer_out(
        item_id: ItemId,
        location_id: LocationId,
        quantity: i64,
    ) -> DomainResult<Self> {
        ensure_positive("transfer", quantity)?;
        Ok(Self::on_hand(item_id, location_id, MovementKind::TransferOut, -quantity))
    }

    pub fn transfer_in(
        item_id: ItemId,
        location_id: LocationId,
        quantity: i64,
    ) -> DomainResult<Self> {
        ensure_positive("transfer", quantity)?;
        Ok(Self::on_hand(item_id, location_id, MovementKind::TransferIn, quantity))
    }

    /// Signed on-hand correction. Zero is rejected.
    pub fn adjustment(item_id: ItemId, location_id: LocationId, delta: i64) -> DomainResult<Self> {
        if delta == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero"));
        }
        Ok(Self::on_hand(item_id, location_id, MovementKind::Adjustment, delta))
    }

    pub fn reserve(item_id: ItemId, location_id: LocationId, quantity: i64) -> DomainResult<Self> {
        ensure_positive("reservation", quantity)?;
        Ok(Self {
            item_id,
            location_id,
            kind: MovementKind::Reservation,
            quantity_delta: 0,
            reserved_delta: quantity,
            expected_quantity: None,
        })
    }

    pub fn release(item_id: ItemId, location_id: LocationId, quantity: i64) -> DomainResult<Self> {
        ensure_positive("release", quantity)?;
        Ok(Self {
            item_id,
            location_id,
            kind: MovementKind::ReservationRelease,
            quantity_delta: 0,
            reserved_delta: -quantity,
            expected_quantity: None,
        })
    }

    /// Ship reserved stock: on-hand and reserved both drop by `quantity`.
    pub fn fulfil(item_id: ItemId, location_id: LocationId, quantity: i64) -> DomainResult<Self> {
        ensure_positive("fulfilment", quantity)?;
        Ok(Self {
            item_id,
            location_id,
            kind: MovementKind::Fulfilment,
            quantity_delta: -quantity,
            reserved_delta: -quantity,
            expected_quantity: None,
        })
    }

    /// Immediate sale of unreserved stock (POS).
    pub fn sale(item_id: ItemId, location_id: LocationId, quantity: i64) -> DomainResult<Self> {
        ensure_positive("sale", quantity)?;
        Ok(Self::on_hand(item_id, location_id, MovementKind::Sale, -quantity))
    }

    /// Returned goods put back on hand.
    pub fn restock(item_id: ItemId, location_id: LocationId, quantity: i64) -> DomainResult<Self> {
        ensure_positive("return", quantity)?;
        Ok(Self::on_hand(item_id, location_id, MovementKind::Return, quantity))
    }

    /// Guard the delta on the on-hand quantity it was computed from. A row
    /// that moved since then rejects the delta with `Conflict`.
    pub fn expecting(mut self, quantity: i64) -> Self {
        self.expected_quantity = Some(quantity);
        self
    }

    /// Change this delta makes to the available quantity.
    pub fn available_delta(&self) -> i64 {
        self.quantity_delta - self.reserved_delta
    }

    /// Whether the delta lowers on-hand stock.
    pub fn decreases_on_hand(&self) -> bool {
        self.quantity_delta < 0
    }
}

impl InventoryLevel {
    /// A zero row, as created for every (item, location) pair.
    pub fn empty(
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            item_id,
            location_id,
            quantity: 0,
            reserved_quantity: 0,
            updated_at: now,
        }
    }

    /// `quantity - reserved_quantity`.
    pub fn available(&self) -> i64 {
        self.quantity - self.reserved_quantity
    }

    /// Compute the row after `delta` without changing it.
    ///
    /// Fails with `Conflict` if the row no longer holds the delta's expected
    /// quantity, and with `InsufficientStock` if the result would break
    /// `0 <= reserved_quantity <= quantity`.
    pub fn check(&self, delta: &LedgerDelta) -> DomainResult<(i64, i64)> {
        if delta.item_id != self.item_id || delta.location_id != self.location_id {
            return Err(DomainError::invariant("delta applied to the wrong ledger row"));
        }
        if let Some(expected) = delta.expected_quantity {
            if self.quantity != expected {
                return Err(DomainError::conflict(format!(
                    "on-hand quantity of item {} at location {} is {}, expected {expected}",
                    self.item_id, self.location_id, self.quantity
                )));
            }
        }

        let overflow = || DomainError::validation("quantity out of range");
        let quantity = self.quantity.checked_add(delta.quantity_delta).ok_or_else(overflow)?;
        let reserved = self
            .reserved_quantity
            .checked_add(delta.reserved_delta)
            .ok_or_else(overflow)?;

        if reserved < 0 {
            // Releasing or fulfilling more than is reserved.
            return Err(DomainError::insufficient_stock(
                self.item_id.aggregate_id(),
                self.location_id.aggregate_id(),
                -delta.reserved_delta,
                self.reserved_quantity,
            ));
        }
        if quantity < 0 || reserved > quantity {
            return Err(DomainError::insufficient_stock(
                self.item_id.aggregate_id(),
                self.location_id.aggregate_id(),
                -delta.available_delta(),
                self.available(),
            ));
        }

        Ok((quantity, reserved))
    }

    /// Apply `delta`. On error the row is left unchanged.
    pub fn apply(&mut self, delta: &LedgerDelta, now: DateTime<Utc>) -> DomainResult<()> {
        let (quantity, reserved) = self.check(delta)?;
        self.quantity = quantity;
        self.reserved_quantity = reserved;
        self.updated_at = now;
        Ok(())
    }

    pub fn apply_receipt(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::receipt(self.item_id, self.location_id, quantity)?;
        self.apply(&delta, now)
    }

    pub fn apply_transfer_out(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::transfer_out(self.item_id, self.location_id, quantity)?;
        self.apply(&delta, now)
    }

    pub fn apply_transfer_in(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::transfer_in(self.item_id, self.location_id, quantity)?;
        self.apply(&delta, now)
    }

    pub fn apply_adjustment(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::adjustment(self.item_id, self.location_id, delta)?;
        self.apply(&delta, now)
    }

    pub fn reserve(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::reserve(self.item_id, self.location_id, quantity)?;
        self.apply(&delta, now)
    }

    pub fn release_reservation(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::release(self.item_id, self.location_id, quantity)?;
        self.apply(&delta, now)
    }

    pub fn fulfil(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::fulfil(self.item_id, self.location_id, quantity)?;
        self.apply(&delta, now)
    }

    pub fn sell(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let delta = LedgerDelta::sale(self.item_id, self.location_id, quantity)?;
        self.apply(&delta, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn level(quantity: i64, reserved: i64) -> InventoryLevel {
        InventoryLevel {
            quantity,
            reserved_quantity: reserved,
            ..InventoryLevel::empty(
                TenantId::new(),
                ItemId::generate(),
                LocationId::generate(),
                Utc::now(),
            )
        }
    }

    #[test]
    fn available_is_quantity_minus_reserved() {
        assert_eq!(level(10, 3).available(), 7);
    }

    #[test]
    fn receipt_requires_positive_quantity() {
        let mut row = level(0, 0);
        assert!(matches!(row.apply_receipt(0, Utc::now()), Err(DomainError::Validation(_))));
        assert!(matches!(row.apply_receipt(-2, Utc::now()), Err(DomainError::Validation(_))));
        row.apply_receipt(5, Utc::now()).unwrap();
        assert_eq!(row.quantity, 5);
    }

    #[test]
    fn transfer_out_cannot_touch_reserved_stock() {
        let mut row = level(10, 8);
        let err = row.apply_transfer_out(3, Utc::now()).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(row.quantity, 10);
    }

    #[test]
    fn negative_adjustment_below_zero_leaves_row_unchanged() {
        let mut row = level(4, 0);
        let before = row.clone();
        assert!(matches!(
            row.apply_adjustment(-5, Utc::now()),
            Err(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(row, before);

        row.apply_adjustment(-4, Utc::now()).unwrap();
        assert_eq!(row.quantity, 0);
    }

    #[test]
    fn reserve_release_and_fulfil() {
        let mut row = level(10, 0);
        row.reserve(6, Utc::now()).unwrap();
        assert_eq!(row.available(), 4);

        assert!(row.sell(5, Utc::now()).is_err());
        row.sell(4, Utc::now()).unwrap();

        row.release_reservation(2, Utc::now()).unwrap();
        row.fulfil(4, Utc::now()).unwrap();
        assert_eq!((row.quantity, row.reserved_quantity), (2, 0));
    }

    #[test]
    fn releasing_more_than_reserved_reports_reserved_amount() {
        let mut row = level(10, 1);
        match row.release_reservation(3, Utc::now()).unwrap_err() {
            DomainError::InsufficientStock {
                requested,
                available,
                ..
            } => assert_eq!((requested, available), (3, 1)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn delta_for_another_row_is_rejected() {
        let row = level(10, 0);
        let delta = LedgerDelta::receipt(ItemId::generate(), row.location_id, 1).unwrap();
        assert!(matches!(row.check(&delta), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn guarded_delta_only_applies_to_the_counted_quantity() {
        let mut row = level(7, 0);
        let counted = LedgerDelta::adjustment(row.item_id, row.location_id, -2)
            .unwrap()
            .expecting(5);
        assert!(matches!(row.check(&counted), Err(DomainError::Conflict(_))));

        row.apply_transfer_out(2, Utc::now()).unwrap();
        assert_eq!(row.check(&counted).unwrap(), (3, 0));
    }

    fn arb_op() -> impl Strategy<Value = (u8, i64)> {
        (0u8..7, -20i64..20)
    }

    proptest! {
        #[test]
        fn prop_invariant_holds_after_any_sequence(ops in proptest::collection::vec(arb_op(), 0..60)) {
            let mut row = level(0, 0);
            let now = Utc::now();

            for (op, n) in ops {
                let before = row.clone();
                let result = match op {
                    0 => row.apply_receipt(n, now),
                    1 => row.apply_transfer_out(n, now),
                    2 => row.apply_transfer_in(n, now),
                    3 => row.apply_adjustment(n, now),
                    4 => row.reserve(n, now),
                    5 => row.release_reservation(n, now),
                    _ => row.fulfil(n, now),
                };

                prop_assert!(row.reserved_quantity >= 0);
                prop_assert!(row.reserved_quantity <= row.quantity);
                if result.is_err() {
                    prop_assert_eq!(&row, &before);
                }
            }
        }

        #[test]
        fn prop_adjustment_result_is_exact(qty in 0i64..1000, d in -1000i64..1000) {
            prop_assume!(d != 0);
            let mut row = level(qty, 0);
            let result = row.apply_adjustment(d, Utc::now());
            if qty + d < 0 {
                prop_assert!(
                    matches!(result, Err(DomainError::InsufficientStock { .. })),
                    "expected insufficient stock"
                );
                prop_assert_eq!(row.quantity, qty);
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(row.quantity, qty + d);
            }
        }
    }
}
