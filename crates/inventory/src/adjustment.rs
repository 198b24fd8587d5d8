use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::{DomainError, DomainResult, TenantId, UserId, typed_id};

use crate::ledger::LedgerDelta;
use crate::movement::{DocumentRef, DocumentType, LedgerPosting};

typed_id!(AdjustmentId);

/// Reason category of a stock correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentType {
    StockCount,
    Damage,
    Theft,
    Expired,
    WriteOff,
    Correction,
    Other,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::StockCount => "STOCK_COUNT",
            AdjustmentType::Damage => "DAMAGE",
            AdjustmentType::Theft => "THEFT",
            AdjustmentType::Expired => "EXPIRED",
            AdjustmentType::WriteOff => "WRITE_OFF",
            AdjustmentType::Correction => "CORRECTION",
            AdjustmentType::Other => "OTHER",
        }
    }

    /// Loss types can only remove stock.
    pub fn requires_negative(&self) -> bool {
        matches!(
            self,
            AdjustmentType::Damage
                | AdjustmentType::Theft
                | AdjustmentType::Expired
                | AdjustmentType::WriteOff
        )
    }
}

impl core::str::FromStr for AdjustmentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "STOCK_COUNT" => AdjustmentType::StockCount,
            "DAMAGE" => AdjustmentType::Damage,
            "THEFT" => AdjustmentType::Theft,
            "EXPIRED" => AdjustmentType::Expired,
            "WRITE_OFF" => AdjustmentType::WriteOff,
            "CORRECTION" => AdjustmentType::Correction,
            "OTHER" => AdjustmentType::Other,
            other => {
                return Err(DomainError::validation(format!("unknown adjustment type: {other}")));
            }
        })
    }
}

/// One requested correction. Exactly one of `quantity_delta` and
/// `counted_quantity` must be set; a counted quantity is only valid for
/// stock counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentLineRequest {
    pub item_id: ItemId,
    #[serde(default)]
    pub quantity_delta: Option<i64>,
    #[serde(default)]
    pub counted_quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAdjustmentRequest {
    pub location_id: LocationId,
    pub adjustment_type: AdjustmentType,
    pub reason: String,
    pub lines: Vec<AdjustmentLineRequest>,
}

impl CreateAdjustmentRequest {
    /// The single-item form.
    pub fn single(
        location_id: LocationId,
        item_id: ItemId,
        adjustment_type: AdjustmentType,
        quantity_delta: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            location_id,
            adjustment_type,
            reason: reason.into(),
            lines: vec![AdjustmentLineRequest {
                item_id,
                quantity_delta: Some(quantity_delta),
                counted_quantity: None,
            }],
        }
    }

    /// Whether any line needs the current on-hand quantity to resolve.
    pub fn needs_current_quantities(&self) -> bool {
        self.lines.iter().any(|l| l.counted_quantity.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentLine {
    pub item_id: ItemId,
    pub quantity_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: AdjustmentId,
    pub tenant_id: TenantId,
    pub adjustment_number: String,
    pub location_id: LocationId,
    pub adjustment_type: AdjustmentType,
    pub reason: String,
    pub lines: Vec<AdjustmentLine>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Adjustment {
    /// Resolve and validate a request into an adjustment and its posting.
    ///
    /// `current_quantity` supplies on-hand stock for counted lines; it is not
    /// consulted otherwise. Counted lines that match the current quantity
    /// are dropped, the rest post a delta guarded on the quantity they were
    /// resolved against. An item may appear on one line only.
    pub fn plan<F>(
        tenant_id: TenantId,
        id: AdjustmentId,
        adjustment_number: String,
        request: CreateAdjustmentRequest,
        current_quantity: F,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, LedgerPosting)>
    where
        F: Fn(ItemId) -> i64,
    {
        let reason = request.reason.trim().to_string();
        if reason.is_empty() {
            return Err(DomainError::validation("adjustment reason cannot be empty"));
        }
        if request.lines.is_empty() {
            return Err(DomainError::validation("adjustment must have at least one line"));
        }

        let kind = request.adjustment_type;
        let mut seen = HashSet::with_capacity(request.lines.len());
        let mut lines = Vec::with_capacity(request.lines.len());
        let mut deltas = Vec::with_capacity(request.lines.len());
        for line in request.lines {
            if !seen.insert(line.item_id) {
                return Err(DomainError::validation(format!(
                    "item {} appears on more than one adjustment line",
                    line.item_id
                )));
            }
            let (delta, counted_from) = match (line.quantity_delta, line.counted_quantity) {
                (Some(delta), None) => {
                    if delta == 0 {
                        return Err(DomainError::validation(format!(
                            "quantity delta for item {} cannot be zero",
                            line.item_id
                        )));
                    }
                    (delta, None)
                }
                (None, Some(counted)) => {
                    if kind != AdjustmentType::StockCount {
                        return Err(DomainError::validation(
                            "counted quantity is only valid for stock counts",
                        ));
                    }
                    if counted < 0 {
                        return Err(DomainError::validation("counted quantity cannot be negative"));
                    }
                    let current = current_quantity(line.item_id);
                    let delta = counted - current;
                    if delta == 0 {
                        continue;
                    }
                    (delta, Some(current))
                }
                _ => {
                    return Err(DomainError::validation(format!(
                        "line for item {} needs exactly one of quantity_delta or counted_quantity",
                        line.item_id
                    )));
                }
            };

            if kind.requires_negative() && delta > 0 {
                return Err(DomainError::validation(format!(
                    "{} adjustments can only remove stock",
                    kind.as_str()
                )));
            }
            let ledger_delta = LedgerDelta::adjustment(line.item_id, request.location_id, delta)?;
            deltas.push(match counted_from {
                Some(current) => ledger_delta.expecting(current),
                None => ledger_delta,
            });
            lines.push(AdjustmentLine {
                item_id: line.item_id,
                quantity_delta: delta,
            });
        }

        if lines.is_empty() {
            return Err(DomainError::validation("adjustment changes no stock"));
        }

        let adjustment = Self {
            id,
            tenant_id,
            adjustment_number,
            location_id: request.location_id,
            adjustment_type: kind,
            reason,
            lines,
            created_by,
            created_at: now,
        };
        let posting = LedgerPosting::new(
            DocumentRef::new(DocumentType::Adjustment, id.aggregate_id()),
            created_by,
            now,
        )
        .with_deltas(deltas);

        Ok((adjustment, posting))
    }

    pub fn net(&self) -> NetAdjustment {
        NetAdjustment::from_deltas(self.lines.iter().map(|l| l.quantity_delta))
    }
}

/// `increase - decrease` over a set of adjustment deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetAdjustment {
    pub increase: i64,
    pub decrease: i64,
    pub net: i64,
}

impl NetAdjustment {
    pub fn from_deltas(deltas: impl IntoIterator<Item = i64>) -> Self {
        deltas.into_iter().fold(Self::default(), |mut acc, d| {
            if d > 0 {
                acc.increase += d;
            } else {
                acc.decrease += -d;
            }
            acc.net = acc.increase - acc.decrease;
            acc
        })
    }

    pub fn merge(self, other: Self) -> Self {
        let increase = self.increase + other.increase;
        let decrease = self.decrease + other.decrease;
        Self {
            increase,
            decrease,
            net: increase - decrease,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with(
        request: CreateAdjustmentRequest,
        on_hand: i64,
    ) -> DomainResult<(Adjustment, LedgerPosting)> {
        Adjustment::plan(
            TenantId::new(),
            AdjustmentId::generate(),
            "ADJ-000001".into(),
            request,
            |_| on_hand,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn loss_types_reject_positive_deltas() {
        let req = CreateAdjustmentRequest::single(
            LocationId::generate(),
            ItemId::generate(),
            AdjustmentType::Damage,
            2,
            "broken pallet",
        );
        assert!(matches!(plan_with(req, 10), Err(DomainError::Validation(_))));
    }

    #[test]
    fn stock_count_resolves_counted_quantity() {
        let item = ItemId::generate();
        let req = CreateAdjustmentRequest {
            location_id: LocationId::generate(),
            adjustment_type: AdjustmentType::StockCount,
            reason: "cycle count".into(),
            lines: vec![AdjustmentLineRequest {
                item_id: item,
                quantity_delta: None,
                counted_quantity: Some(7),
            }],
        };

        let (adjustment, posting) = plan_with(req.clone(), 10).unwrap();
        assert_eq!(adjustment.lines[0].quantity_delta, -3);
        assert_eq!(posting.deltas[0].quantity_delta, -3);
        assert_eq!(posting.deltas[0].expected_quantity, Some(10));

        // Matching count is a no-op, which leaves nothing to adjust.
        assert!(matches!(plan_with(req, 7), Err(DomainError::Validation(_))));
    }

    #[test]
    fn an_item_can_only_be_counted_once() {
        let item = ItemId::generate();
        let count = |counted| AdjustmentLineRequest {
            item_id: item,
            quantity_delta: None,
            counted_quantity: Some(counted),
        };
        let req = CreateAdjustmentRequest {
            location_id: LocationId::generate(),
            adjustment_type: AdjustmentType::StockCount,
            reason: "recount".into(),
            lines: vec![count(3), count(3)],
        };
        let err = plan_with(req, 10).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref msg) if msg.contains("more than one")));

        let mixed = CreateAdjustmentRequest {
            location_id: LocationId::generate(),
            adjustment_type: AdjustmentType::Correction,
            reason: "fix".into(),
            lines: vec![
                AdjustmentLineRequest {
                    item_id: item,
                    quantity_delta: Some(2),
                    counted_quantity: None,
                },
                AdjustmentLineRequest {
                    item_id: item,
                    quantity_delta: Some(-1),
                    counted_quantity: None,
                },
            ],
        };
        assert!(plan_with(mixed, 0).is_err());
    }

    #[test]
    fn explicit_deltas_are_not_guarded() {
        let req = CreateAdjustmentRequest::single(
            LocationId::generate(),
            ItemId::generate(),
            AdjustmentType::Correction,
            4,
            "found in back room",
        );
        let (_, posting) = plan_with(req, 10).unwrap();
        assert_eq!(posting.deltas[0].expected_quantity, None);
    }

    #[test]
    fn counted_quantity_needs_stock_count_type() {
        let req = CreateAdjustmentRequest {
            location_id: LocationId::generate(),
            adjustment_type: AdjustmentType::Correction,
            reason: "fix".into(),
            lines: vec![AdjustmentLineRequest {
                item_id: ItemId::generate(),
                quantity_delta: None,
                counted_quantity: Some(3),
            }],
        };
        assert!(plan_with(req, 0).is_err());
    }

    #[test]
    fn zero_delta_and_blank_reason_are_rejected() {
        let loc = LocationId::generate();
        let item = ItemId::generate();
        let zero = CreateAdjustmentRequest::single(loc, item, AdjustmentType::Other, 0, "x");
        assert!(plan_with(zero, 0).is_err());

        let blank = CreateAdjustmentRequest::single(loc, item, AdjustmentType::Other, 1, "  ");
        assert!(plan_with(blank, 0).is_err());
    }

    #[test]
    fn net_adjustment_sums_both_directions() {
        let net = NetAdjustment::from_deltas([5, -2, 3, -7]);
        assert_eq!(net.increase, 8);
        assert_eq!(net.decrease, 9);
        assert_eq!(net.net, -1);
        assert_eq!(net.merge(NetAdjustment::from_deltas([4])).net, 3);
    }
}
