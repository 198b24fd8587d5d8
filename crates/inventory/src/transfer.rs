use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::{DomainError, DomainResult, TenantId, UserId, typed_id};

use crate::ledger::LedgerDelta;
use crate::movement::{DocumentRef, DocumentType, LedgerPosting};

typed_id!(TransferId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Draft,
    Approved,
    InTransit,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Draft => "DRAFT",
            TransferStatus::Approved => "APPROVED",
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::str::FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(TransferStatus::Draft),
            "APPROVED" => Ok(TransferStatus::Approved),
            "IN_TRANSIT" => Ok(TransferStatus::InTransit),
            "COMPLETED" => Ok(TransferStatus::Completed),
            "CANCELLED" => Ok(TransferStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown transfer status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLineRequest {
    pub item_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub lines: Vec<TransferLineRequest>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateTransferRequest {
    /// The single-item form.
    pub fn single(
        item_id: ItemId,
        from_location_id: LocationId,
        to_location_id: LocationId,
        quantity: i64,
        notes: Option<String>,
    ) -> Self {
        Self {
            from_location_id,
            to_location_id,
            lines: vec![TransferLineRequest { item_id, quantity }],
            notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// Movement of stock between two locations of one tenant.
///
/// Ledger changes are committed when the transfer is created, so a new
/// transfer is already `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub tenant_id: TenantId,
    pub transfer_number: String,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub lines: Vec<TransferLine>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Validate a request and produce the transfer plus its ledger posting
    /// (`-q` at the source and `+q` at the destination per line).
    ///
    /// Availability at the source is enforced when the posting is applied.
    pub fn plan(
        tenant_id: TenantId,
        id: TransferId,
        transfer_number: String,
        request: CreateTransferRequest,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, LedgerPosting)> {
        if request.from_location_id == request.to_location_id {
            return Err(DomainError::SameLocation);
        }
        if request.lines.is_empty() {
            return Err(DomainError::validation("transfer must have at least one line"));
        }

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut deltas = Vec::with_capacity(request.lines.len() * 2);
        for line in request.lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "transfer quantity for item {} must be positive",
                    line.item_id
                )));
            }
            deltas.push(LedgerDelta::transfer_out(
                line.item_id,
                request.from_location_id,
                line.quantity,
            )?);
            deltas.push(LedgerDelta::transfer_in(
                line.item_id,
                request.to_location_id,
                line.quantity,
            )?);
            lines.push(TransferLine {
                item_id: line.item_id,
                quantity: line.quantity,
            });
        }

        let transfer = Self {
            id,
            tenant_id,
            transfer_number,
            from_location_id: request.from_location_id,
            to_location_id: request.to_location_id,
            status: TransferStatus::Completed,
            notes: request.notes,
            lines,
            created_by,
            created_at: now,
        };

        let posting = LedgerPosting::new(
            DocumentRef::new(DocumentType::Transfer, id.aggregate_id()),
            created_by,
            now,
        )
        .with_deltas(deltas);

        Ok((transfer, posting))
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InventoryLevel;
    use proptest::prelude::*;

    fn plan(request: CreateTransferRequest) -> DomainResult<(Transfer, LedgerPosting)> {
        Transfer::plan(
            TenantId::new(),
            TransferId::generate(),
            "TR-000001".to_string(),
            request,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn same_location_is_rejected() {
        let loc = LocationId::generate();
        let err = plan(CreateTransferRequest::single(ItemId::generate(), loc, loc, 1, None))
            .unwrap_err();
        assert_eq!(err, DomainError::SameLocation);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let req = CreateTransferRequest::single(
            ItemId::generate(),
            LocationId::generate(),
            LocationId::generate(),
            0,
            None,
        );
        assert!(matches!(plan(req), Err(DomainError::Validation(_))));
    }

    #[test]
    fn transfers_complete_when_planned() {
        let (transfer, posting) = plan(CreateTransferRequest::single(
            ItemId::generate(),
            LocationId::generate(),
            LocationId::generate(),
            3,
            Some("restock shop".into()),
        ))
        .unwrap();

        assert_eq!(transfer.status, TransferStatus::Completed);
        assert_eq!(posting.deltas.len(), 2);
        assert_eq!(posting.reference.document_type, DocumentType::Transfer);
    }

    proptest! {
        #[test]
        fn prop_transfer_conserves_total(src in 0i64..500, dst in 0i64..500, q in 1i64..600) {
            let tenant = TenantId::new();
            let item = ItemId::generate();
            let (a, b) = (LocationId::generate(), LocationId::generate());
            let now = Utc::now();

            let mut source = InventoryLevel { quantity: src, ..InventoryLevel::empty(tenant, item, a, now) };
            let mut dest = InventoryLevel { quantity: dst, ..InventoryLevel::empty(tenant, item, b, now) };

            let (_, posting) = plan(CreateTransferRequest::single(item, a, b, q, None)).unwrap();

            let out = source.check(&posting.deltas[0]);
            if q > src {
                prop_assert!(out.is_err());
            } else {
                source.apply(&posting.deltas[0], now).unwrap();
                dest.apply(&posting.deltas[1], now).unwrap();
                prop_assert_eq!(source.quantity, src - q);
                prop_assert_eq!(dest.quantity, dst + q);
                prop_assert_eq!(source.quantity + dest.quantity, src + dst);
            }
        }
    }
}
