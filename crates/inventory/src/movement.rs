//! Stock movements: the append-only audit trail of ledger mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::{AggregateId, DomainError, TenantId, UserId};

use crate::ledger::LedgerDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Receipt,
    TransferOut,
    TransferIn,
    Adjustment,
    Reservation,
    ReservationRelease,
    Fulfilment,
    Sale,
    Return,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receipt => "RECEIPT",
            MovementKind::TransferOut => "TRANSFER_OUT",
            MovementKind::TransferIn => "TRANSFER_IN",
            MovementKind::Adjustment => "ADJUSTMENT",
            MovementKind::Reservation => "RESERVATION",
            MovementKind::ReservationRelease => "RESERVATION_RELEASE",
            MovementKind::Fulfilment => "FULFILMENT",
            MovementKind::Sale => "SALE",
            MovementKind::Return => "RETURN",
        }
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RECEIPT" => MovementKind::Receipt,
            "TRANSFER_OUT" => MovementKind::TransferOut,
            "TRANSFER_IN" => MovementKind::TransferIn,
            "ADJUSTMENT" => MovementKind::Adjustment,
            "RESERVATION" => MovementKind::Reservation,
            "RESERVATION_RELEASE" => MovementKind::ReservationRelease,
            "FULFILMENT" => MovementKind::Fulfilment,
            "SALE" => MovementKind::Sale,
            "RETURN" => MovementKind::Return,
            other => return Err(DomainError::validation(format!("unknown movement kind: {other}"))),
        })
    }
}

/// Kind of document that caused a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    GoodsReceipt,
    Transfer,
    Adjustment,
    SalesOrder,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::GoodsReceipt => "GOODS_RECEIPT",
            DocumentType::Transfer => "TRANSFER",
            DocumentType::Adjustment => "ADJUSTMENT",
            DocumentType::SalesOrder => "SALES_ORDER",
        }
    }
}

impl core::str::FromStr for DocumentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOODS_RECEIPT" => Ok(DocumentType::GoodsReceipt),
            "TRANSFER" => Ok(DocumentType::Transfer),
            "ADJUSTMENT" => Ok(DocumentType::Adjustment),
            "SALES_ORDER" => Ok(DocumentType::SalesOrder),
            other => Err(DomainError::validation(format!("unknown document type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_type: DocumentType,
    pub document_id: AggregateId,
}

impl DocumentRef {
    pub fn new(document_type: DocumentType, document_id: AggregateId) -> Self {
        Self {
            document_type,
            document_id,
        }
    }
}

/// One applied ledger delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub kind: MovementKind,
    pub quantity_delta: i64,
    pub reserved_delta: i64,
    pub reference: DocumentRef,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// The ledger side of one business operation: every delta it makes, the
/// document responsible and who did it.
///
/// Stores apply all deltas of a posting in one transaction and write one
/// [`StockMovement`] per delta alongside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPosting {
    pub deltas: Vec<LedgerDelta>,
    pub reference: DocumentRef,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerPosting {
    pub fn new(
        reference: DocumentRef,
        actor: Option<UserId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            deltas: Vec::new(),
            reference,
            actor,
            occurred_at,
        }
    }

    pub fn with_deltas(mut self, deltas: impl IntoIterator<Item = LedgerDelta>) -> Self {
        self.deltas.extend(deltas);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Movement records for this posting, one per delta, in order.
    pub fn movements(&self, tenant_id: TenantId) -> Vec<StockMovement> {
        self.deltas
            .iter()
            .map(|d| StockMovement {
                id: Uuid::now_v7(),
                tenant_id,
                item_id: d.item_id,
                location_id: d.location_id,
                kind: d.kind,
                quantity_delta: d.quantity_delta,
                reserved_delta: d.reserved_delta,
                reference: self.reference,
                actor: self.actor,
                occurred_at: self.occurred_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_yields_one_movement_per_delta() {
        let item = ItemId::generate();
        let (a, b) = (LocationId::generate(), LocationId::generate());
        let posting = LedgerPosting::new(
            DocumentRef::new(DocumentType::Transfer, AggregateId::new()),
            Some(UserId::new()),
            Utc::now(),
        )
        .with_deltas([
            LedgerDelta::transfer_out(item, a, 4).unwrap(),
            LedgerDelta::transfer_in(item, b, 4).unwrap(),
        ]);

        let movements = posting.movements(TenantId::new());

        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].kind, MovementKind::TransferOut);
        assert_eq!(movements[0].quantity_delta, -4);
        assert_eq!(movements[1].location_id, b);
        assert_ne!(movements[0].id, movements[1].id);
    }

    #[test]
    fn movement_kind_parses_its_own_name() {
        let kind: MovementKind = MovementKind::ReservationRelease.as_str().parse().unwrap();
        assert_eq!(kind, MovementKind::ReservationRelease);
    }
}
