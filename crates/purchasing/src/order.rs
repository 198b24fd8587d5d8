use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::money::ensure_non_negative;
use stockroom_core::{AggregateRoot, DomainError, DomainResult, TenantId, UserId, round_money, typed_id};
use stockroom_parties::PartyId;

typed_id!(
    /// Purchase order identifier (tenant-scoped via `tenant_id`).
    PurchaseOrderId
);

typed_id!(PurchaseOrderLineId);

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    Submitted,
    Approved,
    PartiallyReceived,
    Received,
    Closed,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "DRAFT",
            PurchaseOrderStatus::Submitted => "SUBMITTED",
            PurchaseOrderStatus::Approved => "APPROVED",
            PurchaseOrderStatus::PartiallyReceived => "PARTIALLY_RECEIVED",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Closed => "CLOSED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// RECEIVED only moves on to CLOSED; CLOSED and CANCELLED are final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received
                | PurchaseOrderStatus::Closed
                | PurchaseOrderStatus::Cancelled
        )
    }
}

impl core::str::FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DRAFT" => PurchaseOrderStatus::Draft,
            "SUBMITTED" => PurchaseOrderStatus::Submitted,
            "APPROVED" => PurchaseOrderStatus::Approved,
            "PARTIALLY_RECEIVED" => PurchaseOrderStatus::PartiallyReceived,
            "RECEIVED" => PurchaseOrderStatus::Received,
            "CLOSED" => PurchaseOrderStatus::Closed,
            "CANCELLED" => PurchaseOrderStatus::Cancelled,
            other => {
                return Err(DomainError::validation(format!(
                    "unknown purchase order status: {other}"
                )));
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineRequest {
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: PartyId,
    pub location_id: LocationId,
    pub lines: Vec<PurchaseLineRequest>,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: PurchaseOrderLineId,
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    pub received_quantity: i64,
    pub unit_cost: Decimal,
}

impl PurchaseOrderLine {
    pub fn line_total(&self) -> Decimal {
        round_money(Decimal::from(self.quantity) * self.unit_cost)
    }

    pub fn outstanding(&self) -> i64 {
        self.quantity - self.received_quantity
    }

    pub fn is_complete(&self) -> bool {
        self.received_quantity == self.quantity
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub tenant_id: TenantId,
    pub order_number: String,
    pub supplier_id: PartyId,
    pub location_id: LocationId,
    pub status: PurchaseOrderStatus,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<PurchaseOrderLine>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn validate_line(line: &PurchaseLineRequest) -> DomainResult<()> {
    if line.quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    ensure_non_negative("unit_cost", line.unit_cost)
}

impl PurchaseOrder {
    /// Build a DRAFT order. Supplier, item and location existence are checked
    /// by the caller against the store.
    pub fn create(
        tenant_id: TenantId,
        id: PurchaseOrderId,
        order_number: String,
        request: CreatePurchaseOrderRequest,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if request.lines.is_empty() {
            return Err(DomainError::validation("purchase order must have at least one line"));
        }

        let mut order = Self {
            id,
            tenant_id,
            order_number,
            supplier_id: request.supplier_id,
            location_id: request.location_id,
            status: PurchaseOrderStatus::Draft,
            expected_date: request.expected_date,
            notes: request.notes,
            lines: Vec::with_capacity(request.lines.len()),
            created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        for line in &request.lines {
            order.push_line(line)?;
        }
        Ok(order)
    }

    fn push_line(&mut self, line: &PurchaseLineRequest) -> DomainResult<()> {
        validate_line(line)?;
        let line_no = self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;
        self.lines.push(PurchaseOrderLine {
            id: PurchaseOrderLineId::generate(),
            line_no,
            item_id: line.item_id,
            quantity: line.quantity,
            received_quantity: 0,
            unit_cost: round_money(line.unit_cost),
        });
        Ok(())
    }

    fn transition(
        &mut self,
        allowed: &[PurchaseOrderStatus],
        next: PurchaseOrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !allowed.contains(&self.status) {
            return Err(DomainError::invariant(format!(
                "cannot move purchase order from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Lines can only be added while the order is a draft.
    pub fn add_line(&mut self, line: PurchaseLineRequest, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "cannot modify purchase order once submitted",
            ));
        }
        self.push_line(&line)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn submit(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot submit purchase order without lines"));
        }
        self.transition(&[PurchaseOrderStatus::Draft], PurchaseOrderStatus::Submitted, now)
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(&[PurchaseOrderStatus::Submitted], PurchaseOrderStatus::Approved, now)
    }

    /// Cancel from any non-terminal state. Stock already received stays on hand.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(
            &[
                PurchaseOrderStatus::Draft,
                PurchaseOrderStatus::Submitted,
                PurchaseOrderStatus::Approved,
                PurchaseOrderStatus::PartiallyReceived,
            ],
            PurchaseOrderStatus::Cancelled,
            now,
        )
    }

    /// Close a received order, or short-close a partially received one.
    pub fn close(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(
            &[
                PurchaseOrderStatus::Received,
                PurchaseOrderStatus::PartiallyReceived,
            ],
            PurchaseOrderStatus::Closed,
            now,
        )
    }

    pub fn can_receive(&self) -> bool {
        matches!(
            self.status,
            PurchaseOrderStatus::Submitted | PurchaseOrderStatus::PartiallyReceived
        )
    }

    /// Orders can be sent to the supplier once submitted and before any
    /// receipt.
    pub fn ensure_sendable(&self) -> DomainResult<()> {
        match self.status {
            PurchaseOrderStatus::Submitted | PurchaseOrderStatus::Approved => Ok(()),
            other => Err(DomainError::invariant(format!(
                "cannot send a purchase order in status {}",
                other.as_str()
            ))),
        }
    }

    pub fn total(&self) -> Decimal {
        round_money(self.lines.iter().map(PurchaseOrderLine::line_total).sum())
    }

    pub fn line(&self, id: PurchaseOrderLineId) -> Option<&PurchaseOrderLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Status implied by the received quantities: RECEIVED once every line
    /// is complete, PARTIALLY_RECEIVED once anything was received.
    pub fn receipt_status(&self) -> Option<PurchaseOrderStatus> {
        if !self.lines.is_empty() && self.lines.iter().all(PurchaseOrderLine::is_complete) {
            Some(PurchaseOrderStatus::Received)
        } else if self.lines.iter().any(|l| l.received_quantity > 0) {
            Some(PurchaseOrderStatus::PartiallyReceived)
        } else {
            None
        }
    }
}
