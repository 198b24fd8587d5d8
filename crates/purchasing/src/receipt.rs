//! Goods receipt planning.
//!
//! [`plan_receipt`] validates a receipt against its purchase order and
//! produces everything the store has to commit as one unit: the receipt
//! record, the updated order and the ledger posting. Nothing here writes;
//! a rejected receipt therefore changes nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::{DomainError, DomainResult, UserId, typed_id};
use stockroom_inventory::{DocumentRef, DocumentType, LedgerDelta, LedgerPosting};

use crate::order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderLineId};

typed_id!(GoodsReceiptId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveLineRequest {
    pub purchase_order_line_id: PurchaseOrderLineId,
    pub item_id: ItemId,
    pub received_quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGoodsRequest {
    pub purchase_order_id: PurchaseOrderId,
    pub location_id: LocationId,
    pub lines: Vec<ReceiveLineRequest>,
    pub received_by_id: Option<UserId>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceiptLine {
    pub purchase_order_line_id: PurchaseOrderLineId,
    pub item_id: ItemId,
    pub received_quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceipt {
    pub id: GoodsReceiptId,
    pub tenant_id: stockroom_core::TenantId,
    pub purchase_order_id: PurchaseOrderId,
    pub location_id: LocationId,
    pub received_by_id: Option<UserId>,
    pub notes: Option<String>,
    pub lines: Vec<GoodsReceiptLine>,
    pub received_at: DateTime<Utc>,
}

impl GoodsReceipt {
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.received_quantity).sum()
    }
}

/// Result of planning a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPlan {
    pub receipt: GoodsReceipt,
    /// The order with received quantities and status updated; its `version`
    /// is still the one that was read.
    pub order: PurchaseOrder,
    pub posting: LedgerPosting,
}

/// Validate `request` against `order` and plan the receipt.
///
/// Checks, in order: at least one positive line and no negative ones; the
/// order accepts receipts; every line belongs to the order and names that
/// line's item; cumulative received quantity (duplicates summed) stays
/// within the ordered quantity.
pub fn plan_receipt(
    order: &PurchaseOrder,
    request: ReceiveGoodsRequest,
    receipt_id: GoodsReceiptId,
    now: DateTime<Utc>,
) -> DomainResult<ReceiptPlan> {
    if request.purchase_order_id != order.id {
        return Err(DomainError::invariant("receipt does not belong to this purchase order"));
    }
    if let Some(line) = request.lines.iter().find(|l| l.received_quantity < 0) {
        return Err(DomainError::validation(format!(
            "received quantity for line {} cannot be negative",
            line.purchase_order_line_id
        )));
    }
    let lines: Vec<ReceiveLineRequest> = request
        .lines
        .into_iter()
        .filter(|l| l.received_quantity > 0)
        .collect();
    if lines.is_empty() {
        return Err(DomainError::validation(
            "receipt must receive a positive quantity on at least one line",
        ));
    }

    if !order.can_receive() {
        return Err(DomainError::validation(format!(
            "purchase order {} cannot receive goods in status {}",
            order.order_number,
            order.status.as_str()
        )));
    }

    // Sum per PO line; BTreeMap keeps the plan deterministic.
    let mut per_line: BTreeMap<PurchaseOrderLineId, i64> = BTreeMap::new();
    for line in &lines {
        let po_line = order
            .line(line.purchase_order_line_id)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "purchase order line {}",
                    line.purchase_order_line_id
                ))
            })?;
        if po_line.item_id != line.item_id {
            return Err(DomainError::validation(format!(
                "item {} does not match purchase order line {}",
                line.item_id, po_line.line_no
            )));
        }
        *per_line.entry(line.purchase_order_line_id).or_default() += line.received_quantity;
    }

    let mut updated = order.clone();
    let mut deltas = Vec::with_capacity(per_line.len());
    for (line_id, quantity) in &per_line {
        let Some(po_line) = updated.lines.iter_mut().find(|l| l.id == *line_id) else {
            return Err(DomainError::not_found(format!("purchase order line {line_id}")));
        };
        let received = po_line.received_quantity + quantity;
        if received > po_line.quantity {
            return Err(DomainError::OverReceipt {
                line_no: po_line.line_no,
                ordered: po_line.quantity,
                received,
            });
        }
        po_line.received_quantity = received;
        deltas.push(LedgerDelta::receipt(po_line.item_id, request.location_id, *quantity)?);
    }

    if let Some(status) = updated.receipt_status() {
        updated.status = status;
    }
    updated.updated_at = now;

    let receipt = GoodsReceipt {
        id: receipt_id,
        tenant_id: order.tenant_id,
        purchase_order_id: order.id,
        location_id: request.location_id,
        received_by_id: request.received_by_id,
        notes: request.notes,
        lines: lines
            .into_iter()
            .map(|l| GoodsReceiptLine {
                purchase_order_line_id: l.purchase_order_line_id,
                item_id: l.item_id,
                received_quantity: l.received_quantity,
                notes: l.notes,
            })
            .collect(),
        received_at: now,
    };

    let posting = LedgerPosting::new(
        DocumentRef::new(DocumentType::GoodsReceipt, receipt_id.aggregate_id()),
        request.received_by_id,
        now,
    )
    .with_deltas(deltas);

    Ok(ReceiptPlan {
        receipt,
        order: updated,
        posting,
    })
}
