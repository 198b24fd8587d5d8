use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_catalog::LocationId;
use stockroom_core::TenantId;
use stockroom_events::Event;
use stockroom_parties::PartyId;

use crate::order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus};
use crate::receipt::{GoodsReceipt, GoodsReceiptId, GoodsReceiptLine};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated {
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        order_number: String,
        supplier_id: PartyId,
        total: Decimal,
        occurred_at: DateTime<Utc>,
    },
    /// Submit, approve, cancel and close.
    PurchaseOrderStatusChanged {
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        status: PurchaseOrderStatus,
        occurred_at: DateTime<Utc>,
    },
    PurchaseOrderSent {
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        supplier_id: PartyId,
        occurred_at: DateTime<Utc>,
    },
    GoodsReceived {
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        receipt_id: GoodsReceiptId,
        location_id: LocationId,
        lines: Vec<GoodsReceiptLine>,
        order_status: PurchaseOrderStatus,
        occurred_at: DateTime<Utc>,
    },
}

impl PurchaseOrderEvent {
    pub fn created(order: &PurchaseOrder) -> Self {
        PurchaseOrderEvent::PurchaseOrderCreated {
            tenant_id: order.tenant_id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            supplier_id: order.supplier_id,
            total: order.total(),
            occurred_at: order.created_at,
        }
    }

    pub fn status_changed(order: &PurchaseOrder) -> Self {
        PurchaseOrderEvent::PurchaseOrderStatusChanged {
            tenant_id: order.tenant_id,
            order_id: order.id,
            status: order.status,
            occurred_at: order.updated_at,
        }
    }

    pub fn sent(order: &PurchaseOrder, occurred_at: DateTime<Utc>) -> Self {
        PurchaseOrderEvent::PurchaseOrderSent {
            tenant_id: order.tenant_id,
            order_id: order.id,
            supplier_id: order.supplier_id,
            occurred_at,
        }
    }

    pub fn goods_received(receipt: &GoodsReceipt, order: &PurchaseOrder) -> Self {
        PurchaseOrderEvent::GoodsReceived {
            tenant_id: receipt.tenant_id,
            order_id: order.id,
            receipt_id: receipt.id,
            location_id: receipt.location_id,
            lines: receipt.lines.clone(),
            order_status: order.status,
            occurred_at: receipt.received_at,
        }
    }
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated { .. } => "purchasing.purchase_order.created",
            PurchaseOrderEvent::PurchaseOrderStatusChanged { .. } => {
                "purchasing.purchase_order.status_changed"
            }
            PurchaseOrderEvent::PurchaseOrderSent { .. } => "purchasing.purchase_order.sent",
            PurchaseOrderEvent::GoodsReceived { .. } => "purchasing.purchase_order.goods_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated { occurred_at, .. }
            | PurchaseOrderEvent::PurchaseOrderStatusChanged { occurred_at, .. }
            | PurchaseOrderEvent::PurchaseOrderSent { occurred_at, .. }
            | PurchaseOrderEvent::GoodsReceived { occurred_at, .. } => *occurred_at,
        }
    }
}
