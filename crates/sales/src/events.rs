use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_catalog::LocationId;
use stockroom_core::TenantId;
use stockroom_events::Event;

use crate::order::{SalesChannel, SalesOrder, SalesOrderId, SalesOrderStatus};
use crate::payment::PaymentStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SalesOrderEvent {
    SalesOrderCreated {
        tenant_id: TenantId,
        order_id: SalesOrderId,
        order_number: String,
        channel: SalesChannel,
        location_id: LocationId,
        status: SalesOrderStatus,
        total: Decimal,
        occurred_at: DateTime<Utc>,
    },
    SalesOrderStatusChanged {
        tenant_id: TenantId,
        order_id: SalesOrderId,
        status: SalesOrderStatus,
        occurred_at: DateTime<Utc>,
    },
    PaymentRecorded {
        tenant_id: TenantId,
        order_id: SalesOrderId,
        amount: Decimal,
        amount_paid: Decimal,
        payment_status: PaymentStatus,
        occurred_at: DateTime<Utc>,
    },
}

impl SalesOrderEvent {
    pub fn created(order: &SalesOrder) -> Self {
        SalesOrderEvent::SalesOrderCreated {
            tenant_id: order.tenant_id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            channel: order.channel,
            location_id: order.location_id,
            status: order.status,
            total: order.total,
            occurred_at: order.created_at,
        }
    }

    pub fn status_changed(order: &SalesOrder) -> Self {
        SalesOrderEvent::SalesOrderStatusChanged {
            tenant_id: order.tenant_id,
            order_id: order.id,
            status: order.status,
            occurred_at: order.updated_at,
        }
    }

    pub fn payment_recorded(order: &SalesOrder, amount: Decimal) -> Self {
        SalesOrderEvent::PaymentRecorded {
            tenant_id: order.tenant_id,
            order_id: order.id,
            amount,
            amount_paid: order.amount_paid,
            payment_status: order.payment_status,
            occurred_at: order.updated_at,
        }
    }
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::SalesOrderCreated { .. } => "sales.sales_order.created",
            SalesOrderEvent::SalesOrderStatusChanged { .. } => "sales.sales_order.status_changed",
            SalesOrderEvent::PaymentRecorded { .. } => "sales.sales_order.payment_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::SalesOrderCreated { occurred_at, .. }
            | SalesOrderEvent::SalesOrderStatusChanged { occurred_at, .. }
            | SalesOrderEvent::PaymentRecorded { occurred_at, .. } => *occurred_at,
        }
    }
}
