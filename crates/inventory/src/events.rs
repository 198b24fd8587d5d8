use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::TenantId;
use stockroom_events::Event;

use crate::adjustment::{Adjustment, AdjustmentId, AdjustmentLine, AdjustmentType};
use crate::transfer::{Transfer, TransferId, TransferLine};

/// Facts published after a stock document is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StockEvent {
    StockTransferred {
        tenant_id: TenantId,
        transfer_id: TransferId,
        transfer_number: String,
        from_location_id: LocationId,
        to_location_id: LocationId,
        lines: Vec<TransferLine>,
        occurred_at: DateTime<Utc>,
    },
    StockAdjusted {
        tenant_id: TenantId,
        adjustment_id: AdjustmentId,
        adjustment_number: String,
        location_id: LocationId,
        adjustment_type: AdjustmentType,
        lines: Vec<AdjustmentLine>,
        occurred_at: DateTime<Utc>,
    },
    /// On-hand stock across all locations fell below the item's minimum.
    LowStockDetected {
        tenant_id: TenantId,
        item_id: ItemId,
        sku: String,
        on_hand: i64,
        min_stock_level: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl StockEvent {
    pub fn transferred(transfer: &Transfer) -> Self {
        StockEvent::StockTransferred {
            tenant_id: transfer.tenant_id,
            transfer_id: transfer.id,
            transfer_number: transfer.transfer_number.clone(),
            from_location_id: transfer.from_location_id,
            to_location_id: transfer.to_location_id,
            lines: transfer.lines.clone(),
            occurred_at: transfer.created_at,
        }
    }

    pub fn adjusted(adjustment: &Adjustment) -> Self {
        StockEvent::StockAdjusted {
            tenant_id: adjustment.tenant_id,
            adjustment_id: adjustment.id,
            adjustment_number: adjustment.adjustment_number.clone(),
            location_id: adjustment.location_id,
            adjustment_type: adjustment.adjustment_type,
            lines: adjustment.lines.clone(),
            occurred_at: adjustment.created_at,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockTransferred { .. } => "inventory.stock.transferred",
            StockEvent::StockAdjusted { .. } => "inventory.stock.adjusted",
            StockEvent::LowStockDetected { .. } => "inventory.stock.low",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::StockTransferred { occurred_at, .. }
            | StockEvent::StockAdjusted { occurred_at, .. }
            | StockEvent::LowStockDetected { occurred_at, .. } => *occurred_at,
        }
    }
}
