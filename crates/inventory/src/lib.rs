//! Inventory domain module.
//!
//! Per (item, location) ledger rows and the rules every quantity mutation
//! obeys, plus the stock documents that drive them (transfers and
//! adjustments). Pure domain logic: persistence applies the same deltas
//! atomically in `stockroom-infra`.

pub mod adjustment;
pub mod events;
pub mod ledger;
pub mod movement;
pub mod transfer;

pub use adjustment::{
    Adjustment, AdjustmentId, AdjustmentLine, AdjustmentLineRequest, AdjustmentType,
    CreateAdjustmentRequest, NetAdjustment,
};
pub use events::StockEvent;
pub use ledger::{InventoryLevel, LedgerDelta};
pub use movement::{DocumentRef, DocumentType, LedgerPosting, MovementKind, StockMovement};
pub use transfer::{
    CreateTransferRequest, Transfer, TransferId, TransferLine, TransferLineRequest, TransferStatus,
};
