//! Purchasing domain module (purchase orders and goods receipt).
//!
//! This crate contains business rules for purchase orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod events;
pub mod order;
pub mod receipt;

pub use events::PurchaseOrderEvent;
pub use order::{
    CreatePurchaseOrderRequest, PurchaseLineRequest, PurchaseOrder, PurchaseOrderId,
    PurchaseOrderLine, PurchaseOrderLineId, PurchaseOrderStatus,
};
pub use receipt::{
    GoodsReceipt, GoodsReceiptId, GoodsReceiptLine, ReceiptPlan, ReceiveGoodsRequest,
    ReceiveLineRequest, plan_receipt,
};
