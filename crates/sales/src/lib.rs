//! Sales Orders domain module (standard orders and point-of-sale checkout).
//!
//! This crate contains business rules for sales orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Stock effects are
//! returned as ledger deltas for the store to apply.

pub mod events;
pub mod order;
pub mod payment;
pub mod totals;

pub use events::SalesOrderEvent;
pub use order::{
    CreateSalesOrderRequest, SalesChannel, SalesLineRequest, SalesOrder, SalesOrderId,
    SalesOrderLine, SalesOrderStatus,
};
pub use payment::{PaymentMethod, PaymentStatus};
pub use totals::{LineAmounts, OrderTotals, compute_line, compute_order};
