//! Persistence boundary.
//!
//! One trait per bounded context, every method keyed by [`TenantId`]. The
//! composite `commit_*` methods apply a document write together with its
//! [`LedgerPosting`] as one unit: either the document, every ledger delta and
//! one stock movement per delta are stored, or nothing is.
//!
//! New documents are numbered inside the same unit from a per-tenant
//! sequence named by their prefix, so a rejected document never consumes a
//! number. The stored document is returned with its number.
//!
//! Implementations: [`InMemoryStore`] (tests/dev) and [`PostgresStore`].

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use stockroom_catalog::{Item, ItemId, Location, LocationId};
use stockroom_core::{AggregateId, DomainError, TenantId};
use stockroom_inventory::{
    Adjustment, AdjustmentId, InventoryLevel, LedgerPosting, MovementKind, StockMovement,
    Transfer, TransferId,
};
use stockroom_parties::{Party, PartyId, PartyKind};
use stockroom_purchasing::{
    GoodsReceipt, PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus, ReceiptPlan,
};
use stockroom_sales::{SalesChannel, SalesOrder, SalesOrderId, SalesOrderStatus};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure.
///
/// `InsufficientStock` is raised by the ledger's conditional update and
/// `Rejected` carries any other business rule that failed inside a commit;
/// the remaining variants are infrastructure conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(
        "insufficient stock for item {item_id} at location {location_id} \
         (requested {requested}, available {available})"
    )]
    InsufficientStock {
        item_id: AggregateId,
        location_id: AggregateId,
        requested: i64,
        available: i64,
    },

    #[error(transparent)]
    Rejected(DomainError),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// Transient: the backend could not be reached. Safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InsufficientStock {
                item_id,
                location_id,
                requested,
                available,
            } => StoreError::InsufficientStock {
                item_id,
                location_id,
                requested,
                available,
            },
            DomainError::NotFound(what) => StoreError::NotFound(what),
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::Rejected(other),
        }
    }
}

/// `PO-000042`
pub fn document_number(sequence: &str, value: u64) -> String {
    format!("{sequence}-{value:06}")
}

/// Ledger row query. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LevelFilter {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

impl LevelFilter {
    pub fn matches(&self, level: &InventoryLevel) -> bool {
        self.item_id.is_none_or(|id| id == level.item_id)
            && self.location_id.is_none_or(|id| id == level.location_id)
    }
}

/// Stock movement query over the half-open period `[from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MovementFilter {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub kind: Option<MovementKind>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn matches(&self, m: &StockMovement) -> bool {
        self.item_id.is_none_or(|id| id == m.item_id)
            && self.location_id.is_none_or(|id| id == m.location_id)
            && self.kind.is_none_or(|k| k == m.kind)
            && self.from.is_none_or(|from| m.occurred_at >= from)
            && self.to.is_none_or(|to| m.occurred_at < to)
    }
}

/// Sales order query; the period applies to `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SalesOrderFilter {
    #[serde(default)]
    pub status: Option<SalesOrderStatus>,
    #[serde(default)]
    pub channel: Option<SalesChannel>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl SalesOrderFilter {
    pub fn matches(&self, order: &SalesOrder) -> bool {
        self.status.is_none_or(|s| s == order.status)
            && self.channel.is_none_or(|c| c == order.channel)
            && self.from.is_none_or(|from| order.created_at >= from)
            && self.to.is_none_or(|to| order.created_at < to)
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert an item and a zero ledger row for every location of its
    /// tenant. A duplicate sku is a `Conflict`.
    async fn insert_item(&self, item: &Item) -> StoreResult<()>;

    /// Overwrite an existing item (sku is never changed).
    async fn update_item(&self, item: &Item) -> StoreResult<()>;

    async fn get_item(&self, tenant_id: TenantId, id: ItemId) -> StoreResult<Option<Item>>;

    async fn list_items(&self, tenant_id: TenantId) -> StoreResult<Vec<Item>>;

    /// Insert a location and a zero ledger row for every item of its tenant.
    async fn insert_location(&self, location: &Location) -> StoreResult<()>;

    async fn get_location(
        &self,
        tenant_id: TenantId,
        id: LocationId,
    ) -> StoreResult<Option<Location>>;

    async fn list_locations(&self, tenant_id: TenantId) -> StoreResult<Vec<Location>>;
}

#[async_trait]
pub trait PartyStore: Send + Sync {
    async fn insert_party(&self, party: &Party) -> StoreResult<()>;

    async fn update_party(&self, party: &Party) -> StoreResult<()>;

    async fn get_party(&self, tenant_id: TenantId, id: PartyId) -> StoreResult<Option<Party>>;

    async fn list_parties(
        &self,
        tenant_id: TenantId,
        kind: Option<PartyKind>,
    ) -> StoreResult<Vec<Party>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_level(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
    ) -> StoreResult<Option<InventoryLevel>>;

    async fn list_levels(
        &self,
        tenant_id: TenantId,
        filter: &LevelFilter,
    ) -> StoreResult<Vec<InventoryLevel>>;

    /// Movements in occurrence order.
    async fn list_movements(
        &self,
        tenant_id: TenantId,
        filter: &MovementFilter,
    ) -> StoreResult<Vec<StockMovement>>;
}

/// Purchase orders are versioned: `insert` expects version 0 and stores the
/// numbered order at version 1, `update` expects the version the order was
/// read at and returns the new version.
#[async_trait]
pub trait PurchasingStore: Send + Sync {
    async fn insert_purchase_order(
        &self,
        order: &PurchaseOrder,
        sequence: &str,
    ) -> StoreResult<PurchaseOrder>;

    async fn update_purchase_order(&self, order: &PurchaseOrder) -> StoreResult<u64>;

    async fn get_purchase_order(
        &self,
        tenant_id: TenantId,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>>;

    async fn list_purchase_orders(
        &self,
        tenant_id: TenantId,
        status: Option<PurchaseOrderStatus>,
    ) -> StoreResult<Vec<PurchaseOrder>>;

    /// Store the receipt, the updated order and the ledger posting as one
    /// unit. Returns the order's new version.
    async fn commit_receipt(&self, plan: &ReceiptPlan) -> StoreResult<u64>;

    async fn list_receipts(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<GoodsReceipt>>;
}

#[async_trait]
pub trait StockDocumentStore: Send + Sync {
    async fn commit_transfer(
        &self,
        transfer: &Transfer,
        posting: &LedgerPosting,
        sequence: &str,
    ) -> StoreResult<Transfer>;

    async fn commit_adjustment(
        &self,
        adjustment: &Adjustment,
        posting: &LedgerPosting,
        sequence: &str,
    ) -> StoreResult<Adjustment>;

    async fn get_transfer(
        &self,
        tenant_id: TenantId,
        id: TransferId,
    ) -> StoreResult<Option<Transfer>>;

    async fn get_adjustment(
        &self,
        tenant_id: TenantId,
        id: AdjustmentId,
    ) -> StoreResult<Option<Adjustment>>;
}

/// Sales orders are versioned like purchase orders. The optional posting is
/// applied in the same unit as the order write.
#[async_trait]
pub trait SalesStore: Send + Sync {
    async fn insert_sales_order(
        &self,
        order: &SalesOrder,
        sequence: &str,
        posting: Option<&LedgerPosting>,
    ) -> StoreResult<SalesOrder>;

    async fn update_sales_order(
        &self,
        order: &SalesOrder,
        posting: Option<&LedgerPosting>,
    ) -> StoreResult<u64>;

    async fn get_sales_order(
        &self,
        tenant_id: TenantId,
        id: SalesOrderId,
    ) -> StoreResult<Option<SalesOrder>>;

    async fn list_sales_orders(
        &self,
        tenant_id: TenantId,
        filter: &SalesOrderFilter,
    ) -> StoreResult<Vec<SalesOrder>>;
}

/// Everything the services need from persistence.
pub trait Store:
    CatalogStore
    + PartyStore
    + LedgerStore
    + PurchasingStore
    + StockDocumentStore
    + SalesStore
{
}

impl<T> Store for T where
    T: CatalogStore
        + PartyStore
        + LedgerStore
        + PurchasingStore
        + StockDocumentStore
        + SalesStore
{
}

pub type SharedStore = Arc<dyn Store>;

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_inventory::{DocumentRef, DocumentType, LedgerDelta};

    #[test]
    fn domain_stock_errors_keep_their_numbers() {
        let item = AggregateId::new();
        let loc = AggregateId::new();
        let err: StoreError = DomainError::insufficient_stock(item, loc, 5, 2).into();
        assert_eq!(
            err,
            StoreError::InsufficientStock {
                item_id: item,
                location_id: loc,
                requested: 5,
                available: 2
            }
        );
        assert!(!err.is_transient());
        assert!(StoreError::Unavailable("down".into()).is_transient());
    }

    #[test]
    fn rejected_rules_keep_their_kind() {
        let err: StoreError = DomainError::validation("quantity out of range").into();
        assert_eq!(
            err,
            StoreError::Rejected(DomainError::validation("quantity out of range"))
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn document_numbers_are_zero_padded() {
        assert_eq!(document_number("PO", 42), "PO-000042");
        assert_eq!(document_number("ADJ", 1_234_567), "ADJ-1234567");
    }

    #[test]
    fn movement_filter_period_is_half_open() {
        let item = ItemId::generate();
        let loc = LocationId::generate();
        let at = Utc::now();
        let posting = LedgerPosting::new(
            DocumentRef::new(DocumentType::Adjustment, AggregateId::new()),
            None,
            at,
        )
        .with_deltas([LedgerDelta::adjustment(item, loc, -2).unwrap()]);
        let movement = &posting.movements(TenantId::new())[0];

        let at_start = MovementFilter {
            from: Some(at),
            ..Default::default()
        };
        let at_end = MovementFilter {
            to: Some(at),
            ..Default::default()
        };
        let other_kind = MovementFilter {
            kind: Some(MovementKind::Receipt),
            ..Default::default()
        };

        assert!(at_start.matches(movement));
        assert!(!at_end.matches(movement));
        assert!(!other_kind.matches(movement));
    }
}
