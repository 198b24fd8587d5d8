//! Application services.
//!
//! Each operation follows the same pipeline:
//!
//! ```text
//! request
//!   ↓
//! 1. load referenced rows (tenant-scoped; missing → NotFound)
//!   ↓
//! 2. plan with the pure domain code (validation, state machine, deltas)
//!   ↓
//! 3. commit document + ledger posting as one store call, which also
//!    assigns the document number
//!   ↓
//! 4. publish events (after commit; failures are logged, not returned)
//! ```
//!
//! Nothing is written before step 3, and step 3 is all-or-nothing, so a
//! rejected request leaves every row as it was. Store calls go through the
//! configured [`RetryPolicy`], which only retries transient failures.

mod catalog;
mod inventory;
mod parties;
mod purchasing;
mod reporting;
mod sales;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

use stockroom_catalog::{Item, ItemId, Location, LocationId};
use stockroom_core::{AggregateId, DomainError, TenantId, UserId};
use stockroom_events::{Event, EventBus, EventEnvelope, InMemoryEventBus};
use stockroom_inventory::{LedgerPosting, StockEvent};
use stockroom_parties::{Party, PartyId, PartyKind};

use crate::retry::RetryPolicy;
use crate::store::{
    CatalogStore, InMemoryStore, LedgerStore, LevelFilter, PartyStore, SharedStore, StoreError,
};

pub use purchasing::ReceiptOutcome;
pub use reporting::AdjustmentReportFilter;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Shared publish side of the event bus.
pub type SharedBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),

    #[error("unauthorized")]
    Unauthorized,
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::InsufficientStock {
                item_id,
                location_id,
                requested,
                available,
            } => ServiceError::Domain(DomainError::insufficient_stock(
                item_id,
                location_id,
                requested,
                available,
            )),
            StoreError::NotFound(what) => ServiceError::Domain(DomainError::NotFound(what)),
            StoreError::Conflict(msg) => ServiceError::Domain(DomainError::Conflict(msg)),
            StoreError::Rejected(err) => ServiceError::Domain(err),
            other => ServiceError::Store(other),
        }
    }
}

/// Who is acting, and for which tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub tenant_id: TenantId,
    pub user_id: Option<UserId>,
}

impl Caller {
    pub fn new(tenant_id: TenantId, user_id: Option<UserId>) -> Self {
        Self { tenant_id, user_id }
    }
}

/// Prefixes of the per-tenant document number sequences. The store draws
/// the number when it commits the document.
pub(crate) mod sequences {
    pub const PURCHASE_ORDER: &str = "PO";
    pub const TRANSFER: &str = "TR";
    pub const ADJUSTMENT: &str = "ADJ";
    pub const SALES_ORDER: &str = "SO";
    pub const POS_SALE: &str = "POS";
}

#[derive(Clone)]
pub struct Services {
    store: SharedStore,
    bus: SharedBus,
    retry: RetryPolicy,
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Services {
    pub fn new(store: SharedStore, bus: SharedBus, retry: RetryPolicy) -> Self {
        Self { store, bus, retry }
    }

    /// In-memory store and bus with the default retry policy.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryEventBus::new()),
            RetryPolicy::default(),
        )
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Publish a committed fact. The change is already stored, so failures
    /// are only logged.
    fn publish<E>(&self, tenant_id: TenantId, aggregate_id: AggregateId, aggregate_type: &str, event: &E)
    where
        E: Event + Serialize,
    {
        let envelope =
            match EventEnvelope::from_typed(tenant_id, aggregate_id, aggregate_type, event) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(event_type = event.event_type(), error = %err, "failed to serialize event");
                    return;
                }
            };
        if let Err(err) = self.bus.publish(envelope) {
            warn!(event_type = event.event_type(), error = ?err, "failed to publish event");
        } else {
            debug!(%tenant_id, event_type = event.event_type(), "event published");
        }
    }

    async fn load_item(&self, tenant_id: TenantId, id: ItemId) -> ServiceResult<Item> {
        self.retry
            .run("get_item", || self.store.get_item(tenant_id, id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("item {id}")).into())
    }

    /// The item must exist and be active to appear on a new document.
    async fn load_tradable_item(&self, tenant_id: TenantId, id: ItemId) -> ServiceResult<Item> {
        let item = self.load_item(tenant_id, id).await?;
        if !item.can_be_traded() {
            return Err(DomainError::validation(format!("item {} is inactive", item.sku)).into());
        }
        Ok(item)
    }

    async fn load_location(&self, tenant_id: TenantId, id: LocationId) -> ServiceResult<Location> {
        self.retry
            .run("get_location", || self.store.get_location(tenant_id, id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("location {id}")).into())
    }

    async fn load_party(&self, tenant_id: TenantId, id: PartyId) -> ServiceResult<Party> {
        self.retry
            .run("get_party", || self.store.get_party(tenant_id, id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("party {id}")).into())
    }

    /// Active party of `kind`; wrong kind or suspended is a validation error.
    async fn load_counterparty(
        &self,
        tenant_id: TenantId,
        id: PartyId,
        kind: PartyKind,
    ) -> ServiceResult<Party> {
        let party = self.load_party(tenant_id, id).await?;
        party.ensure_usable_as(kind)?;
        Ok(party)
    }

    /// On-hand total of `item_id` across every location.
    async fn on_hand_total(&self, tenant_id: TenantId, item_id: ItemId) -> ServiceResult<i64> {
        let filter = LevelFilter {
            item_id: Some(item_id),
            location_id: None,
        };
        let levels = self
            .retry
            .run("list_levels", || self.store.list_levels(tenant_id, &filter))
            .await?;
        Ok(levels.iter().map(|l| l.quantity).sum())
    }

    /// After a committed posting, raise a low-stock event for every item
    /// whose on-hand total went from at or above its minimum to below it.
    ///
    /// Runs after the commit; failures here never fail the operation.
    async fn detect_low_stock(&self, tenant_id: TenantId, posting: &LedgerPosting) {
        let mut decreases: BTreeMap<ItemId, i64> = BTreeMap::new();
        for delta in posting.deltas.iter().filter(|d| d.decreases_on_hand()) {
            *decreases.entry(delta.item_id).or_default() += delta.quantity_delta;
        }
        for (item_id, delta) in decreases {
            if let Err(err) = self.check_low_stock(tenant_id, item_id, delta, posting.occurred_at).await {
                warn!(%tenant_id, %item_id, error = %err, "low stock check failed");
            }
        }
    }

    async fn check_low_stock(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        on_hand_delta: i64,
        at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let item = self.load_item(tenant_id, item_id).await?;
        if item.min_stock_level <= 0 {
            return Ok(());
        }
        let after = self.on_hand_total(tenant_id, item_id).await?;
        let before = after - on_hand_delta;
        if before >= item.min_stock_level && after < item.min_stock_level {
            self.publish(
                tenant_id,
                item_id.aggregate_id(),
                "catalog.item",
                &StockEvent::LowStockDetected {
                    tenant_id,
                    item_id,
                    sku: item.sku.clone(),
                    on_hand: after,
                    min_stock_level: item.min_stock_level,
                    occurred_at: at,
                },
            );
        }
        Ok(())
    }
}
