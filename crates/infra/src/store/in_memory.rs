use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockroom_catalog::{Item, ItemId, Location, LocationId};
use stockroom_core::TenantId;
use stockroom_inventory::{
    Adjustment, AdjustmentId, InventoryLevel, LedgerPosting, StockMovement, Transfer, TransferId,
};
use stockroom_parties::{Party, PartyId, PartyKind};
use stockroom_purchasing::{
    GoodsReceipt, PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus, ReceiptPlan,
};
use stockroom_sales::{SalesOrder, SalesOrderId};

use super::{
    CatalogStore, LedgerStore, LevelFilter, MovementFilter, PartyStore, PurchasingStore,
    SalesOrderFilter, SalesStore, StockDocumentStore, StoreError, StoreResult, document_number,
};

type LevelKey = (TenantId, ItemId, LocationId);

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<(TenantId, ItemId), Item>,
    locations: BTreeMap<(TenantId, LocationId), Location>,
    parties: BTreeMap<(TenantId, PartyId), Party>,
    levels: BTreeMap<LevelKey, InventoryLevel>,
    movements: Vec<StockMovement>,
    purchase_orders: BTreeMap<(TenantId, PurchaseOrderId), PurchaseOrder>,
    receipts: Vec<GoodsReceipt>,
    transfers: BTreeMap<(TenantId, TransferId), Transfer>,
    adjustments: BTreeMap<(TenantId, AdjustmentId), Adjustment>,
    sales_orders: BTreeMap<(TenantId, SalesOrderId), SalesOrder>,
    sequences: BTreeMap<(TenantId, String), u64>,
}

impl State {
    /// Apply every delta of `posting` or none of them.
    ///
    /// Deltas are staged on copies of the affected rows; the rows and the
    /// movements are written only after the last delta passed its check.
    fn apply_posting(&mut self, tenant_id: TenantId, posting: &LedgerPosting) -> StoreResult<()> {
        let mut staged: BTreeMap<LevelKey, InventoryLevel> = BTreeMap::new();
        for delta in &posting.deltas {
            let key = (tenant_id, delta.item_id, delta.location_id);
            let level = match staged.entry(key) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let current = self.levels.get(&key).cloned().unwrap_or_else(|| {
                        InventoryLevel::empty(
                            tenant_id,
                            delta.item_id,
                            delta.location_id,
                            posting.occurred_at,
                        )
                    });
                    e.insert(current)
                }
            };
            level.apply(delta, posting.occurred_at)?;
        }

        self.levels.extend(staged);
        self.movements.extend(posting.movements(tenant_id));
        Ok(())
    }

    /// Next number of a per-tenant sequence. Callers draw it only once the
    /// rest of the write has succeeded.
    fn next_number(&mut self, tenant_id: TenantId, sequence: &str) -> String {
        let value = self
            .sequences
            .entry((tenant_id, sequence.to_string()))
            .or_insert(0);
        *value += 1;
        document_number(sequence, *value)
    }

    fn ensure_zero_row(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        at: DateTime<Utc>,
    ) {
        self.levels
            .entry((tenant_id, item_id, location_id))
            .or_insert_with(|| InventoryLevel::empty(tenant_id, item_id, location_id, at));
    }

    fn check_order_version(&self, order: &PurchaseOrder) -> StoreResult<()> {
        let stored = self
            .purchase_orders
            .get(&(order.tenant_id, order.id))
            .ok_or_else(|| StoreError::NotFound(format!("purchase order {}", order.id)))?;
        if stored.version != order.version {
            return Err(StoreError::Conflict(format!(
                "purchase order {} was modified (expected version {}, found {})",
                order.order_number, order.version, stored.version
            )));
        }
        Ok(())
    }

    fn check_sales_version(&self, order: &SalesOrder) -> StoreResult<()> {
        let stored = self
            .sales_orders
            .get(&(order.tenant_id, order.id))
            .ok_or_else(|| StoreError::NotFound(format!("sales order {}", order.id)))?;
        if stored.version != order.version {
            return Err(StoreError::Conflict(format!(
                "sales order {} was modified (expected version {}, found {})",
                order.order_number, order.version, stored.version
            )));
        }
        Ok(())
    }
}

/// In-memory store for tests and local development.
///
/// All state sits behind one lock, so every composite commit is atomic with
/// respect to every other call.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn posting_tenant_check(tenant_id: TenantId, doc_tenant: TenantId, what: &str) -> StoreResult<()> {
    if tenant_id != doc_tenant {
        return Err(StoreError::TenantIsolation(format!(
            "{what} belongs to tenant {doc_tenant}, not {tenant_id}"
        )));
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        let mut state = self.write()?;
        let t = item.tenant_id;
        if state.items.contains_key(&(t, item.id)) {
            return Err(StoreError::Conflict(format!("item {} already exists", item.id)));
        }
        if state
            .items
            .values()
            .any(|i| i.tenant_id == t && i.sku == item.sku)
        {
            return Err(StoreError::Conflict(format!("sku '{}' already exists", item.sku)));
        }

        let locations: Vec<LocationId> = state
            .locations
            .keys()
            .filter(|(tenant, _)| *tenant == t)
            .map(|(_, id)| *id)
            .collect();
        for location_id in locations {
            state.ensure_zero_row(t, item.id, location_id, item.created_at);
        }
        state.items.insert((t, item.id), item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &Item) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.items.get_mut(&(item.tenant_id, item.id)) {
            Some(stored) => {
                *stored = item.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("item {}", item.id))),
        }
    }

    async fn get_item(&self, tenant_id: TenantId, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.get(&(tenant_id, id)).cloned())
    }

    async fn list_items(&self, tenant_id: TenantId) -> StoreResult<Vec<Item>> {
        let state = self.read()?;
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(items)
    }

    async fn insert_location(&self, location: &Location) -> StoreResult<()> {
        let mut state = self.write()?;
        let t = location.tenant_id;
        if state.locations.contains_key(&(t, location.id)) {
            return Err(StoreError::Conflict(format!(
                "location {} already exists",
                location.id
            )));
        }

        let item_ids: Vec<ItemId> = state
            .items
            .keys()
            .filter(|(tenant, _)| *tenant == t)
            .map(|(_, id)| *id)
            .collect();
        for item_id in item_ids {
            state.ensure_zero_row(t, item_id, location.id, location.created_at);
        }
        state.locations.insert((t, location.id), location.clone());
        Ok(())
    }

    async fn get_location(
        &self,
        tenant_id: TenantId,
        id: LocationId,
    ) -> StoreResult<Option<Location>> {
        Ok(self.read()?.locations.get(&(tenant_id, id)).cloned())
    }

    async fn list_locations(&self, tenant_id: TenantId) -> StoreResult<Vec<Location>> {
        let state = self.read()?;
        Ok(state
            .locations
            .values()
            .filter(|l| l.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PartyStore for InMemoryStore {
    async fn insert_party(&self, party: &Party) -> StoreResult<()> {
        let mut state = self.write()?;
        let key = (party.tenant_id, party.id);
        if state.parties.contains_key(&key) {
            return Err(StoreError::Conflict(format!("party {} already exists", party.id)));
        }
        state.parties.insert(key, party.clone());
        Ok(())
    }

    async fn update_party(&self, party: &Party) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.parties.get_mut(&(party.tenant_id, party.id)) {
            Some(stored) => {
                *stored = party.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("party {}", party.id))),
        }
    }

    async fn get_party(&self, tenant_id: TenantId, id: PartyId) -> StoreResult<Option<Party>> {
        Ok(self.read()?.parties.get(&(tenant_id, id)).cloned())
    }

    async fn list_parties(
        &self,
        tenant_id: TenantId,
        kind: Option<PartyKind>,
    ) -> StoreResult<Vec<Party>> {
        let state = self.read()?;
        Ok(state
            .parties
            .values()
            .filter(|p| p.tenant_id == tenant_id && kind.is_none_or(|k| k == p.kind))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn get_level(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
    ) -> StoreResult<Option<InventoryLevel>> {
        Ok(self
            .read()?
            .levels
            .get(&(tenant_id, item_id, location_id))
            .cloned())
    }

    async fn list_levels(
        &self,
        tenant_id: TenantId,
        filter: &LevelFilter,
    ) -> StoreResult<Vec<InventoryLevel>> {
        let state = self.read()?;
        Ok(state
            .levels
            .values()
            .filter(|l| l.tenant_id == tenant_id && filter.matches(l))
            .cloned()
            .collect())
    }

    async fn list_movements(
        &self,
        tenant_id: TenantId,
        filter: &MovementFilter,
    ) -> StoreResult<Vec<StockMovement>> {
        let state = self.read()?;
        Ok(state
            .movements
            .iter()
            .filter(|m| m.tenant_id == tenant_id && filter.matches(m))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PurchasingStore for InMemoryStore {
    async fn insert_purchase_order(
        &self,
        order: &PurchaseOrder,
        sequence: &str,
    ) -> StoreResult<PurchaseOrder> {
        let mut state = self.write()?;
        let key = (order.tenant_id, order.id);
        if state.purchase_orders.contains_key(&key) || order.version != 0 {
            return Err(StoreError::Conflict(format!(
                "purchase order {} already exists",
                order.id
            )));
        }
        let mut stored = order.clone();
        stored.order_number = state.next_number(order.tenant_id, sequence);
        stored.version = 1;
        state.purchase_orders.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_purchase_order(&self, order: &PurchaseOrder) -> StoreResult<u64> {
        let mut state = self.write()?;
        state.check_order_version(order)?;
        let mut stored = order.clone();
        stored.version = order.version + 1;
        let version = stored.version;
        state.purchase_orders.insert((order.tenant_id, order.id), stored);
        Ok(version)
    }

    async fn get_purchase_order(
        &self,
        tenant_id: TenantId,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        Ok(self.read()?.purchase_orders.get(&(tenant_id, id)).cloned())
    }

    async fn list_purchase_orders(
        &self,
        tenant_id: TenantId,
        status: Option<PurchaseOrderStatus>,
    ) -> StoreResult<Vec<PurchaseOrder>> {
        let state = self.read()?;
        Ok(state
            .purchase_orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && status.is_none_or(|s| s == o.status))
            .cloned()
            .collect())
    }

    async fn commit_receipt(&self, plan: &ReceiptPlan) -> StoreResult<u64> {
        let tenant_id = plan.order.tenant_id;
        posting_tenant_check(tenant_id, plan.receipt.tenant_id, "goods receipt")?;

        let mut state = self.write()?;
        state.check_order_version(&plan.order)?;
        state.apply_posting(tenant_id, &plan.posting)?;

        let mut order = plan.order.clone();
        order.version += 1;
        let version = order.version;
        state.purchase_orders.insert((tenant_id, order.id), order);
        state.receipts.push(plan.receipt.clone());
        Ok(version)
    }

    async fn list_receipts(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<GoodsReceipt>> {
        let state = self.read()?;
        Ok(state
            .receipts
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.purchase_order_id == order_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StockDocumentStore for InMemoryStore {
    async fn commit_transfer(
        &self,
        transfer: &Transfer,
        posting: &LedgerPosting,
        sequence: &str,
    ) -> StoreResult<Transfer> {
        let mut state = self.write()?;
        let key = (transfer.tenant_id, transfer.id);
        if state.transfers.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "transfer {} already exists",
                transfer.id
            )));
        }
        state.apply_posting(transfer.tenant_id, posting)?;
        let mut stored = transfer.clone();
        stored.transfer_number = state.next_number(transfer.tenant_id, sequence);
        state.transfers.insert(key, stored.clone());
        Ok(stored)
    }

    async fn commit_adjustment(
        &self,
        adjustment: &Adjustment,
        posting: &LedgerPosting,
        sequence: &str,
    ) -> StoreResult<Adjustment> {
        let mut state = self.write()?;
        let key = (adjustment.tenant_id, adjustment.id);
        if state.adjustments.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "adjustment {} already exists",
                adjustment.id
            )));
        }
        state.apply_posting(adjustment.tenant_id, posting)?;
        let mut stored = adjustment.clone();
        stored.adjustment_number = state.next_number(adjustment.tenant_id, sequence);
        state.adjustments.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get_transfer(
        &self,
        tenant_id: TenantId,
        id: TransferId,
    ) -> StoreResult<Option<Transfer>> {
        Ok(self.read()?.transfers.get(&(tenant_id, id)).cloned())
    }

    async fn get_adjustment(
        &self,
        tenant_id: TenantId,
        id: AdjustmentId,
    ) -> StoreResult<Option<Adjustment>> {
        Ok(self.read()?.adjustments.get(&(tenant_id, id)).cloned())
    }
}

#[async_trait]
impl SalesStore for InMemoryStore {
    async fn insert_sales_order(
        &self,
        order: &SalesOrder,
        sequence: &str,
        posting: Option<&LedgerPosting>,
    ) -> StoreResult<SalesOrder> {
        let mut state = self.write()?;
        let key = (order.tenant_id, order.id);
        if state.sales_orders.contains_key(&key) || order.version != 0 {
            return Err(StoreError::Conflict(format!(
                "sales order {} already exists",
                order.id
            )));
        }
        if let Some(posting) = posting {
            state.apply_posting(order.tenant_id, posting)?;
        }
        let mut stored = order.clone();
        stored.order_number = state.next_number(order.tenant_id, sequence);
        stored.version = 1;
        state.sales_orders.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_sales_order(
        &self,
        order: &SalesOrder,
        posting: Option<&LedgerPosting>,
    ) -> StoreResult<u64> {
        let mut state = self.write()?;
        state.check_sales_version(order)?;
        if let Some(posting) = posting {
            state.apply_posting(order.tenant_id, posting)?;
        }
        let mut stored = order.clone();
        stored.version = order.version + 1;
        let version = stored.version;
        state.sales_orders.insert((order.tenant_id, order.id), stored);
        Ok(version)
    }

    async fn get_sales_order(
        &self,
        tenant_id: TenantId,
        id: SalesOrderId,
    ) -> StoreResult<Option<SalesOrder>> {
        Ok(self.read()?.sales_orders.get(&(tenant_id, id)).cloned())
    }

    async fn list_sales_orders(
        &self,
        tenant_id: TenantId,
        filter: &SalesOrderFilter,
    ) -> StoreResult<Vec<SalesOrder>> {
        let state = self.read()?;
        Ok(state
            .sales_orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && filter.matches(o))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockroom_catalog::{LocationType, NewItem, NewLocation};
    use stockroom_inventory::{
        AdjustmentLineRequest, AdjustmentType, CreateAdjustmentRequest, DocumentRef, DocumentType,
        LedgerDelta,
    };

    fn item(tenant_id: TenantId, sku: &str) -> Item {
        Item::create(
            tenant_id,
            ItemId::generate(),
            NewItem {
                sku: sku.to_string(),
                name: format!("Item {sku}"),
                description: None,
                category: None,
                unit: None,
                cost_price: dec!(1.00),
                selling_price: dec!(2.00),
                min_stock_level: 0,
                max_stock_level: None,
                is_serial_tracked: false,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn location(tenant_id: TenantId, name: &str) -> Location {
        Location::create(
            tenant_id,
            LocationId::generate(),
            NewLocation {
                name: name.to_string(),
                location_type: LocationType::Warehouse,
                address: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn posting(deltas: Vec<LedgerDelta>) -> LedgerPosting {
        LedgerPosting::new(
            DocumentRef::new(DocumentType::Adjustment, stockroom_core::AggregateId::new()),
            None,
            Utc::now(),
        )
        .with_deltas(deltas)
    }

    #[tokio::test]
    async fn creating_items_and_locations_seeds_zero_rows() {
        let store = InMemoryStore::new();
        let t = TenantId::new();
        let a = location(t, "A");
        store.insert_location(&a).await.unwrap();
        let widget = item(t, "W-1");
        store.insert_item(&widget).await.unwrap();
        let b = location(t, "B");
        store.insert_location(&b).await.unwrap();

        let rows = store.list_levels(t, &LevelFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.quantity == 0 && r.reserved_quantity == 0));
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict_within_a_tenant_only() {
        let store = InMemoryStore::new();
        let t = TenantId::new();
        store.insert_item(&item(t, "DUP")).await.unwrap();

        let err = store.insert_item(&item(t, "DUP")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.insert_item(&item(TenantId::new(), "DUP")).await.unwrap();
    }

    #[tokio::test]
    async fn failing_delta_rolls_back_the_whole_posting() {
        let store = InMemoryStore::new();
        let t = TenantId::new();
        let (a, b) = (location(t, "A"), location(t, "B"));
        let widget = item(t, "W-1");
        store.insert_location(&a).await.unwrap();
        store.insert_location(&b).await.unwrap();
        store.insert_item(&widget).await.unwrap();

        {
            let mut state = store.write().unwrap();
            state
                .apply_posting(t, &posting(vec![LedgerDelta::receipt(widget.id, a.id, 3).unwrap()]))
                .unwrap();
        }

        let bad = posting(vec![
            LedgerDelta::receipt(widget.id, b.id, 5).unwrap(),
            LedgerDelta::adjustment(widget.id, a.id, -4).unwrap(),
        ]);
        let err = store.write().unwrap().apply_posting(t, &bad).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { requested: 4, available: 3, .. }
        ));

        let b_row = store.get_level(t, widget.id, b.id).await.unwrap().unwrap();
        assert_eq!(b_row.quantity, 0);
        let movements = store.list_movements(t, &MovementFilter::default()).await.unwrap();
        assert_eq!(movements.len(), 1);
    }

    #[tokio::test]
    async fn tenants_never_see_each_others_rows() {
        let store = InMemoryStore::new();
        let (t1, t2) = (TenantId::new(), TenantId::new());
        let widget = item(t1, "W-1");
        store.insert_item(&widget).await.unwrap();

        assert!(store.get_item(t2, widget.id).await.unwrap().is_none());
        assert!(store.list_items(t2).await.unwrap().is_empty());
    }

    fn correction(
        tenant_id: TenantId,
        location_id: LocationId,
        item_id: ItemId,
        delta: i64,
    ) -> (Adjustment, LedgerPosting) {
        Adjustment::plan(
            tenant_id,
            AdjustmentId::generate(),
            String::new(),
            CreateAdjustmentRequest::single(
                location_id,
                item_id,
                AdjustmentType::Correction,
                delta,
                "correction",
            ),
            |_| 0,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    fn count(
        tenant_id: TenantId,
        location_id: LocationId,
        item_id: ItemId,
        counted: i64,
        on_hand_seen: i64,
    ) -> (Adjustment, LedgerPosting) {
        Adjustment::plan(
            tenant_id,
            AdjustmentId::generate(),
            String::new(),
            CreateAdjustmentRequest {
                location_id,
                adjustment_type: AdjustmentType::StockCount,
                reason: "cycle count".into(),
                lines: vec![AdjustmentLineRequest {
                    item_id,
                    quantity_delta: None,
                    counted_quantity: Some(counted),
                }],
            },
            |_| on_hand_seen,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn numbers_are_drawn_per_tenant_and_only_for_stored_documents() {
        let store = InMemoryStore::new();
        let (t1, t2) = (TenantId::new(), TenantId::new());
        let (loc, widget) = (LocationId::generate(), ItemId::generate());

        let (adj, posting) = correction(t1, loc, widget, 5);
        let stored = store.commit_adjustment(&adj, &posting, "ADJ").await.unwrap();
        assert_eq!(stored.adjustment_number, "ADJ-000001");

        let (adj, posting) = correction(t1, loc, widget, -9);
        let err = store.commit_adjustment(&adj, &posting, "ADJ").await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { .. }));
        assert!(store.get_adjustment(t1, adj.id).await.unwrap().is_none());

        let (adj, posting) = correction(t1, loc, widget, -2);
        store.commit_adjustment(&adj, &posting, "ADJ").await.unwrap();
        let stored = store.get_adjustment(t1, adj.id).await.unwrap().unwrap();
        assert_eq!(stored.adjustment_number, "ADJ-000002");

        let (adj, posting) = correction(t2, loc, widget, 1);
        let stored = store.commit_adjustment(&adj, &posting, "ADJ").await.unwrap();
        assert_eq!(stored.adjustment_number, "ADJ-000001");
    }

    #[tokio::test]
    async fn stock_count_is_rejected_once_the_row_has_moved() {
        let store = InMemoryStore::new();
        let t = TenantId::new();
        let (loc, widget) = (LocationId::generate(), ItemId::generate());
        let (adj, posting) = correction(t, loc, widget, 10);
        store.commit_adjustment(&adj, &posting, "ADJ").await.unwrap();

        // Counted 8 against the 10 on hand, then 3 leave before it commits.
        let (stale, stale_posting) = count(t, loc, widget, 8, 10);
        let (adj, posting) = correction(t, loc, widget, -3);
        store.commit_adjustment(&adj, &posting, "ADJ").await.unwrap();

        let err = store
            .commit_adjustment(&stale, &stale_posting, "ADJ")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let row = store.get_level(t, widget, loc).await.unwrap().unwrap();
        assert_eq!(row.quantity, 7);

        // Recounting against the current row applies.
        let (fresh, fresh_posting) = count(t, loc, widget, 8, 7);
        let stored = store
            .commit_adjustment(&fresh, &fresh_posting, "ADJ")
            .await
            .unwrap();
        assert_eq!(stored.adjustment_number, "ADJ-000003");
        let row = store.get_level(t, widget, loc).await.unwrap().unwrap();
        assert_eq!(row.quantity, 8);
    }
}
