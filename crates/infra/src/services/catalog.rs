use tracing::{info, instrument};

use stockroom_catalog::{
    CatalogEvent, Item, ItemId, ItemUpdate, Location, LocationId, NewItem, NewLocation,
};

use super::{Caller, ServiceResult, Services};
use crate::store::CatalogStore;

const ITEM: &str = "catalog.item";
const LOCATION: &str = "catalog.location";

impl Services {
    /// Register an item. Every existing location gets a zero ledger row.
    #[instrument(skip(self, input), fields(tenant_id = %caller.tenant_id, sku = %input.sku), err)]
    pub async fn create_item(&self, caller: Caller, input: NewItem) -> ServiceResult<Item> {
        let now = self.now();
        let item = Item::create(caller.tenant_id, ItemId::generate(), input, now)?;

        self.retry
            .run("insert_item", || self.store.insert_item(&item))
            .await?;

        info!(item_id = %item.id, "item created");
        self.publish(
            caller.tenant_id,
            item.id.aggregate_id(),
            ITEM,
            &CatalogEvent::ItemCreated {
                tenant_id: caller.tenant_id,
                item_id: item.id,
                sku: item.sku.clone(),
                occurred_at: now,
            },
        );
        Ok(item)
    }

    #[instrument(skip(self, update), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn update_item(
        &self,
        caller: Caller,
        id: ItemId,
        update: ItemUpdate,
    ) -> ServiceResult<Item> {
        let now = self.now();
        let mut item = self.load_item(caller.tenant_id, id).await?;
        item.apply_update(update, now)?;

        self.retry
            .run("update_item", || self.store.update_item(&item))
            .await?;

        self.publish(
            caller.tenant_id,
            item.id.aggregate_id(),
            ITEM,
            &CatalogEvent::ItemUpdated {
                tenant_id: caller.tenant_id,
                item_id: item.id,
                occurred_at: now,
            },
        );
        Ok(item)
    }

    pub async fn get_item(&self, caller: Caller, id: ItemId) -> ServiceResult<Item> {
        self.load_item(caller.tenant_id, id).await
    }

    pub async fn list_items(&self, caller: Caller) -> ServiceResult<Vec<Item>> {
        Ok(self
            .retry
            .run("list_items", || self.store.list_items(caller.tenant_id))
            .await?)
    }

    /// Register a location. Every existing item gets a zero ledger row there.
    #[instrument(skip(self, input), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn create_location(
        &self,
        caller: Caller,
        input: NewLocation,
    ) -> ServiceResult<Location> {
        let now = self.now();
        let location = Location::create(caller.tenant_id, LocationId::generate(), input, now)?;

        self.retry
            .run("insert_location", || self.store.insert_location(&location))
            .await?;

        info!(location_id = %location.id, "location created");
        self.publish(
            caller.tenant_id,
            location.id.aggregate_id(),
            LOCATION,
            &CatalogEvent::LocationCreated {
                tenant_id: caller.tenant_id,
                location_id: location.id,
                location_type: location.location_type,
                occurred_at: now,
            },
        );
        Ok(location)
    }

    pub async fn get_location(&self, caller: Caller, id: LocationId) -> ServiceResult<Location> {
        self.load_location(caller.tenant_id, id).await
    }

    pub async fn list_locations(&self, caller: Caller) -> ServiceResult<Vec<Location>> {
        Ok(self
            .retry
            .run("list_locations", || self.store.list_locations(caller.tenant_id))
            .await?)
    }
}
