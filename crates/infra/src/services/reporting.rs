use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use stockroom_catalog::{Item, ItemId, LocationId};
use stockroom_core::DomainError;
use stockroom_inventory::{InventoryLevel, MovementKind, NetAdjustment};

use super::{Caller, ServiceResult, Services};
use crate::reports::{self, InventoryValuation, LowStockLine, SalesSummary};
use crate::store::{
    CatalogStore, LedgerStore, LevelFilter, MovementFilter, SalesOrderFilter, SalesStore,
};

/// Filter for the net adjustment report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdjustmentReportFilter {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl Services {
    /// Sales over `[from, to)`.
    #[instrument(skip(self), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn sales_summary(
        &self,
        caller: Caller,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ServiceResult<SalesSummary> {
        if from >= to {
            return Err(DomainError::validation("report period is empty").into());
        }
        let filter = SalesOrderFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };
        let orders = self
            .retry
            .run("list_sales_orders", || {
                self.store.list_sales_orders(caller.tenant_id, &filter)
            })
            .await?;
        Ok(reports::sales_summary(&orders, from, to))
    }

    #[instrument(skip(self), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn net_adjustment(
        &self,
        caller: Caller,
        filter: AdjustmentReportFilter,
    ) -> ServiceResult<NetAdjustment> {
        let filter = MovementFilter {
            item_id: filter.item_id,
            location_id: filter.location_id,
            kind: Some(MovementKind::Adjustment),
            from: filter.from,
            to: filter.to,
        };
        let movements = self
            .retry
            .run("list_movements", || {
                self.store.list_movements(caller.tenant_id, &filter)
            })
            .await?;
        Ok(reports::net_adjustment(&movements))
    }

    pub async fn low_stock_report(&self, caller: Caller) -> ServiceResult<Vec<LowStockLine>> {
        let (items, levels) = self.items_and_levels(caller).await?;
        Ok(reports::low_stock(&items, &levels))
    }

    pub async fn inventory_valuation(&self, caller: Caller) -> ServiceResult<InventoryValuation> {
        let (items, levels) = self.items_and_levels(caller).await?;
        Ok(reports::inventory_valuation(&items, &levels))
    }

    async fn items_and_levels(
        &self,
        caller: Caller,
    ) -> ServiceResult<(Vec<Item>, Vec<InventoryLevel>)> {
        let tenant_id = caller.tenant_id;
        let filter = LevelFilter::default();
        let items = self
            .retry
            .run("list_items", || self.store.list_items(tenant_id))
            .await?;
        let levels = self
            .retry
            .run("list_levels", || self.store.list_levels(tenant_id, &filter))
            .await?;
        Ok((items, levels))
    }
}
