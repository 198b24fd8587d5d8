use std::collections::HashMap;

use tracing::{info, instrument};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::{DomainError, TenantId};
use stockroom_inventory::{
    Adjustment, AdjustmentId, CreateAdjustmentRequest, CreateTransferRequest, InventoryLevel,
    StockEvent, StockMovement, Transfer, TransferId,
};

use super::{Caller, ServiceResult, Services, sequences};
use crate::store::{LedgerStore, LevelFilter, MovementFilter, StockDocumentStore};

const TRANSFER: &str = "inventory.transfer";
const ADJUSTMENT: &str = "inventory.adjustment";

impl Services {
    /// Move stock between two locations of the tenant.
    ///
    /// Commits the transfer document, `-q` at the source and `+q` at the
    /// destination for every line, or nothing.
    #[instrument(
        skip(self, request),
        fields(
            tenant_id = %caller.tenant_id,
            from = %request.from_location_id,
            to = %request.to_location_id
        ),
        err
    )]
    pub async fn create_transfer(
        &self,
        caller: Caller,
        request: CreateTransferRequest,
    ) -> ServiceResult<Transfer> {
        let tenant_id = caller.tenant_id;
        if request.from_location_id == request.to_location_id {
            return Err(DomainError::SameLocation.into());
        }
        self.load_location(tenant_id, request.from_location_id).await?;
        self.load_location(tenant_id, request.to_location_id).await?;
        for line in &request.lines {
            self.load_item(tenant_id, line.item_id).await?;
        }

        let (planned, posting) = Transfer::plan(
            tenant_id,
            TransferId::generate(),
            String::new(),
            request,
            caller.user_id,
            self.now(),
        )?;

        let transfer = self
            .retry
            .run("commit_transfer", || {
                self.store
                    .commit_transfer(&planned, &posting, sequences::TRANSFER)
            })
            .await?;

        info!(
            transfer_id = %transfer.id,
            transfer_number = %transfer.transfer_number,
            units = transfer.total_quantity(),
            "stock transferred"
        );
        self.publish(
            tenant_id,
            transfer.id.aggregate_id(),
            TRANSFER,
            &StockEvent::transferred(&transfer),
        );
        self.detect_low_stock(tenant_id, &posting).await;
        Ok(transfer)
    }

    /// Correct on-hand stock at one location.
    ///
    /// Counted lines are resolved against the current ledger rows before
    /// planning. The commit rejects a counted line whose row moved since it
    /// was read (`Conflict`) and any line that would take on-hand below
    /// zero.
    #[instrument(
        skip(self, request),
        fields(tenant_id = %caller.tenant_id, location_id = %request.location_id),
        err
    )]
    pub async fn create_adjustment(
        &self,
        caller: Caller,
        request: CreateAdjustmentRequest,
    ) -> ServiceResult<Adjustment> {
        let tenant_id = caller.tenant_id;
        self.load_location(tenant_id, request.location_id).await?;
        for line in &request.lines {
            self.load_item(tenant_id, line.item_id).await?;
        }

        let current: HashMap<ItemId, i64> = if request.needs_current_quantities() {
            let filter = LevelFilter {
                item_id: None,
                location_id: Some(request.location_id),
            };
            self.retry
                .run("list_levels", || self.store.list_levels(tenant_id, &filter))
                .await?
                .into_iter()
                .map(|level| (level.item_id, level.quantity))
                .collect()
        } else {
            HashMap::new()
        };

        let (planned, posting) = Adjustment::plan(
            tenant_id,
            AdjustmentId::generate(),
            String::new(),
            request,
            |item_id| current.get(&item_id).copied().unwrap_or(0),
            caller.user_id,
            self.now(),
        )?;

        let adjustment = self
            .retry
            .run("commit_adjustment", || {
                self.store
                    .commit_adjustment(&planned, &posting, sequences::ADJUSTMENT)
            })
            .await?;

        let net = adjustment.net();
        info!(
            adjustment_id = %adjustment.id,
            adjustment_number = %adjustment.adjustment_number,
            net = net.net,
            "stock adjusted"
        );
        self.publish(
            tenant_id,
            adjustment.id.aggregate_id(),
            ADJUSTMENT,
            &StockEvent::adjusted(&adjustment),
        );
        self.detect_low_stock(tenant_id, &posting).await;
        Ok(adjustment)
    }

    /// The ledger row for `(item, location)`. Both must exist.
    pub async fn get_level(
        &self,
        caller: Caller,
        item_id: ItemId,
        location_id: LocationId,
    ) -> ServiceResult<InventoryLevel> {
        let tenant_id = caller.tenant_id;
        let level = self
            .retry
            .run("get_level", || {
                self.store.get_level(tenant_id, item_id, location_id)
            })
            .await?;
        match level {
            Some(level) => Ok(level),
            None => self.empty_level(tenant_id, item_id, location_id).await,
        }
    }

    /// `quantity - reserved_quantity` at one location.
    pub async fn available_quantity(
        &self,
        caller: Caller,
        item_id: ItemId,
        location_id: LocationId,
    ) -> ServiceResult<i64> {
        Ok(self.get_level(caller, item_id, location_id).await?.available())
    }

    /// On-hand total of an item across every location.
    pub async fn total_on_hand(&self, caller: Caller, item_id: ItemId) -> ServiceResult<i64> {
        self.load_item(caller.tenant_id, item_id).await?;
        self.on_hand_total(caller.tenant_id, item_id).await
    }

    pub async fn list_levels(
        &self,
        caller: Caller,
        filter: LevelFilter,
    ) -> ServiceResult<Vec<InventoryLevel>> {
        Ok(self
            .retry
            .run("list_levels", || self.store.list_levels(caller.tenant_id, &filter))
            .await?)
    }

    pub async fn list_movements(
        &self,
        caller: Caller,
        filter: MovementFilter,
    ) -> ServiceResult<Vec<StockMovement>> {
        Ok(self
            .retry
            .run("list_movements", || {
                self.store.list_movements(caller.tenant_id, &filter)
            })
            .await?)
    }

    pub async fn get_transfer(&self, caller: Caller, id: TransferId) -> ServiceResult<Transfer> {
        self.retry
            .run("get_transfer", || self.store.get_transfer(caller.tenant_id, id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("transfer {id}")).into())
    }

    pub async fn get_adjustment(
        &self,
        caller: Caller,
        id: AdjustmentId,
    ) -> ServiceResult<Adjustment> {
        self.retry
            .run("get_adjustment", || {
                self.store.get_adjustment(caller.tenant_id, id)
            })
            .await?
            .ok_or_else(|| DomainError::not_found(format!("adjustment {id}")).into())
    }

    /// Rows are seeded when items and locations are created, so a missing
    /// row for an existing pair reads as zero.
    async fn empty_level(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
    ) -> ServiceResult<InventoryLevel> {
        self.load_item(tenant_id, item_id).await?;
        self.load_location(tenant_id, location_id).await?;
        Ok(InventoryLevel::empty(tenant_id, item_id, location_id, self.now()))
    }
}
