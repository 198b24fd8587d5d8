use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use stockroom_core::{DomainError, DomainResult, TenantId};
use stockroom_parties::PartyKind;
use stockroom_purchasing::{
    CreatePurchaseOrderRequest, GoodsReceipt, GoodsReceiptId, PurchaseLineRequest,
    PurchaseOrder, PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus, ReceiveGoodsRequest,
    plan_receipt,
};

use super::{Caller, ServiceResult, Services, sequences};
use crate::store::PurchasingStore;

const PURCHASE_ORDER: &str = "purchasing.purchase_order";

/// Result of a goods receipt: the stored receipt and the order after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptOutcome {
    pub receipt: GoodsReceipt,
    pub order: PurchaseOrder,
}

impl Services {
    /// Create a DRAFT purchase order.
    ///
    /// The supplier must be an active supplier; the location and every item
    /// must exist, and items must be active.
    #[instrument(skip(self, request), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn create_purchase_order(
        &self,
        caller: Caller,
        request: CreatePurchaseOrderRequest,
    ) -> ServiceResult<PurchaseOrder> {
        let tenant_id = caller.tenant_id;
        if request.lines.is_empty() {
            return Err(
                DomainError::validation("purchase order must have at least one line").into(),
            );
        }
        self.load_counterparty(tenant_id, request.supplier_id, PartyKind::Supplier)
            .await?;
        self.load_location(tenant_id, request.location_id).await?;
        for line in &request.lines {
            self.load_tradable_item(tenant_id, line.item_id).await?;
        }

        let planned = PurchaseOrder::create(
            tenant_id,
            PurchaseOrderId::generate(),
            String::new(),
            request,
            caller.user_id,
            self.now(),
        )?;

        let order = self
            .retry
            .run("insert_purchase_order", || {
                self.store
                    .insert_purchase_order(&planned, sequences::PURCHASE_ORDER)
            })
            .await?;

        info!(order_id = %order.id, order_number = %order.order_number, "purchase order created");
        self.publish(
            tenant_id,
            order.id.aggregate_id(),
            PURCHASE_ORDER,
            &PurchaseOrderEvent::created(&order),
        );
        Ok(order)
    }

    #[instrument(skip(self, line), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn add_purchase_order_line(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
        line: PurchaseLineRequest,
    ) -> ServiceResult<PurchaseOrder> {
        let mut order = self.load_purchase_order(caller.tenant_id, id).await?;
        self.load_tradable_item(caller.tenant_id, line.item_id).await?;
        order.add_line(line, self.now())?;
        self.save_purchase_order(&mut order).await?;
        Ok(order)
    }

    pub async fn submit_purchase_order(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        self.transition_purchase_order(caller, id, PurchaseOrder::submit)
            .await
    }

    pub async fn approve_purchase_order(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        self.transition_purchase_order(caller, id, PurchaseOrder::approve)
            .await
    }

    pub async fn cancel_purchase_order(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        self.transition_purchase_order(caller, id, PurchaseOrder::cancel)
            .await
    }

    pub async fn close_purchase_order(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        self.transition_purchase_order(caller, id, PurchaseOrder::close)
            .await
    }

    #[instrument(skip(self, apply), fields(tenant_id = %caller.tenant_id), err)]
    async fn transition_purchase_order(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
        apply: fn(&mut PurchaseOrder, DateTime<Utc>) -> DomainResult<()>,
    ) -> ServiceResult<PurchaseOrder> {
        let mut order = self.load_purchase_order(caller.tenant_id, id).await?;
        apply(&mut order, self.now())?;
        self.save_purchase_order(&mut order).await?;

        info!(order_id = %order.id, status = order.status.as_str(), "purchase order status changed");
        self.publish(
            caller.tenant_id,
            order.id.aggregate_id(),
            PURCHASE_ORDER,
            &PurchaseOrderEvent::status_changed(&order),
        );
        Ok(order)
    }

    /// Hand an approved order to the supplier. The order itself is unchanged;
    /// the published event drives the outbound notification.
    #[instrument(skip(self), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn send_purchase_order(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        let order = self.load_purchase_order(caller.tenant_id, id).await?;
        order.ensure_sendable()?;
        self.load_party(caller.tenant_id, order.supplier_id).await?;

        self.publish(
            caller.tenant_id,
            order.id.aggregate_id(),
            PURCHASE_ORDER,
            &PurchaseOrderEvent::sent(&order, self.now()),
        );
        Ok(order)
    }

    /// Receive goods against a purchase order.
    ///
    /// The receipt, the order's received quantities and status, and the
    /// RECEIPT ledger movements are committed together. Any invalid line
    /// (over-receipt included) rejects the whole receipt.
    #[instrument(
        skip(self, request),
        fields(tenant_id = %caller.tenant_id, order_id = %request.purchase_order_id),
        err
    )]
    pub async fn receive_goods(
        &self,
        caller: Caller,
        mut request: ReceiveGoodsRequest,
    ) -> ServiceResult<ReceiptOutcome> {
        let tenant_id = caller.tenant_id;
        let order = self
            .load_purchase_order(tenant_id, request.purchase_order_id)
            .await?;
        self.load_location(tenant_id, request.location_id).await?;
        if request.received_by_id.is_none() {
            request.received_by_id = caller.user_id;
        }

        let mut plan = plan_receipt(&order, request, GoodsReceiptId::generate(), self.now())?;
        let version = self
            .retry
            .run("commit_receipt", || self.store.commit_receipt(&plan))
            .await?;
        plan.order.version = version;

        info!(
            receipt_id = %plan.receipt.id,
            units = plan.receipt.total_quantity(),
            status = plan.order.status.as_str(),
            "goods received"
        );
        self.publish(
            tenant_id,
            plan.order.id.aggregate_id(),
            PURCHASE_ORDER,
            &PurchaseOrderEvent::goods_received(&plan.receipt, &plan.order),
        );
        if plan.order.status != order.status {
            self.publish(
                tenant_id,
                plan.order.id.aggregate_id(),
                PURCHASE_ORDER,
                &PurchaseOrderEvent::status_changed(&plan.order),
            );
        }

        Ok(ReceiptOutcome {
            receipt: plan.receipt,
            order: plan.order,
        })
    }

    pub async fn get_purchase_order(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        self.load_purchase_order(caller.tenant_id, id).await
    }

    pub async fn list_purchase_orders(
        &self,
        caller: Caller,
        status: Option<PurchaseOrderStatus>,
    ) -> ServiceResult<Vec<PurchaseOrder>> {
        Ok(self
            .retry
            .run("list_purchase_orders", || {
                self.store.list_purchase_orders(caller.tenant_id, status)
            })
            .await?)
    }

    pub async fn list_receipts(
        &self,
        caller: Caller,
        id: PurchaseOrderId,
    ) -> ServiceResult<Vec<GoodsReceipt>> {
        self.load_purchase_order(caller.tenant_id, id).await?;
        Ok(self
            .retry
            .run("list_receipts", || self.store.list_receipts(caller.tenant_id, id))
            .await?)
    }

    async fn load_purchase_order(
        &self,
        tenant_id: TenantId,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        self.retry
            .run("get_purchase_order", || {
                self.store.get_purchase_order(tenant_id, id)
            })
            .await?
            .ok_or_else(|| DomainError::not_found(format!("purchase order {id}")).into())
    }

    async fn save_purchase_order(&self, order: &mut PurchaseOrder) -> ServiceResult<()> {
        let version = self
            .retry
            .run("update_purchase_order", || {
                self.store.update_purchase_order(order)
            })
            .await?;
        order.version = version;
        Ok(())
    }
}
