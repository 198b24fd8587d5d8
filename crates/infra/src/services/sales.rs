use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use stockroom_core::{DomainError, DomainResult, TenantId};
use stockroom_inventory::LedgerDelta;
use stockroom_parties::PartyKind;
use stockroom_sales::{
    CreateSalesOrderRequest, PaymentMethod, SalesOrder, SalesOrderEvent, SalesOrderId,
};

use super::{Caller, ServiceResult, Services, sequences};
use crate::store::{SalesOrderFilter, SalesStore};

const SALES_ORDER: &str = "sales.sales_order";

impl Services {
    /// Create a STANDARD order as a DRAFT. No stock is touched until it is
    /// confirmed.
    #[instrument(skip(self, request), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn create_sales_order(
        &self,
        caller: Caller,
        request: CreateSalesOrderRequest,
    ) -> ServiceResult<SalesOrder> {
        let tenant_id = caller.tenant_id;
        self.check_sales_references(tenant_id, &request).await?;

        let planned = SalesOrder::create(
            tenant_id,
            SalesOrderId::generate(),
            String::new(),
            request,
            caller.user_id,
            self.now(),
        )?;

        let order = self
            .retry
            .run("insert_sales_order", || {
                self.store
                    .insert_sales_order(&planned, sequences::SALES_ORDER, None)
            })
            .await?;

        info!(order_id = %order.id, order_number = %order.order_number, "sales order created");
        self.publish(
            tenant_id,
            order.id.aggregate_id(),
            SALES_ORDER,
            &SalesOrderEvent::created(&order),
        );
        Ok(order)
    }

    /// Point-of-sale checkout: the completed, paid order and the SALE
    /// movements are committed together. Any line short on available stock
    /// rejects the whole sale.
    #[instrument(skip(self, request), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn checkout(
        &self,
        caller: Caller,
        request: CreateSalesOrderRequest,
    ) -> ServiceResult<SalesOrder> {
        let tenant_id = caller.tenant_id;
        self.check_sales_references(tenant_id, &request).await?;

        let (planned, posting) = SalesOrder::checkout(
            tenant_id,
            SalesOrderId::generate(),
            String::new(),
            request,
            caller.user_id,
            self.now(),
        )?;

        let order = self
            .retry
            .run("insert_sales_order", || {
                self.store
                    .insert_sales_order(&planned, sequences::POS_SALE, Some(&posting))
            })
            .await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "pos sale completed"
        );
        self.publish(
            tenant_id,
            order.id.aggregate_id(),
            SALES_ORDER,
            &SalesOrderEvent::created(&order),
        );
        self.detect_low_stock(tenant_id, &posting).await;
        Ok(order)
    }

    /// DRAFT → CONFIRMED, reserving every line at the order's location.
    pub async fn confirm_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(caller, id, SalesOrder::confirm)
            .await
    }

    pub async fn start_processing_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(caller, id, |order, now| {
            order.start_processing(now).map(|()| Vec::new())
        })
        .await
    }

    /// Ship, converting the reservation into an on-hand decrease.
    pub async fn ship_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(caller, id, SalesOrder::ship)
            .await
    }

    pub async fn deliver_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(caller, id, |order, now| {
            order.deliver(now).map(|()| Vec::new())
        })
        .await
    }

    pub async fn complete_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(caller, id, |order, now| {
            order.complete(now).map(|()| Vec::new())
        })
        .await
    }

    /// Cancel before shipping; a held reservation is released.
    pub async fn cancel_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(caller, id, SalesOrder::cancel)
            .await
    }

    /// Take back a delivered or completed order; quantities go back on hand.
    pub async fn return_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(caller, id, SalesOrder::mark_returned)
            .await
    }

    #[instrument(skip(self, apply), fields(tenant_id = %caller.tenant_id), err)]
    async fn transition_sales_order<F>(
        &self,
        caller: Caller,
        id: SalesOrderId,
        apply: F,
    ) -> ServiceResult<SalesOrder>
    where
        F: FnOnce(&mut SalesOrder, DateTime<Utc>) -> DomainResult<Vec<LedgerDelta>> + Send,
    {
        let tenant_id = caller.tenant_id;
        let now = self.now();
        let mut order = self.load_sales_order(tenant_id, id).await?;
        let deltas = apply(&mut order, now)?;
        let posting = (!deltas.is_empty()).then(|| order.posting(deltas, caller.user_id, now));

        order.version = self
            .retry
            .run("update_sales_order", || {
                self.store.update_sales_order(&order, posting.as_ref())
            })
            .await?;

        info!(order_id = %order.id, status = order.status.as_str(), "sales order status changed");
        self.publish(
            tenant_id,
            order.id.aggregate_id(),
            SALES_ORDER,
            &SalesOrderEvent::status_changed(&order),
        );
        if let Some(posting) = &posting {
            self.detect_low_stock(tenant_id, posting).await;
        }
        Ok(order)
    }

    #[instrument(skip(self), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn record_payment(
        &self,
        caller: Caller,
        id: SalesOrderId,
        amount: Decimal,
        method: Option<PaymentMethod>,
    ) -> ServiceResult<SalesOrder> {
        let tenant_id = caller.tenant_id;
        let mut order = self.load_sales_order(tenant_id, id).await?;
        order.record_payment(amount, method, self.now())?;

        order.version = self
            .retry
            .run("update_sales_order", || {
                self.store.update_sales_order(&order, None)
            })
            .await?;

        info!(
            order_id = %order.id,
            amount = %amount,
            payment_status = order.payment_status.as_str(),
            "payment recorded"
        );
        self.publish(
            tenant_id,
            order.id.aggregate_id(),
            SALES_ORDER,
            &SalesOrderEvent::payment_recorded(&order, amount),
        );
        Ok(order)
    }

    pub async fn get_sales_order(
        &self,
        caller: Caller,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.load_sales_order(caller.tenant_id, id).await
    }

    pub async fn list_sales_orders(
        &self,
        caller: Caller,
        filter: SalesOrderFilter,
    ) -> ServiceResult<Vec<SalesOrder>> {
        Ok(self
            .retry
            .run("list_sales_orders", || {
                self.store.list_sales_orders(caller.tenant_id, &filter)
            })
            .await?)
    }

    /// Customer (when given) must be an active customer; location and items
    /// must exist and items must be active.
    async fn check_sales_references(
        &self,
        tenant_id: TenantId,
        request: &CreateSalesOrderRequest,
    ) -> ServiceResult<()> {
        if request.lines.is_empty() {
            return Err(DomainError::validation("sales order must have at least one line").into());
        }
        if let Some(customer_id) = request.customer_id {
            self.load_counterparty(tenant_id, customer_id, PartyKind::Customer)
                .await?;
        }
        self.load_location(tenant_id, request.location_id).await?;
        for line in &request.lines {
            self.load_tradable_item(tenant_id, line.item_id).await?;
        }
        Ok(())
    }

    async fn load_sales_order(
        &self,
        tenant_id: TenantId,
        id: SalesOrderId,
    ) -> ServiceResult<SalesOrder> {
        self.retry
            .run("get_sales_order", || self.store.get_sales_order(tenant_id, id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("sales order {id}")).into())
    }
}
