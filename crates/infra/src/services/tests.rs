use std::time::Duration;

use rust_decimal_macros::dec;

use stockroom_catalog::{ItemUpdate, LocationType, NewItem, NewLocation};
use stockroom_events::{EventBus, Subscription};
use stockroom_inventory::{
    AdjustmentLineRequest, AdjustmentType, CreateAdjustmentRequest, CreateTransferRequest,
    MovementKind, TransferLineRequest,
};
use stockroom_parties::{ContactInfo, NewParty};
use stockroom_purchasing::{
    CreatePurchaseOrderRequest, PurchaseLineRequest, PurchaseOrderStatus, ReceiveGoodsRequest,
    ReceiveLineRequest,
};
use stockroom_sales::{
    CreateSalesOrderRequest, PaymentMethod, PaymentStatus, SalesChannel, SalesLineRequest,
    SalesOrderStatus,
};

use super::*;
use crate::store::{MovementFilter, StockDocumentStore};

fn caller() -> Caller {
    Caller::new(TenantId::new(), Some(UserId::new()))
}

fn new_item(sku: &str, min_stock_level: i64) -> NewItem {
    NewItem {
        sku: sku.into(),
        name: format!("{sku} widget"),
        description: None,
        category: None,
        unit: None,
        cost_price: dec!(4.00),
        selling_price: dec!(10.00),
        min_stock_level,
        max_stock_level: None,
        is_serial_tracked: false,
    }
}

fn warehouse(name: &str) -> NewLocation {
    NewLocation {
        name: name.into(),
        location_type: LocationType::Warehouse,
        address: None,
    }
}

fn party(name: &str) -> NewParty {
    NewParty {
        name: name.into(),
        contact: ContactInfo::default(),
    }
}

fn drain(sub: &Subscription<EventEnvelope<JsonValue>>) -> Vec<String> {
    let mut types = Vec::new();
    while let Ok(envelope) = sub.recv_timeout(Duration::from_millis(10)) {
        types.push(envelope.event_type().to_string());
    }
    types
}

struct Fixture {
    services: Services,
    caller: Caller,
    item: Item,
    a: Location,
    b: Location,
}

impl Fixture {
    async fn new(min_stock_level: i64) -> Self {
        let services = Services::in_memory();
        let caller = caller();
        let item = services
            .create_item(caller, new_item("WID-1", min_stock_level))
            .await
            .unwrap();
        let a = services.create_location(caller, warehouse("A")).await.unwrap();
        let b = services.create_location(caller, warehouse("B")).await.unwrap();
        Self {
            services,
            caller,
            item,
            a,
            b,
        }
    }

    async fn on_hand(&self, location: &Location) -> i64 {
        self.services
            .get_level(self.caller, self.item.id, location.id)
            .await
            .unwrap()
            .quantity
    }

    /// Submitted order for `quantity` units into location A.
    async fn submitted_order(&self, quantity: i64) -> stockroom_purchasing::PurchaseOrder {
        let supplier = self
            .services
            .create_supplier(self.caller, party("Acme Supply"))
            .await
            .unwrap();
        let order = self
            .services
            .create_purchase_order(
                self.caller,
                CreatePurchaseOrderRequest {
                    supplier_id: supplier.id,
                    location_id: self.a.id,
                    lines: vec![PurchaseLineRequest {
                        item_id: self.item.id,
                        quantity,
                        unit_cost: dec!(4.00),
                    }],
                    expected_date: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        self.services
            .submit_purchase_order(self.caller, order.id)
            .await
            .unwrap()
    }

    async fn receive(
        &self,
        order: &stockroom_purchasing::PurchaseOrder,
        quantity: i64,
    ) -> ServiceResult<ReceiptOutcome> {
        self.services
            .receive_goods(
                self.caller,
                ReceiveGoodsRequest {
                    purchase_order_id: order.id,
                    location_id: self.a.id,
                    lines: vec![ReceiveLineRequest {
                        purchase_order_line_id: order.lines[0].id,
                        item_id: self.item.id,
                        received_quantity: quantity,
                        notes: None,
                    }],
                    received_by_id: None,
                    notes: None,
                },
            )
            .await
    }

    fn transfer(&self, quantity: i64) -> CreateTransferRequest {
        CreateTransferRequest {
            from_location_id: self.a.id,
            to_location_id: self.b.id,
            lines: vec![TransferLineRequest {
                item_id: self.item.id,
                quantity,
            }],
            notes: None,
        }
    }

    fn sale(&self, channel: SalesChannel, quantity: i64) -> CreateSalesOrderRequest {
        CreateSalesOrderRequest {
            channel,
            location_id: self.a.id,
            customer_id: None,
            lines: vec![SalesLineRequest {
                item_id: self.item.id,
                quantity,
                unit_price: dec!(10.00),
                tax_rate: dec!(0),
                discount: dec!(0),
            }],
            shipping_cost: dec!(0),
            discount: dec!(0),
            payment_method: (channel == SalesChannel::Pos).then_some(PaymentMethod::Cash),
            notes: None,
        }
    }
}

#[tokio::test]
async fn receive_then_transfer_moves_stock_between_locations() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(10).await;
    assert!(order.order_number.starts_with("PO-"));

    let outcome = fx.receive(&order, 10).await.unwrap();
    assert_eq!(outcome.order.status, PurchaseOrderStatus::Received);
    assert_eq!(fx.on_hand(&fx.a).await, 10);

    let transfer = fx.services.create_transfer(fx.caller, fx.transfer(4)).await.unwrap();
    assert_eq!(transfer.transfer_number, "TR-000001");
    assert_eq!(fx.on_hand(&fx.a).await, 6);
    assert_eq!(fx.on_hand(&fx.b).await, 4);

    let err = fx
        .services
        .create_transfer(fx.caller, fx.transfer(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InsufficientStock { requested: 10, available: 6, .. })
    ));
    assert_eq!(fx.on_hand(&fx.a).await, 6);
    assert_eq!(fx.on_hand(&fx.b).await, 4);

    let movements = fx
        .services
        .list_movements(fx.caller, MovementFilter::default())
        .await
        .unwrap();
    let kinds: Vec<MovementKind> = movements.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MovementKind::Receipt, MovementKind::TransferOut, MovementKind::TransferIn]
    );
}

#[tokio::test]
async fn over_receipt_rejects_the_whole_receipt() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(5).await;

    let partial = fx.receive(&order, 3).await.unwrap();
    assert_eq!(partial.order.status, PurchaseOrderStatus::PartiallyReceived);

    let err = fx.receive(&order, 3).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::OverReceipt { .. })));

    let stored = fx.services.get_purchase_order(fx.caller, order.id).await.unwrap();
    assert_eq!(stored.lines[0].received_quantity, 3);
    assert_eq!(fx.on_hand(&fx.a).await, 3);
    assert_eq!(
        fx.services.list_receipts(fx.caller, order.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn draft_orders_cannot_receive() {
    let fx = Fixture::new(0).await;
    let supplier = fx.services.create_supplier(fx.caller, party("Acme")).await.unwrap();
    let order = fx
        .services
        .create_purchase_order(
            fx.caller,
            CreatePurchaseOrderRequest {
                supplier_id: supplier.id,
                location_id: fx.a.id,
                lines: vec![PurchaseLineRequest {
                    item_id: fx.item.id,
                    quantity: 2,
                    unit_cost: dec!(1.00),
                }],
                expected_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    let err = fx.receive(&order, 1).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert_eq!(fx.on_hand(&fx.a).await, 0);
}

#[tokio::test]
async fn purchase_orders_need_an_active_supplier() {
    let fx = Fixture::new(0).await;
    let customer = fx.services.create_customer(fx.caller, party("Jane")).await.unwrap();
    let supplier = fx.services.create_supplier(fx.caller, party("Acme")).await.unwrap();
    fx.services.suspend_party(fx.caller, supplier.id).await.unwrap();

    for supplier_id in [customer.id, supplier.id] {
        let err = fx
            .services
            .create_purchase_order(
                fx.caller,
                CreatePurchaseOrderRequest {
                    supplier_id,
                    location_id: fx.a.id,
                    lines: vec![PurchaseLineRequest {
                        item_id: fx.item.id,
                        quantity: 1,
                        unit_cost: dec!(1.00),
                    }],
                    expected_date: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let fx = Fixture::new(0).await;
    let err = fx
        .services
        .create_item(fx.caller, new_item("WID-1", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

    // same sku in another tenant is fine
    fx.services.create_item(caller(), new_item("WID-1", 0)).await.unwrap();
}

#[tokio::test]
async fn other_tenants_cannot_see_or_touch_rows() {
    let fx = Fixture::new(0).await;
    let stranger = caller();

    let err = fx.services.get_item(stranger, fx.item.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

    let err = fx
        .services
        .create_transfer(stranger, fx.transfer(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    assert!(fx.services.list_items(stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn transfer_to_the_same_location_is_rejected() {
    let fx = Fixture::new(0).await;
    let mut request = fx.transfer(1);
    request.to_location_id = fx.a.id;

    let err = fx.services.create_transfer(fx.caller, request).await.unwrap_err();
    assert_eq!(err, ServiceError::Domain(DomainError::SameLocation));
}

#[tokio::test]
async fn adjustments_cannot_take_stock_negative() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(5).await;
    fx.receive(&order, 5).await.unwrap();

    let err = fx
        .services
        .create_adjustment(
            fx.caller,
            CreateAdjustmentRequest::single(fx.a.id, fx.item.id, AdjustmentType::Damage, -6, "dropped"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::InsufficientStock { .. })));
    assert_eq!(fx.on_hand(&fx.a).await, 5);

    let adjustment = fx
        .services
        .create_adjustment(
            fx.caller,
            CreateAdjustmentRequest::single(fx.a.id, fx.item.id, AdjustmentType::Damage, -2, "dropped"),
        )
        .await
        .unwrap();
    assert_eq!(adjustment.adjustment_number, "ADJ-000001");
    assert_eq!(fx.on_hand(&fx.a).await, 3);
}

#[tokio::test]
async fn rejected_documents_do_not_consume_numbers() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(3).await;
    fx.receive(&order, 3).await.unwrap();

    let err = fx.services.create_transfer(fx.caller, fx.transfer(4)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::InsufficientStock { .. })));
    let transfer = fx.services.create_transfer(fx.caller, fx.transfer(1)).await.unwrap();
    assert_eq!(transfer.transfer_number, "TR-000001");

    let mut overdiscounted = fx.sale(SalesChannel::Pos, 1);
    overdiscounted.discount = dec!(50.00);
    let err = fx.services.checkout(fx.caller, overdiscounted).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    let sale = fx.services.checkout(fx.caller, fx.sale(SalesChannel::Pos, 1)).await.unwrap();
    assert_eq!(sale.order_number, "POS-000001");

    let stored = fx
        .services
        .store()
        .get_transfer(fx.caller.tenant_id, transfer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.transfer_number, "TR-000001");
}

#[tokio::test]
async fn ledger_overflow_is_a_validation_error() {
    let fx = Fixture::new(0).await;
    fx.services
        .create_adjustment(
            fx.caller,
            CreateAdjustmentRequest::single(
                fx.a.id,
                fx.item.id,
                AdjustmentType::Correction,
                i64::MAX,
                "opening balance",
            ),
        )
        .await
        .unwrap();

    let err = fx
        .services
        .create_adjustment(
            fx.caller,
            CreateAdjustmentRequest::single(fx.a.id, fx.item.id, AdjustmentType::Correction, 1, "one more"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))), "{err:?}");
    assert_eq!(fx.on_hand(&fx.a).await, i64::MAX);
}

#[tokio::test]
async fn repeated_count_lines_are_rejected() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(8).await;
    fx.receive(&order, 8).await.unwrap();

    let counted = |quantity| AdjustmentLineRequest {
        item_id: fx.item.id,
        quantity_delta: None,
        counted_quantity: Some(quantity),
    };
    let err = fx
        .services
        .create_adjustment(
            fx.caller,
            CreateAdjustmentRequest {
                location_id: fx.a.id,
                adjustment_type: AdjustmentType::StockCount,
                reason: "double scan".into(),
                lines: vec![counted(5), counted(5)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert_eq!(fx.on_hand(&fx.a).await, 8);
}

#[tokio::test]
async fn stock_counts_adjust_to_the_counted_quantity() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(8).await;
    fx.receive(&order, 8).await.unwrap();

    let adjustment = fx
        .services
        .create_adjustment(
            fx.caller,
            CreateAdjustmentRequest {
                location_id: fx.a.id,
                adjustment_type: AdjustmentType::StockCount,
                reason: "cycle count".into(),
                lines: vec![AdjustmentLineRequest {
                    item_id: fx.item.id,
                    quantity_delta: None,
                    counted_quantity: Some(5),
                }],
            },
        )
        .await
        .unwrap();

    assert_eq!(adjustment.lines[0].quantity_delta, -3);
    assert_eq!(fx.on_hand(&fx.a).await, 5);

    let net = fx
        .services
        .net_adjustment(fx.caller, AdjustmentReportFilter::default())
        .await
        .unwrap();
    assert_eq!(net.net, -3);
}

#[tokio::test]
async fn confirmed_reservation_blocks_pos_until_cancelled() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(5).await;
    fx.receive(&order, 5).await.unwrap();
    let customer = fx.services.create_customer(fx.caller, party("Jane")).await.unwrap();

    let mut request = fx.sale(SalesChannel::Standard, 4);
    request.customer_id = Some(customer.id);
    let standard = fx.services.create_sales_order(fx.caller, request).await.unwrap();
    assert_eq!(standard.status, SalesOrderStatus::Draft);
    fx.services.confirm_sales_order(fx.caller, standard.id).await.unwrap();
    assert_eq!(
        fx.services.available_quantity(fx.caller, fx.item.id, fx.a.id).await.unwrap(),
        1
    );

    let err = fx
        .services
        .checkout(fx.caller, fx.sale(SalesChannel::Pos, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::InsufficientStock { .. })));

    fx.services.cancel_sales_order(fx.caller, standard.id).await.unwrap();
    let sale = fx
        .services
        .checkout(fx.caller, fx.sale(SalesChannel::Pos, 2))
        .await
        .unwrap();
    assert_eq!(sale.status, SalesOrderStatus::Completed);
    assert_eq!(sale.payment_status, PaymentStatus::Paid);
    assert_eq!(sale.order_number, "POS-000001");
    assert_eq!(fx.on_hand(&fx.a).await, 3);
}

#[tokio::test]
async fn shipping_consumes_the_reservation_and_returns_restock() {
    let fx = Fixture::new(0).await;
    let order = fx.submitted_order(5).await;
    fx.receive(&order, 5).await.unwrap();
    let customer = fx.services.create_customer(fx.caller, party("Jane")).await.unwrap();

    let mut request = fx.sale(SalesChannel::Standard, 2);
    request.customer_id = Some(customer.id);
    let so = fx.services.create_sales_order(fx.caller, request).await.unwrap();
    fx.services.confirm_sales_order(fx.caller, so.id).await.unwrap();
    fx.services.ship_sales_order(fx.caller, so.id).await.unwrap();

    let level = fx.services.get_level(fx.caller, fx.item.id, fx.a.id).await.unwrap();
    assert_eq!((level.quantity, level.reserved_quantity), (3, 0));

    fx.services.deliver_sales_order(fx.caller, so.id).await.unwrap();
    let paid = fx
        .services
        .record_payment(fx.caller, so.id, dec!(20.00), Some(PaymentMethod::Card))
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let returned = fx.services.return_sales_order(fx.caller, so.id).await.unwrap();
    assert_eq!(returned.status, SalesOrderStatus::Returned);
    assert_eq!(returned.payment_status, PaymentStatus::Refunded);
    assert_eq!(fx.on_hand(&fx.a).await, 5);
}

#[tokio::test]
async fn overpayment_is_rejected() {
    let fx = Fixture::new(0).await;
    let customer = fx.services.create_customer(fx.caller, party("Jane")).await.unwrap();
    let mut request = fx.sale(SalesChannel::Standard, 1);
    request.customer_id = Some(customer.id);
    let so = fx.services.create_sales_order(fx.caller, request).await.unwrap();

    let partial = fx
        .services
        .record_payment(fx.caller, so.id, dec!(4.00), None)
        .await
        .unwrap();
    assert_eq!(partial.payment_status, PaymentStatus::PartiallyPaid);

    let err = fx
        .services
        .record_payment(fx.caller, so.id, dec!(7.00), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
}

#[tokio::test]
async fn crossing_the_minimum_publishes_low_stock_once() {
    let fx = Fixture::new(5).await;
    let order = fx.submitted_order(6).await;
    fx.receive(&order, 6).await.unwrap();

    let sub = fx.services.bus().subscribe();
    fx.services.checkout(fx.caller, fx.sale(SalesChannel::Pos, 2)).await.unwrap();
    fx.services.checkout(fx.caller, fx.sale(SalesChannel::Pos, 1)).await.unwrap();

    let types = drain(&sub);
    let low: Vec<&String> = types.iter().filter(|t| *t == "inventory.stock.low").collect();
    assert_eq!(low.len(), 1);
    assert!(types.iter().any(|t| t == "sales.sales_order.created"));
}

#[tokio::test]
async fn updating_an_item_keeps_its_sku() {
    let fx = Fixture::new(0).await;
    let updated = fx
        .services
        .update_item(
            fx.caller,
            fx.item.id,
            ItemUpdate {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.sku, "WID-1");
    assert_eq!(fx.services.get_item(fx.caller, fx.item.id).await.unwrap().name, "Renamed");
}

#[tokio::test]
async fn reports_reflect_committed_stock() {
    let fx = Fixture::new(20).await;
    let order = fx.submitted_order(10).await;
    fx.receive(&order, 10).await.unwrap();
    fx.services.checkout(fx.caller, fx.sale(SalesChannel::Pos, 3)).await.unwrap();

    let valuation = fx.services.inventory_valuation(fx.caller).await.unwrap();
    assert_eq!(valuation.total_quantity, 7);
    assert_eq!(valuation.total_value, dec!(28.00));

    let low = fx.services.low_stock_report(fx.caller).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].shortfall, 13);

    let now = chrono::Utc::now();
    let summary = fx
        .services
        .sales_summary(fx.caller, now - chrono::Duration::hours(1), now + chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(summary.order_count, 1);
    assert_eq!(summary.revenue, dec!(30.00));
}
