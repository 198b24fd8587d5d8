//! Report read models.
//!
//! Pure folds over rows loaded from the store; the services load the rows for
//! one tenant and hand them here.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use stockroom_catalog::{Item, ItemId, StockStatus};
use stockroom_core::round_money;
use stockroom_inventory::{InventoryLevel, MovementKind, NetAdjustment, StockMovement};
use stockroom_sales::{PaymentMethod, SalesOrder};

/// Revenue over `[from, to)`.
///
/// Counts SHIPPED, DELIVERED and COMPLETED orders by `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub order_count: u64,
    pub units_sold: i64,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub revenue: Decimal,
    pub by_payment_method: Vec<PaymentMethodTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethodTotal {
    /// `None` groups orders without a recorded method.
    pub payment_method: Option<PaymentMethod>,
    pub order_count: u64,
    pub revenue: Decimal,
}

pub fn sales_summary(
    orders: &[SalesOrder],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> SalesSummary {
    let mut summary = SalesSummary {
        from,
        to,
        order_count: 0,
        units_sold: 0,
        subtotal: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        discount: Decimal::ZERO,
        shipping: Decimal::ZERO,
        revenue: Decimal::ZERO,
        by_payment_method: Vec::new(),
    };
    let mut methods: BTreeMap<Option<&'static str>, PaymentMethodTotal> = BTreeMap::new();

    for order in orders
        .iter()
        .filter(|o| o.status.is_sale() && o.created_at >= from && o.created_at < to)
    {
        summary.order_count += 1;
        summary.units_sold += order.units();
        summary.subtotal += order.subtotal;
        summary.tax_amount += order.tax_amount;
        summary.discount += order.discount;
        summary.shipping += order.shipping_cost;
        summary.revenue += order.total;

        let entry = methods
            .entry(order.payment_method.map(|m| m.as_str()))
            .or_insert(PaymentMethodTotal {
                payment_method: order.payment_method,
                order_count: 0,
                revenue: Decimal::ZERO,
            });
        entry.order_count += 1;
        entry.revenue += order.total;
    }

    summary.subtotal = round_money(summary.subtotal);
    summary.tax_amount = round_money(summary.tax_amount);
    summary.discount = round_money(summary.discount);
    summary.shipping = round_money(summary.shipping);
    summary.revenue = round_money(summary.revenue);
    summary.by_payment_method = methods.into_values().collect();
    summary
}

/// Net adjustment over a set of movements; only ADJUSTMENT movements count.
pub fn net_adjustment(movements: &[StockMovement]) -> NetAdjustment {
    NetAdjustment::from_deltas(
        movements
            .iter()
            .filter(|m| m.kind == MovementKind::Adjustment)
            .map(|m| m.quantity_delta),
    )
}

/// On-hand total per item across all locations.
pub fn on_hand_by_item(levels: &[InventoryLevel]) -> HashMap<ItemId, i64> {
    let mut totals: HashMap<ItemId, i64> = HashMap::new();
    for level in levels {
        *totals.entry(level.item_id).or_default() += level.quantity;
    }
    totals
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockLine {
    pub item_id: ItemId,
    pub sku: String,
    pub name: String,
    pub on_hand: i64,
    pub min_stock_level: i64,
    pub shortfall: i64,
    pub status: StockStatus,
}

/// Active items whose on-hand total is below their minimum level, sorted
/// by sku.
pub fn low_stock(items: &[Item], levels: &[InventoryLevel]) -> Vec<LowStockLine> {
    let totals = on_hand_by_item(levels);
    let mut lines: Vec<LowStockLine> = items
        .iter()
        .filter(|item| item.active)
        .filter_map(|item| {
            let on_hand = totals.get(&item.id).copied().unwrap_or(0);
            (on_hand < item.min_stock_level).then(|| LowStockLine {
                item_id: item.id,
                sku: item.sku.clone(),
                name: item.name.clone(),
                on_hand,
                min_stock_level: item.min_stock_level,
                shortfall: item.min_stock_level - on_hand,
                status: item.stock_status(on_hand),
            })
        })
        .collect();
    lines.sort_by(|a, b| a.sku.cmp(&b.sku));
    lines
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemValuation {
    pub item_id: ItemId,
    pub sku: String,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryValuation {
    pub items: Vec<ItemValuation>,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

/// `quantity × cost_price` per item and in total.
pub fn inventory_valuation(items: &[Item], levels: &[InventoryLevel]) -> InventoryValuation {
    let totals = on_hand_by_item(levels);
    let mut rows: Vec<ItemValuation> = items
        .iter()
        .map(|item| {
            let quantity = totals.get(&item.id).copied().unwrap_or(0);
            ItemValuation {
                item_id: item.id,
                sku: item.sku.clone(),
                quantity,
                cost_price: item.cost_price,
                value: item.valuation(quantity),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.sku.cmp(&b.sku));

    InventoryValuation {
        total_quantity: rows.iter().map(|r| r.quantity).sum(),
        total_value: round_money(rows.iter().map(|r| r.value).sum()),
        items: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use stockroom_catalog::{LocationId, NewItem};
    use stockroom_core::TenantId;
    use stockroom_inventory::{DocumentRef, DocumentType, LedgerDelta, LedgerPosting};
    use stockroom_parties::PartyId;
    use stockroom_sales::{
        CreateSalesOrderRequest, SalesChannel, SalesLineRequest, SalesOrderId, SalesOrderStatus,
    };

    fn item(sku: &str, min: i64, cost: Decimal) -> Item {
        Item::create(
            TenantId::new(),
            ItemId::generate(),
            NewItem {
                sku: sku.into(),
                name: format!("{sku} name"),
                description: None,
                category: None,
                unit: None,
                cost_price: cost,
                selling_price: cost * dec!(2),
                min_stock_level: min,
                max_stock_level: None,
                is_serial_tracked: false,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn level(item: &Item, quantity: i64) -> InventoryLevel {
        let mut l = InventoryLevel::empty(item.tenant_id, item.id, LocationId::generate(), Utc::now());
        l.quantity = quantity;
        l
    }

    fn order(
        status: SalesOrderStatus,
        method: Option<PaymentMethod>,
        at: DateTime<Utc>,
    ) -> SalesOrder {
        let mut o = SalesOrder::create(
            TenantId::new(),
            SalesOrderId::generate(),
            "SO-000001".into(),
            CreateSalesOrderRequest {
                channel: SalesChannel::Standard,
                location_id: LocationId::generate(),
                customer_id: Some(PartyId::generate()),
                lines: vec![SalesLineRequest {
                    item_id: ItemId::generate(),
                    quantity: 2,
                    unit_price: dec!(10.00),
                    tax_rate: dec!(10),
                    discount: dec!(0),
                }],
                shipping_cost: dec!(5.00),
                discount: dec!(0),
                payment_method: method,
                notes: None,
            },
            None,
            at,
        )
        .unwrap();
        o.status = status;
        o
    }

    #[test]
    fn sales_summary_counts_only_sales_in_the_period() {
        let from = Utc::now();
        let to = from + Duration::days(1);
        let orders = vec![
            order(SalesOrderStatus::Completed, Some(PaymentMethod::Cash), from),
            order(SalesOrderStatus::Shipped, Some(PaymentMethod::Card), from + Duration::hours(1)),
            order(SalesOrderStatus::Returned, Some(PaymentMethod::Cash), from),
            order(SalesOrderStatus::Cancelled, None, from),
            order(SalesOrderStatus::Completed, Some(PaymentMethod::Cash), to),
        ];

        let summary = sales_summary(&orders, from, to);

        // each counted order: 20.00 + 2.00 tax + 5.00 shipping
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.units_sold, 4);
        assert_eq!(summary.subtotal, dec!(40.00));
        assert_eq!(summary.tax_amount, dec!(4.00));
        assert_eq!(summary.shipping, dec!(10.00));
        assert_eq!(summary.revenue, dec!(54.00));
        assert_eq!(summary.by_payment_method.len(), 2);
        assert!(summary.by_payment_method.iter().all(|m| m.order_count == 1));
    }

    #[test]
    fn net_adjustment_ignores_other_movement_kinds() {
        let item_id = ItemId::generate();
        let loc = LocationId::generate();
        let posting = LedgerPosting::new(
            DocumentRef::new(DocumentType::Adjustment, stockroom_core::AggregateId::new()),
            None,
            Utc::now(),
        )
        .with_deltas([
            LedgerDelta::adjustment(item_id, loc, 5).unwrap(),
            LedgerDelta::adjustment(item_id, loc, -2).unwrap(),
            LedgerDelta::receipt(item_id, loc, 100).unwrap(),
        ]);

        let net = net_adjustment(&posting.movements(TenantId::new()));

        assert_eq!(net, NetAdjustment { increase: 5, decrease: 2, net: 3 });
    }

    #[test]
    fn low_stock_sums_locations_and_reports_shortfall() {
        let a = item("A-1", 10, dec!(1.00));
        let b = item("B-1", 3, dec!(1.00));
        let levels = vec![level(&a, 4), level(&a, 2), level(&b, 3)];

        let lines = low_stock(&[b.clone(), a.clone()], &levels);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].sku, "A-1");
        assert_eq!(lines[0].on_hand, 6);
        assert_eq!(lines[0].shortfall, 4);
        assert_eq!(lines[0].status, StockStatus::Low);
    }

    #[test]
    fn valuation_multiplies_on_hand_by_cost() {
        let a = item("A-1", 0, dec!(2.50));
        let b = item("B-1", 0, dec!(0.10));
        let levels = vec![level(&a, 4), level(&b, 3), level(&a, 1)];

        let valuation = inventory_valuation(&[a, b], &levels);

        assert_eq!(valuation.total_quantity, 8);
        assert_eq!(valuation.items[0].value, dec!(12.50));
        assert_eq!(valuation.items[1].value, dec!(0.30));
        assert_eq!(valuation.total_value, dec!(12.80));
    }
}
