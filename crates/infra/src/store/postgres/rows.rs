//! Row decoding for the Postgres store.
//!
//! Enums are stored as their `as_str` text and parsed back with `FromStr`;
//! a value the domain does not recognise surfaces as a column decode error.

use core::str::FromStr;

use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use stockroom_catalog::{Item, Location};
use stockroom_core::{AggregateId, DomainError, TenantId, UserId};
use stockroom_inventory::{
    Adjustment, AdjustmentLine, DocumentRef, InventoryLevel, StockMovement, Transfer, TransferLine,
};
use stockroom_parties::{ContactInfo, Party};
use stockroom_purchasing::{GoodsReceipt, GoodsReceiptLine, PurchaseOrder, PurchaseOrderLine};
use stockroom_sales::{SalesOrder, SalesOrderLine};

pub(super) fn tenant(row: &PgRow) -> Result<TenantId, sqlx::Error> {
    Ok(TenantId::from_uuid(row.try_get("tenant_id")?))
}

pub(super) fn id<T: From<AggregateId>>(row: &PgRow, column: &str) -> Result<T, sqlx::Error> {
    let uuid: Uuid = row.try_get(column)?;
    Ok(T::from(AggregateId::from_uuid(uuid)))
}

fn opt_id<T: From<AggregateId>>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error> {
    let uuid: Option<Uuid> = row.try_get(column)?;
    Ok(uuid.map(|u| T::from(AggregateId::from_uuid(u))))
}

fn user(row: &PgRow, column: &str) -> Result<Option<UserId>, sqlx::Error> {
    let uuid: Option<Uuid> = row.try_get(column)?;
    Ok(uuid.map(UserId::from_uuid))
}

fn parsed<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = DomainError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: DomainError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn opt_parsed<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = DomainError>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|r| {
        r.parse().map_err(|e: DomainError| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}

fn count(row: &PgRow, column: &str) -> Result<u64, sqlx::Error> {
    let value: i64 = row.try_get(column)?;
    u64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn line_no(row: &PgRow) -> Result<u32, sqlx::Error> {
    let value: i32 = row.try_get("line_no")?;
    u32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: "line_no".to_string(),
        source: Box::new(e),
    })
}

pub(super) fn item(row: &PgRow) -> Result<Item, sqlx::Error> {
    Ok(Item {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        unit: row.try_get("unit")?,
        cost_price: row.try_get("cost_price")?,
        selling_price: row.try_get("selling_price")?,
        min_stock_level: row.try_get("min_stock_level")?,
        max_stock_level: row.try_get("max_stock_level")?,
        is_serial_tracked: row.try_get("is_serial_tracked")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn location(row: &PgRow) -> Result<Location, sqlx::Error> {
    Ok(Location {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        name: row.try_get("name")?,
        location_type: parsed(row, "location_type")?,
        address: row.try_get("address")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn party(row: &PgRow) -> Result<Party, sqlx::Error> {
    Ok(Party {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        kind: parsed(row, "kind")?,
        name: row.try_get("name")?,
        contact: ContactInfo {
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
        },
        status: parsed(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn level(row: &PgRow) -> Result<InventoryLevel, sqlx::Error> {
    Ok(InventoryLevel {
        tenant_id: tenant(row)?,
        item_id: id(row, "item_id")?,
        location_id: id(row, "location_id")?,
        quantity: row.try_get("quantity")?,
        reserved_quantity: row.try_get("reserved_quantity")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn movement(row: &PgRow) -> Result<StockMovement, sqlx::Error> {
    Ok(StockMovement {
        id: row.try_get("id")?,
        tenant_id: tenant(row)?,
        item_id: id(row, "item_id")?,
        location_id: id(row, "location_id")?,
        kind: parsed(row, "kind")?,
        quantity_delta: row.try_get("quantity_delta")?,
        reserved_delta: row.try_get("reserved_delta")?,
        reference: DocumentRef::new(parsed(row, "document_type")?, id(row, "document_id")?),
        actor: user(row, "actor")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

/// Order header; lines are attached by the caller.
pub(super) fn purchase_order(row: &PgRow) -> Result<PurchaseOrder, sqlx::Error> {
    Ok(PurchaseOrder {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        order_number: row.try_get("order_number")?,
        supplier_id: id(row, "supplier_id")?,
        location_id: id(row, "location_id")?,
        status: parsed(row, "status")?,
        expected_date: row.try_get("expected_date")?,
        notes: row.try_get("notes")?,
        lines: Vec::new(),
        created_by: user(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: count(row, "version")?,
    })
}

pub(super) fn purchase_order_line(row: &PgRow) -> Result<PurchaseOrderLine, sqlx::Error> {
    Ok(PurchaseOrderLine {
        id: id(row, "id")?,
        line_no: line_no(row)?,
        item_id: id(row, "item_id")?,
        quantity: row.try_get("quantity")?,
        received_quantity: row.try_get("received_quantity")?,
        unit_cost: row.try_get("unit_cost")?,
    })
}

pub(super) fn goods_receipt(row: &PgRow) -> Result<GoodsReceipt, sqlx::Error> {
    Ok(GoodsReceipt {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        purchase_order_id: id(row, "purchase_order_id")?,
        location_id: id(row, "location_id")?,
        received_by_id: user(row, "received_by_id")?,
        notes: row.try_get("notes")?,
        lines: Vec::new(),
        received_at: row.try_get("received_at")?,
    })
}

pub(super) fn goods_receipt_line(row: &PgRow) -> Result<GoodsReceiptLine, sqlx::Error> {
    Ok(GoodsReceiptLine {
        purchase_order_line_id: id(row, "purchase_order_line_id")?,
        item_id: id(row, "item_id")?,
        received_quantity: row.try_get("received_quantity")?,
        notes: row.try_get("notes")?,
    })
}

pub(super) fn transfer(row: &PgRow) -> Result<Transfer, sqlx::Error> {
    Ok(Transfer {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        transfer_number: row.try_get("transfer_number")?,
        from_location_id: id(row, "from_location_id")?,
        to_location_id: id(row, "to_location_id")?,
        status: parsed(row, "status")?,
        notes: row.try_get("notes")?,
        lines: Vec::new(),
        created_by: user(row, "created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn transfer_line(row: &PgRow) -> Result<TransferLine, sqlx::Error> {
    Ok(TransferLine {
        item_id: id(row, "item_id")?,
        quantity: row.try_get("quantity")?,
    })
}

pub(super) fn adjustment(row: &PgRow) -> Result<Adjustment, sqlx::Error> {
    Ok(Adjustment {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        adjustment_number: row.try_get("adjustment_number")?,
        location_id: id(row, "location_id")?,
        adjustment_type: parsed(row, "adjustment_type")?,
        reason: row.try_get("reason")?,
        lines: Vec::new(),
        created_by: user(row, "created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn adjustment_line(row: &PgRow) -> Result<AdjustmentLine, sqlx::Error> {
    Ok(AdjustmentLine {
        item_id: id(row, "item_id")?,
        quantity_delta: row.try_get("quantity_delta")?,
    })
}

pub(super) fn sales_order(row: &PgRow) -> Result<SalesOrder, sqlx::Error> {
    Ok(SalesOrder {
        id: id(row, "id")?,
        tenant_id: tenant(row)?,
        order_number: row.try_get("order_number")?,
        channel: parsed(row, "channel")?,
        customer_id: opt_id(row, "customer_id")?,
        location_id: id(row, "location_id")?,
        status: parsed(row, "status")?,
        payment_status: parsed(row, "payment_status")?,
        payment_method: opt_parsed(row, "payment_method")?,
        amount_paid: row.try_get("amount_paid")?,
        lines: Vec::new(),
        subtotal: row.try_get("subtotal")?,
        tax_amount: row.try_get("tax_amount")?,
        shipping_cost: row.try_get("shipping_cost")?,
        discount: row.try_get("discount")?,
        total: row.try_get("total")?,
        notes: row.try_get("notes")?,
        created_by: user(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: count(row, "version")?,
    })
}

pub(super) fn sales_order_line(row: &PgRow) -> Result<SalesOrderLine, sqlx::Error> {
    Ok(SalesOrderLine {
        line_no: line_no(row)?,
        item_id: id(row, "item_id")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        tax_rate: row.try_get("tax_rate")?,
        discount: row.try_get("discount")?,
        subtotal: row.try_get("subtotal")?,
        tax_amount: row.try_get("tax_amount")?,
        total: row.try_get("total")?,
    })
}
