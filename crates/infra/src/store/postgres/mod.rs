//! Postgres-backed store.
//!
//! Every statement filters on `tenant_id`. Composite commits run in one
//! transaction; returning early with `?` drops the transaction, which rolls
//! it back.
//!
//! ## Ledger updates
//!
//! Each [`LedgerDelta`] is applied with a single conditional `UPDATE` that
//! only matches when the resulting row keeps
//! `0 <= reserved_quantity <= quantity` and, for a guarded delta, while the
//! row still holds the expected on-hand quantity. Zero affected rows means
//! the delta was rejected; the row is then read back to report
//! `InsufficientStock` or `Conflict` with the numbers the caller saw.
//!
//! ## Document numbers
//!
//! New documents draw their number from `document_sequences` inside the
//! transaction that stores them. The row lock serializes creators of the
//! same sequence, and a rolled-back document leaves the counter untouched.
//!
//! ## Error mapping
//!
//! | sqlx error | StoreError |
//! |---|---|
//! | database `23505` (unique violation) | `Conflict` |
//! | database `22003` (numeric out of range) | `Rejected(Validation)` |
//! | pool timeout / closed, io, tls | `Unavailable` |
//! | `RowNotFound` | `NotFound` |
//! | anything else | `Backend` |

mod rows;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockroom_catalog::{Item, ItemId, Location, LocationId};
use stockroom_core::{DomainError, TenantId};
use stockroom_inventory::{
    Adjustment, AdjustmentId, InventoryLevel, LedgerDelta, LedgerPosting, StockMovement, Transfer,
    TransferId,
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

const SCHEMA: &str = include_str!("../../../migrations/0001_init.sql");

type Tx<'a> = Transaction<'a, Postgres>;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a bounded pool against `url`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Tx<'static>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn commit(tx: Tx<'_>) -> StoreResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

fn decode<T>(rows: &[PgRow], f: fn(&PgRow) -> Result<T, sqlx::Error>) -> StoreResult<Vec<T>> {
    rows.iter()
        .map(f)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Backend(format!("failed to decode row: {e}")))
}

fn decode_one<T>(row: &PgRow, f: fn(&PgRow) -> Result<T, sqlx::Error>) -> StoreResult<T> {
    f(row).map_err(|e| StoreError::Backend(format!("failed to decode row: {e}")))
}

fn version_param(version: u64) -> StoreResult<i64> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

/// Draw the next number of a per-tenant sequence inside `tx`.
async fn next_number(tx: &mut Tx<'_>, tenant_id: TenantId, sequence: &str) -> StoreResult<String> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO document_sequences (tenant_id, name, last_value)
        VALUES ($1, $2, 1)
        ON CONFLICT (tenant_id, name)
        DO UPDATE SET last_value = document_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(sequence)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("next_number", e))?;

    let value = u64::try_from(value)
        .map_err(|_| StoreError::Backend(format!("sequence {sequence} underflow")))?;
    Ok(document_number(sequence, value))
}

/// Ensure the row exists, then apply `delta` conditionally and record its
/// movement.
async fn apply_posting(
    tx: &mut Tx<'_>,
    tenant_id: TenantId,
    posting: &LedgerPosting,
) -> StoreResult<()> {
    for (delta, movement) in posting.deltas.iter().zip(posting.movements(tenant_id)) {
        sqlx::query(
            r#"
            INSERT INTO inventory_levels
                (tenant_id, item_id, location_id, quantity, reserved_quantity, updated_at)
            VALUES ($1, $2, $3, 0, 0, $4)
            ON CONFLICT (tenant_id, item_id, location_id) DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(delta.item_id.0.as_uuid())
        .bind(delta.location_id.0.as_uuid())
        .bind(posting.occurred_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("ensure_level", e))?;

        let updated = sqlx::query(
            r#"
            UPDATE inventory_levels
            SET quantity = quantity + $4,
                reserved_quantity = reserved_quantity + $5,
                updated_at = $6
            WHERE tenant_id = $1 AND item_id = $2 AND location_id = $3
              AND quantity + $4 >= 0
              AND reserved_quantity + $5 >= 0
              AND reserved_quantity + $5 <= quantity + $4
              AND ($7::BIGINT IS NULL OR quantity = $7)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(delta.item_id.0.as_uuid())
        .bind(delta.location_id.0.as_uuid())
        .bind(delta.quantity_delta)
        .bind(delta.reserved_delta)
        .bind(posting.occurred_at)
        .bind(delta.expected_quantity)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("apply_delta", e))?;

        if updated.rows_affected() == 0 {
            return Err(rejected_delta(tx, tenant_id, delta).await);
        }

        insert_movement(tx, &movement).await?;
    }
    Ok(())
}

/// Explain why a conditional update matched nothing.
async fn rejected_delta(tx: &mut Tx<'_>, tenant_id: TenantId, delta: &LedgerDelta) -> StoreError {
    let row = sqlx::query(
        r#"
        SELECT tenant_id, item_id, location_id, quantity, reserved_quantity, updated_at
        FROM inventory_levels
        WHERE tenant_id = $1 AND item_id = $2 AND location_id = $3
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(delta.item_id.0.as_uuid())
    .bind(delta.location_id.0.as_uuid())
    .fetch_one(&mut **tx)
    .await;

    let level: InventoryLevel = match row {
        Ok(row) => match decode_one(&row, rows::level) {
            Ok(level) => level,
            Err(e) => return e,
        },
        Err(e) => return map_sqlx_error("read_rejected_level", e),
    };

    match level.check(delta) {
        Err(e) => e.into(),
        Ok(_) => StoreError::Conflict(format!(
            "ledger row for item {} at location {} changed concurrently",
            delta.item_id, delta.location_id
        )),
    }
}

async fn insert_movement(tx: &mut Tx<'_>, m: &StockMovement) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, tenant_id, item_id, location_id, kind, quantity_delta, reserved_delta,
            document_type, document_id, actor, occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(m.id)
    .bind(m.tenant_id.as_uuid())
    .bind(m.item_id.0.as_uuid())
    .bind(m.location_id.0.as_uuid())
    .bind(m.kind.as_str())
    .bind(m.quantity_delta)
    .bind(m.reserved_delta)
    .bind(m.reference.document_type.as_str())
    .bind(m.reference.document_id.as_uuid())
    .bind(m.actor.map(Uuid::from))
    .bind(m.occurred_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;
    Ok(())
}

/// Zero rows for every `(item, location)` pair the new entity completes.
async fn seed_levels(
    tx: &mut Tx<'_>,
    tenant_id: TenantId,
    item_id: Option<ItemId>,
    location_id: Option<LocationId>,
    at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_levels
            (tenant_id, item_id, location_id, quantity, reserved_quantity, updated_at)
        SELECT i.tenant_id, i.id, l.id, 0, 0, $4
        FROM items i
        JOIN locations l ON l.tenant_id = i.tenant_id
        WHERE i.tenant_id = $1
          AND ($2::uuid IS NULL OR i.id = $2)
          AND ($3::uuid IS NULL OR l.id = $3)
        ON CONFLICT (tenant_id, item_id, location_id) DO NOTHING
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(item_id.map(|id| *id.0.as_uuid()))
    .bind(location_id.map(|id| *id.0.as_uuid()))
    .bind(at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("seed_levels", e))?;
    Ok(())
}

async fn upsert_purchase_order_lines(tx: &mut Tx<'_>, order: &PurchaseOrder) -> StoreResult<()> {
    for line in &order.lines {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_lines (
                tenant_id, id, purchase_order_id, line_no, item_id, quantity,
                received_quantity, unit_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (tenant_id, id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                received_quantity = EXCLUDED.received_quantity,
                unit_cost = EXCLUDED.unit_cost
            "#,
        )
        .bind(order.tenant_id.as_uuid())
        .bind(line.id.0.as_uuid())
        .bind(order.id.0.as_uuid())
        .bind(line.line_no as i32)
        .bind(line.item_id.0.as_uuid())
        .bind(line.quantity)
        .bind(line.received_quantity)
        .bind(line.unit_cost)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_purchase_order_line", e))?;
    }
    Ok(())
}

/// Versioned header write. Returns the new version.
async fn update_purchase_order_header(tx: &mut Tx<'_>, order: &PurchaseOrder) -> StoreResult<u64> {
    let updated = sqlx::query(
        r#"
        UPDATE purchase_orders
        SET status = $4, expected_date = $5, notes = $6, updated_at = $7,
            version = version + 1
        WHERE tenant_id = $1 AND id = $2 AND version = $3
        "#,
    )
    .bind(order.tenant_id.as_uuid())
    .bind(order.id.0.as_uuid())
    .bind(version_param(order.version)?)
    .bind(order.status.as_str())
    .bind(order.expected_date)
    .bind(&order.notes)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update_purchase_order", e))?;

    if updated.rows_affected() == 0 {
        return Err(stale_document(tx, "purchase_orders", order.tenant_id, *order.id.0.as_uuid(), &order.order_number).await);
    }
    upsert_purchase_order_lines(tx, order).await?;
    Ok(order.version + 1)
}

/// A versioned update matched nothing: missing row or stale version.
async fn stale_document(
    tx: &mut Tx<'_>,
    table: &'static str,
    tenant_id: TenantId,
    id: Uuid,
    number: &str,
) -> StoreError {
    let sql = format!("SELECT 1 FROM {table} WHERE tenant_id = $1 AND id = $2");
    match sqlx::query(&sql)
        .bind(tenant_id.as_uuid())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    {
        Ok(Some(_)) => StoreError::Conflict(format!("{number} was modified concurrently")),
        Ok(None) => StoreError::NotFound(number.to_string()),
        Err(e) => map_sqlx_error("check_document", e),
    }
}

async fn insert_sales_order_lines(tx: &mut Tx<'_>, order: &SalesOrder) -> StoreResult<()> {
    for line in &order.lines {
        sqlx::query(
            r#"
            INSERT INTO sales_order_lines (
                tenant_id, sales_order_id, line_no, item_id, quantity, unit_price,
                tax_rate, discount, subtotal, tax_amount, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.tenant_id.as_uuid())
        .bind(order.id.0.as_uuid())
        .bind(line.line_no as i32)
        .bind(line.item_id.0.as_uuid())
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.tax_rate)
        .bind(line.discount)
        .bind(line.subtotal)
        .bind(line.tax_amount)
        .bind(line.total)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sales_order_line", e))?;
    }
    Ok(())
}

impl PostgresStore {
    async fn attach_purchase_order_lines(
        &self,
        tenant_id: TenantId,
        mut orders: Vec<PurchaseOrder>,
    ) -> StoreResult<Vec<PurchaseOrder>> {
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| *o.id.0.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT purchase_order_id, id, line_no, item_id, quantity, received_quantity, unit_cost
            FROM purchase_order_lines
            WHERE tenant_id = $1 AND purchase_order_id = ANY($2)
            ORDER BY line_no ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_purchase_order_lines", e))?;

        let mut by_order: HashMap<PurchaseOrderId, Vec<_>> = HashMap::new();
        for row in &rows {
            let order_id: PurchaseOrderId = decode_one(row, |r| rows::id(r, "purchase_order_id"))?;
            by_order
                .entry(order_id)
                .or_default()
                .push(decode_one(row, rows::purchase_order_line)?);
        }
        for order in &mut orders {
            order.lines = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn attach_sales_order_lines(
        &self,
        tenant_id: TenantId,
        mut orders: Vec<SalesOrder>,
    ) -> StoreResult<Vec<SalesOrder>> {
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| *o.id.0.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT sales_order_id, line_no, item_id, quantity, unit_price, tax_rate, discount,
                   subtotal, tax_amount, total
            FROM sales_order_lines
            WHERE tenant_id = $1 AND sales_order_id = ANY($2)
            ORDER BY line_no ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_sales_order_lines", e))?;

        let mut by_order: HashMap<SalesOrderId, Vec<_>> = HashMap::new();
        for row in &rows {
            let order_id: SalesOrderId = decode_one(row, |r| rows::id(r, "sales_order_id"))?;
            by_order
                .entry(order_id)
                .or_default()
                .push(decode_one(row, rows::sales_order_line)?);
        }
        for order in &mut orders {
            order.lines = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self, item), fields(tenant_id = %item.tenant_id, sku = %item.sku), err)]
    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO items (
                tenant_id, id, sku, name, description, category, unit, cost_price,
                selling_price, min_stock_level, max_stock_level, is_serial_tracked, active,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(item.tenant_id.as_uuid())
        .bind(item.id.0.as_uuid())
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.unit)
        .bind(item.cost_price)
        .bind(item.selling_price)
        .bind(item.min_stock_level)
        .bind(item.max_stock_level)
        .bind(item.is_serial_tracked)
        .bind(item.active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        seed_levels(&mut tx, item.tenant_id, Some(item.id), None, item.created_at).await?;
        commit(tx).await
    }

    #[instrument(skip(self, item), fields(tenant_id = %item.tenant_id, item_id = %item.id), err)]
    async fn update_item(&self, item: &Item) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE items
            SET name = $3, description = $4, category = $5, unit = $6, cost_price = $7,
                selling_price = $8, min_stock_level = $9, max_stock_level = $10,
                active = $11, updated_at = $12
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(item.tenant_id.as_uuid())
        .bind(item.id.0.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.unit)
        .bind(item.cost_price)
        .bind(item.selling_price)
        .bind(item.min_stock_level)
        .bind(item.max_stock_level)
        .bind(item.active)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("item {}", item.id)));
        }
        Ok(())
    }

    async fn get_item(&self, tenant_id: TenantId, id: ItemId) -> StoreResult<Option<Item>> {
        let row = sqlx::query("SELECT * FROM items WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.map(|r| decode_one(&r, rows::item)).transpose()
    }

    async fn list_items(&self, tenant_id: TenantId) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query("SELECT * FROM items WHERE tenant_id = $1 ORDER BY sku ASC")
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        decode(&rows, rows::item)
    }

    #[instrument(skip(self, location), fields(tenant_id = %location.tenant_id), err)]
    async fn insert_location(&self, location: &Location) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO locations (tenant_id, id, name, location_type, address, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(location.tenant_id.as_uuid())
        .bind(location.id.0.as_uuid())
        .bind(&location.name)
        .bind(location.location_type.as_str())
        .bind(&location.address)
        .bind(location.active)
        .bind(location.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_location", e))?;

        seed_levels(&mut tx, location.tenant_id, None, Some(location.id), location.created_at)
            .await?;
        commit(tx).await
    }

    async fn get_location(
        &self,
        tenant_id: TenantId,
        id: LocationId,
    ) -> StoreResult<Option<Location>> {
        let row = sqlx::query("SELECT * FROM locations WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_location", e))?;
        row.map(|r| decode_one(&r, rows::location)).transpose()
    }

    async fn list_locations(&self, tenant_id: TenantId) -> StoreResult<Vec<Location>> {
        let rows =
            sqlx::query("SELECT * FROM locations WHERE tenant_id = $1 ORDER BY created_at ASC")
                .bind(tenant_id.as_uuid())
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_locations", e))?;
        decode(&rows, rows::location)
    }
}

#[async_trait]
impl PartyStore for PostgresStore {
    async fn insert_party(&self, party: &Party) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO parties (tenant_id, id, kind, name, email, phone, address, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(party.tenant_id.as_uuid())
        .bind(party.id.0.as_uuid())
        .bind(party.kind.as_str())
        .bind(&party.name)
        .bind(&party.contact.email)
        .bind(&party.contact.phone)
        .bind(&party.contact.address)
        .bind(party.status.as_str())
        .bind(party.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_party", e))?;
        Ok(())
    }

    async fn update_party(&self, party: &Party) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE parties SET name = $3, email = $4, phone = $5, address = $6, status = $7
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(party.tenant_id.as_uuid())
        .bind(party.id.0.as_uuid())
        .bind(&party.name)
        .bind(&party.contact.email)
        .bind(&party.contact.phone)
        .bind(&party.contact.address)
        .bind(party.status.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_party", e))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("party {}", party.id)));
        }
        Ok(())
    }

    async fn get_party(&self, tenant_id: TenantId, id: PartyId) -> StoreResult<Option<Party>> {
        let row = sqlx::query("SELECT * FROM parties WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_party", e))?;
        row.map(|r| decode_one(&r, rows::party)).transpose()
    }

    async fn list_parties(
        &self,
        tenant_id: TenantId,
        kind: Option<PartyKind>,
    ) -> StoreResult<Vec<Party>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM parties
            WHERE tenant_id = $1 AND ($2::text IS NULL OR kind = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_parties", e))?;
        decode(&rows, rows::party)
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn get_level(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
    ) -> StoreResult<Option<InventoryLevel>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM inventory_levels
            WHERE tenant_id = $1 AND item_id = $2 AND location_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(item_id.0.as_uuid())
        .bind(location_id.0.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_level", e))?;
        row.map(|r| decode_one(&r, rows::level)).transpose()
    }

    async fn list_levels(
        &self,
        tenant_id: TenantId,
        filter: &LevelFilter,
    ) -> StoreResult<Vec<InventoryLevel>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM inventory_levels
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR location_id = $3)
            ORDER BY item_id ASC, location_id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(filter.item_id.map(|id| *id.0.as_uuid()))
        .bind(filter.location_id.map(|id| *id.0.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_levels", e))?;
        decode(&rows, rows::level)
    }

    async fn list_movements(
        &self,
        tenant_id: TenantId,
        filter: &MovementFilter,
    ) -> StoreResult<Vec<StockMovement>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR location_id = $3)
              AND ($4::text IS NULL OR kind = $4)
              AND ($5::timestamptz IS NULL OR occurred_at >= $5)
              AND ($6::timestamptz IS NULL OR occurred_at < $6)
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(filter.item_id.map(|id| *id.0.as_uuid()))
        .bind(filter.location_id.map(|id| *id.0.as_uuid()))
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;
        decode(&rows, rows::movement)
    }
}

#[async_trait]
impl PurchasingStore for PostgresStore {
    #[instrument(skip(self, order), fields(tenant_id = %order.tenant_id, order_id = %order.id), err)]
    async fn insert_purchase_order(
        &self,
        order: &PurchaseOrder,
        sequence: &str,
    ) -> StoreResult<PurchaseOrder> {
        if order.version != 0 {
            return Err(StoreError::Conflict(format!(
                "purchase order {} already stored",
                order.id
            )));
        }
        let mut tx = self.begin().await?;
        let mut order = order.clone();
        order.order_number = next_number(&mut tx, order.tenant_id, sequence).await?;
        order.version = 1;
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                tenant_id, id, order_number, supplier_id, location_id, status, expected_date,
                notes, created_by, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1)
            "#,
        )
        .bind(order.tenant_id.as_uuid())
        .bind(order.id.0.as_uuid())
        .bind(&order.order_number)
        .bind(order.supplier_id.0.as_uuid())
        .bind(order.location_id.0.as_uuid())
        .bind(order.status.as_str())
        .bind(order.expected_date)
        .bind(&order.notes)
        .bind(order.created_by.map(Uuid::from))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_order", e))?;

        upsert_purchase_order_lines(&mut tx, &order).await?;
        commit(tx).await?;
        Ok(order)
    }

    #[instrument(skip(self, order), fields(tenant_id = %order.tenant_id, order_number = %order.order_number), err)]
    async fn update_purchase_order(&self, order: &PurchaseOrder) -> StoreResult<u64> {
        let mut tx = self.begin().await?;
        let version = update_purchase_order_header(&mut tx, order).await?;
        commit(tx).await?;
        Ok(version)
    }

    async fn get_purchase_order(
        &self,
        tenant_id: TenantId,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        let row = sqlx::query("SELECT * FROM purchase_orders WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_purchase_order", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = decode_one(&row, rows::purchase_order)?;
        Ok(self
            .attach_purchase_order_lines(tenant_id, vec![order])
            .await?
            .pop())
    }

    async fn list_purchase_orders(
        &self,
        tenant_id: TenantId,
        status: Option<PurchaseOrderStatus>,
    ) -> StoreResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM purchase_orders
            WHERE tenant_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_purchase_orders", e))?;
        let orders = decode(&rows, rows::purchase_order)?;
        self.attach_purchase_order_lines(tenant_id, orders).await
    }

    #[instrument(
        skip(self, plan),
        fields(
            tenant_id = %plan.order.tenant_id,
            order_number = %plan.order.order_number,
            receipt_id = %plan.receipt.id
        ),
        err
    )]
    async fn commit_receipt(&self, plan: &ReceiptPlan) -> StoreResult<u64> {
        let tenant_id = plan.order.tenant_id;
        if plan.receipt.tenant_id != tenant_id {
            return Err(StoreError::TenantIsolation(
                "goods receipt and purchase order belong to different tenants".to_string(),
            ));
        }

        let mut tx = self.begin().await?;
        let version = update_purchase_order_header(&mut tx, &plan.order).await?;

        let receipt = &plan.receipt;
        sqlx::query(
            r#"
            INSERT INTO goods_receipts (
                tenant_id, id, purchase_order_id, location_id, received_by_id, notes, received_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(receipt.id.0.as_uuid())
        .bind(receipt.purchase_order_id.0.as_uuid())
        .bind(receipt.location_id.0.as_uuid())
        .bind(receipt.received_by_id.map(Uuid::from))
        .bind(&receipt.notes)
        .bind(receipt.received_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_goods_receipt", e))?;

        for (position, line) in receipt.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO goods_receipt_lines (
                    tenant_id, receipt_id, position, purchase_order_line_id, item_id,
                    received_quantity, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(receipt.id.0.as_uuid())
            .bind(position as i32)
            .bind(line.purchase_order_line_id.0.as_uuid())
            .bind(line.item_id.0.as_uuid())
            .bind(line.received_quantity)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_goods_receipt_line", e))?;
        }

        apply_posting(&mut tx, tenant_id, &plan.posting).await?;
        commit(tx).await?;
        Ok(version)
    }

    async fn list_receipts(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<GoodsReceipt>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM goods_receipts
            WHERE tenant_id = $1 AND purchase_order_id = $2
            ORDER BY received_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(order_id.0.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_receipts", e))?;
        let mut receipts = decode(&rows, rows::goods_receipt)?;

        for receipt in &mut receipts {
            let line_rows = sqlx::query(
                r#"
                SELECT * FROM goods_receipt_lines
                WHERE tenant_id = $1 AND receipt_id = $2
                ORDER BY position ASC
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(receipt.id.0.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_receipt_lines", e))?;
            receipt.lines = decode(&line_rows, rows::goods_receipt_line)?;
        }
        Ok(receipts)
    }
}

#[async_trait]
impl StockDocumentStore for PostgresStore {
    #[instrument(skip(self, transfer, posting), fields(tenant_id = %transfer.tenant_id, transfer_id = %transfer.id), err)]
    async fn commit_transfer(
        &self,
        transfer: &Transfer,
        posting: &LedgerPosting,
        sequence: &str,
    ) -> StoreResult<Transfer> {
        let mut tx = self.begin().await?;
        let mut transfer = transfer.clone();
        transfer.transfer_number = next_number(&mut tx, transfer.tenant_id, sequence).await?;
        sqlx::query(
            r#"
            INSERT INTO transfers (
                tenant_id, id, transfer_number, from_location_id, to_location_id, status,
                notes, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transfer.tenant_id.as_uuid())
        .bind(transfer.id.0.as_uuid())
        .bind(&transfer.transfer_number)
        .bind(transfer.from_location_id.0.as_uuid())
        .bind(transfer.to_location_id.0.as_uuid())
        .bind(transfer.status.as_str())
        .bind(&transfer.notes)
        .bind(transfer.created_by.map(Uuid::from))
        .bind(transfer.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transfer", e))?;

        for (position, line) in transfer.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transfer_lines (tenant_id, transfer_id, position, item_id, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(transfer.tenant_id.as_uuid())
            .bind(transfer.id.0.as_uuid())
            .bind(position as i32)
            .bind(line.item_id.0.as_uuid())
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_transfer_line", e))?;
        }

        apply_posting(&mut tx, transfer.tenant_id, posting).await?;
        commit(tx).await?;
        Ok(transfer)
    }

    #[instrument(skip(self, adjustment, posting), fields(tenant_id = %adjustment.tenant_id, adjustment_id = %adjustment.id), err)]
    async fn commit_adjustment(
        &self,
        adjustment: &Adjustment,
        posting: &LedgerPosting,
        sequence: &str,
    ) -> StoreResult<Adjustment> {
        let mut tx = self.begin().await?;
        let mut adjustment = adjustment.clone();
        adjustment.adjustment_number = next_number(&mut tx, adjustment.tenant_id, sequence).await?;
        sqlx::query(
            r#"
            INSERT INTO adjustments (
                tenant_id, id, adjustment_number, location_id, adjustment_type, reason,
                created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(adjustment.tenant_id.as_uuid())
        .bind(adjustment.id.0.as_uuid())
        .bind(&adjustment.adjustment_number)
        .bind(adjustment.location_id.0.as_uuid())
        .bind(adjustment.adjustment_type.as_str())
        .bind(&adjustment.reason)
        .bind(adjustment.created_by.map(Uuid::from))
        .bind(adjustment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_adjustment", e))?;

        for (position, line) in adjustment.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO adjustment_lines (tenant_id, adjustment_id, position, item_id, quantity_delta)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(adjustment.tenant_id.as_uuid())
            .bind(adjustment.id.0.as_uuid())
            .bind(position as i32)
            .bind(line.item_id.0.as_uuid())
            .bind(line.quantity_delta)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_adjustment_line", e))?;
        }

        apply_posting(&mut tx, adjustment.tenant_id, posting).await?;
        commit(tx).await?;
        Ok(adjustment)
    }

    async fn get_transfer(
        &self,
        tenant_id: TenantId,
        id: TransferId,
    ) -> StoreResult<Option<Transfer>> {
        let row = sqlx::query("SELECT * FROM transfers WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_transfer", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut transfer = decode_one(&row, rows::transfer)?;

        let line_rows = sqlx::query(
            r#"
            SELECT * FROM transfer_lines
            WHERE tenant_id = $1 AND transfer_id = $2
            ORDER BY position ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_transfer_lines", e))?;
        transfer.lines = decode(&line_rows, rows::transfer_line)?;
        Ok(Some(transfer))
    }

    async fn get_adjustment(
        &self,
        tenant_id: TenantId,
        id: AdjustmentId,
    ) -> StoreResult<Option<Adjustment>> {
        let row = sqlx::query("SELECT * FROM adjustments WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_adjustment", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut adjustment = decode_one(&row, rows::adjustment)?;

        let line_rows = sqlx::query(
            r#"
            SELECT * FROM adjustment_lines
            WHERE tenant_id = $1 AND adjustment_id = $2
            ORDER BY position ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_adjustment_lines", e))?;
        adjustment.lines = decode(&line_rows, rows::adjustment_line)?;
        Ok(Some(adjustment))
    }
}

#[async_trait]
impl SalesStore for PostgresStore {
    #[instrument(skip(self, order, posting), fields(tenant_id = %order.tenant_id, order_id = %order.id), err)]
    async fn insert_sales_order(
        &self,
        order: &SalesOrder,
        sequence: &str,
        posting: Option<&LedgerPosting>,
    ) -> StoreResult<SalesOrder> {
        if order.version != 0 {
            return Err(StoreError::Conflict(format!(
                "sales order {} already stored",
                order.id
            )));
        }
        let mut tx = self.begin().await?;
        let mut order = order.clone();
        order.order_number = next_number(&mut tx, order.tenant_id, sequence).await?;
        order.version = 1;
        sqlx::query(
            r#"
            INSERT INTO sales_orders (
                tenant_id, id, order_number, channel, customer_id, location_id, status,
                payment_status, payment_method, amount_paid, subtotal, tax_amount,
                shipping_cost, discount, total, notes, created_by, created_at, updated_at,
                version
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, 1
            )
            "#,
        )
        .bind(order.tenant_id.as_uuid())
        .bind(order.id.0.as_uuid())
        .bind(&order.order_number)
        .bind(order.channel.as_str())
        .bind(order.customer_id.map(|id| *id.0.as_uuid()))
        .bind(order.location_id.0.as_uuid())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.payment_method.map(|m| m.as_str()))
        .bind(order.amount_paid)
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.shipping_cost)
        .bind(order.discount)
        .bind(order.total)
        .bind(&order.notes)
        .bind(order.created_by.map(Uuid::from))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sales_order", e))?;

        insert_sales_order_lines(&mut tx, &order).await?;
        if let Some(posting) = posting {
            apply_posting(&mut tx, order.tenant_id, posting).await?;
        }
        commit(tx).await?;
        Ok(order)
    }

    #[instrument(skip(self, order, posting), fields(tenant_id = %order.tenant_id, order_number = %order.order_number), err)]
    async fn update_sales_order(
        &self,
        order: &SalesOrder,
        posting: Option<&LedgerPosting>,
    ) -> StoreResult<u64> {
        let mut tx = self.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE sales_orders
            SET status = $4, payment_status = $5, payment_method = $6, amount_paid = $7,
                notes = $8, updated_at = $9, version = version + 1
            WHERE tenant_id = $1 AND id = $2 AND version = $3
            "#,
        )
        .bind(order.tenant_id.as_uuid())
        .bind(order.id.0.as_uuid())
        .bind(version_param(order.version)?)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.payment_method.map(|m| m.as_str()))
        .bind(order.amount_paid)
        .bind(&order.notes)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_sales_order", e))?;

        if updated.rows_affected() == 0 {
            return Err(stale_document(
                &mut tx,
                "sales_orders",
                order.tenant_id,
                *order.id.0.as_uuid(),
                &order.order_number,
            )
            .await);
        }
        if let Some(posting) = posting {
            apply_posting(&mut tx, order.tenant_id, posting).await?;
        }
        commit(tx).await?;
        Ok(order.version + 1)
    }

    async fn get_sales_order(
        &self,
        tenant_id: TenantId,
        id: SalesOrderId,
    ) -> StoreResult<Option<SalesOrder>> {
        let row = sqlx::query("SELECT * FROM sales_orders WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sales_order", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = decode_one(&row, rows::sales_order)?;
        Ok(self.attach_sales_order_lines(tenant_id, vec![order]).await?.pop())
    }

    async fn list_sales_orders(
        &self,
        tenant_id: TenantId,
        filter: &SalesOrderFilter,
    ) -> StoreResult<Vec<SalesOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sales_orders
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR channel = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.channel.map(|c| c.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sales_orders", e))?;
        let orders = decode(&rows, rows::sales_order)?;
        self.attach_sales_order_lines(tenant_id, orders).await
    }
}

/// Map sqlx errors to [`StoreError`].
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("22003") => StoreError::Rejected(DomainError::validation(format!(
                    "quantity out of range in {operation}"
                ))),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {operation}: {e}")),
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
