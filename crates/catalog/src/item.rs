use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::money::ensure_non_negative;
use stockroom_core::{DomainError, DomainResult, TenantId, round_money, typed_id};

typed_id!(
    /// Item identifier (tenant-scoped via `tenant_id`).
    ItemId
);

/// Unit of measure applied when none is given.
pub const DEFAULT_UNIT: &str = "pcs";

/// Product master data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub tenant_id: TenantId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub min_stock_level: i64,
    pub max_stock_level: Option<i64>,
    pub is_serial_tracked: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    #[serde(default)]
    pub min_stock_level: i64,
    #[serde(default)]
    pub max_stock_level: Option<i64>,
    #[serde(default)]
    pub is_serial_tracked: bool,
}

/// Partial update. `None` leaves the field untouched; the sku is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub min_stock_level: Option<i64>,
    #[serde(default)]
    pub max_stock_level: Option<i64>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Item {
    /// Validate the input and build a new active item.
    pub fn create(
        tenant_id: TenantId,
        id: ItemId,
        input: NewItem,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let sku = input.sku.trim().to_string();
        if sku.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }

        let unit = input
            .unit
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());

        let item = Self {
            id,
            tenant_id,
            sku,
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            unit,
            cost_price: round_money(input.cost_price),
            selling_price: round_money(input.selling_price),
            min_stock_level: input.min_stock_level,
            max_stock_level: input.max_stock_level,
            is_serial_tracked: input.is_serial_tracked,
            active: true,
            created_at: now,
            updated_at: now,
        };
        item.validate()?;
        Ok(item)
    }

    /// Apply a partial update, re-validating the result.
    ///
    /// On error `self` is left unchanged.
    pub fn apply_update(&mut self, update: ItemUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            next.description = Some(description);
        }
        if let Some(category) = update.category {
            next.category = Some(category);
        }
        if let Some(unit) = update.unit {
            next.unit = unit.trim().to_string();
        }
        if let Some(cost) = update.cost_price {
            next.cost_price = round_money(cost);
        }
        if let Some(price) = update.selling_price {
            next.selling_price = round_money(price);
        }
        if let Some(min) = update.min_stock_level {
            next.min_stock_level = min;
        }
        if let Some(max) = update.max_stock_level {
            next.max_stock_level = Some(max);
        }
        if let Some(active) = update.active {
            next.active = active;
        }

        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    fn validate(&self) -> DomainResult<()> {
        if self.name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.unit.is_empty() {
            return Err(DomainError::validation("unit cannot be empty"));
        }
        ensure_non_negative("cost_price", self.cost_price)?;
        ensure_non_negative("selling_price", self.selling_price)?;
        if self.min_stock_level < 0 {
            return Err(DomainError::validation("min_stock_level cannot be negative"));
        }
        if let Some(max) = self.max_stock_level {
            if max < self.min_stock_level {
                return Err(DomainError::validation(
                    "max_stock_level cannot be below min_stock_level",
                ));
            }
        }
        Ok(())
    }

    /// Whether the item can be put on new purchase or sales documents.
    pub fn can_be_traded(&self) -> bool {
        self.active
    }

    /// Classify an on-hand total against this item's stock levels.
    pub fn stock_status(&self, on_hand: i64) -> StockStatus {
        StockStatus::classify(on_hand, self.min_stock_level, self.max_stock_level)
    }

    /// Valuation of `quantity` units at cost.
    pub fn valuation(&self, quantity: i64) -> Decimal {
        round_money(self.cost_price * Decimal::from(quantity))
    }
}

/// Stock level classification used by low-stock reporting and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    OutOfStock,
    Low,
    Normal,
    Overstocked,
}

impl StockStatus {
    pub fn classify(on_hand: i64, min: i64, max: Option<i64>) -> Self {
        if on_hand <= 0 {
            StockStatus::OutOfStock
        } else if on_hand < min {
            StockStatus::Low
        } else if max.is_some_and(|max| on_hand > max) {
            StockStatus::Overstocked
        } else {
            StockStatus::Normal
        }
    }

    /// Below the minimum level (including empty).
    pub fn needs_reorder(self) -> bool {
        matches!(self, StockStatus::OutOfStock | StockStatus::Low)
    }
}
