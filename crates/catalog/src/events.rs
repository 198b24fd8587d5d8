use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::TenantId;
use stockroom_events::Event;

use crate::item::ItemId;
use crate::location::{LocationId, LocationType};

/// Facts published after catalog changes are committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    ItemCreated {
        tenant_id: TenantId,
        item_id: ItemId,
        sku: String,
        occurred_at: DateTime<Utc>,
    },
    ItemUpdated {
        tenant_id: TenantId,
        item_id: ItemId,
        occurred_at: DateTime<Utc>,
    },
    LocationCreated {
        tenant_id: TenantId,
        location_id: LocationId,
        location_type: LocationType,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ItemCreated { .. } => "catalog.item.created",
            CatalogEvent::ItemUpdated { .. } => "catalog.item.updated",
            CatalogEvent::LocationCreated { .. } => "catalog.location.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::ItemCreated { occurred_at, .. }
            | CatalogEvent::ItemUpdated { occurred_at, .. }
            | CatalogEvent::LocationCreated { occurred_at, .. } => *occurred_at,
        }
    }
}
