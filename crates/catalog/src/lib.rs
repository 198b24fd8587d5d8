//! Catalog domain module.
//!
//! Item (product master data) and Location definitions, with the validation
//! rules applied on create/update. Pure domain logic: no IO, no storage.

pub mod events;
pub mod item;
pub mod location;

pub use events::CatalogEvent;
pub use item::{Item, ItemId, ItemUpdate, NewItem, StockStatus};
pub use location::{Location, LocationId, LocationType, NewLocation};
