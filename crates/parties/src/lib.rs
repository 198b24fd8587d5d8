//! Parties domain module (customers and suppliers).
//!
//! Business rules for counterparties, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod party;

pub use party::{ContactInfo, NewParty, Party, PartyEvent, PartyId, PartyKind, PartyStatus};
