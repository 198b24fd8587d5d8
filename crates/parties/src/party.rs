use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, TenantId, typed_id};
use stockroom_events::Event;

typed_id!(
    /// Party identifier (tenant-scoped via `tenant_id`).
    PartyId
);

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Customer => "CUSTOMER",
            PartyKind::Supplier => "SUPPLIER",
        }
    }
}

impl core::str::FromStr for PartyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUSTOMER" => Ok(PartyKind::Customer),
            "SUPPLIER" => Ok(PartyKind::Supplier),
            other => Err(DomainError::validation(format!("unknown party kind: {other}"))),
        }
    }
}

/// Party status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyStatus {
    Active,
    Suspended,
}

impl PartyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyStatus::Active => "ACTIVE",
            PartyStatus::Suspended => "SUSPENDED",
        }
    }
}

impl core::str::FromStr for PartyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(PartyStatus::Active),
            "SUSPENDED" => Ok(PartyStatus::Suspended),
            other => Err(DomainError::validation(format!("unknown party status: {other}"))),
        }
    }
}

/// Contact information for a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A counterparty: the customer on a sales order or the supplier on a
/// purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub tenant_id: TenantId,
    pub kind: PartyKind,
    pub name: String,
    pub contact: ContactInfo,
    pub status: PartyStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParty {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

impl Party {
    pub fn register(
        tenant_id: TenantId,
        id: PartyId,
        kind: PartyKind,
        input: NewParty,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id,
            tenant_id,
            kind,
            name,
            contact: input.contact,
            status: PartyStatus::Active,
            created_at: now,
        })
    }

    pub fn suspend(&mut self) -> DomainResult<()> {
        if self.status == PartyStatus::Suspended {
            return Err(DomainError::conflict("party is already suspended"));
        }
        self.status = PartyStatus::Suspended;
        Ok(())
    }

    /// Suspended parties cannot be used on new orders.
    pub fn can_transact(&self) -> bool {
        self.status == PartyStatus::Active
    }

    /// Require an active party of the given kind.
    pub fn ensure_usable_as(&self, kind: PartyKind) -> DomainResult<()> {
        if self.kind != kind {
            return Err(DomainError::validation(format!(
                "party {} is not a {}",
                self.id,
                kind.as_str().to_lowercase()
            )));
        }
        if !self.can_transact() {
            return Err(DomainError::validation(format!("party {} is suspended", self.id)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartyEvent {
    PartyRegistered {
        tenant_id: TenantId,
        party_id: PartyId,
        kind: PartyKind,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    PartySuspended {
        tenant_id: TenantId,
        party_id: PartyId,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered { .. } => "parties.party.registered",
            PartyEvent::PartySuspended { .. } => "parties.party.suspended",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered { occurred_at, .. }
            | PartyEvent::PartySuspended { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier() -> Party {
        Party::register(
            TenantId::new(),
            PartyId::generate(),
            PartyKind::Supplier,
            NewParty {
                name: "Acme Supplies".to_string(),
                contact: ContactInfo {
                    email: Some("orders@acme.test".to_string()),
                    phone: None,
                    address: None,
                },
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn register_rejects_empty_name() {
        let err = Party::register(
            TenantId::new(),
            PartyId::generate(),
            PartyKind::Customer,
            NewParty {
                name: "   ".to_string(),
                contact: ContactInfo::default(),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn suspended_party_cannot_transact() {
        let mut party = supplier();
        assert!(party.ensure_usable_as(PartyKind::Supplier).is_ok());

        party.suspend().unwrap();

        assert!(!party.can_transact());
        assert!(party.ensure_usable_as(PartyKind::Supplier).is_err());
        assert!(matches!(party.suspend(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn kind_must_match() {
        let party = supplier();
        let err = party.ensure_usable_as(PartyKind::Customer).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("customer")));
    }
}
