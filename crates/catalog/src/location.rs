use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, TenantId, typed_id};

typed_id!(
    /// Stock-holding location identifier.
    LocationId
);

/// Kind of stock-holding site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Warehouse,
    Shop,
    Virtual,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Warehouse => "WAREHOUSE",
            LocationType::Shop => "SHOP",
            LocationType::Virtual => "VIRTUAL",
        }
    }
}

impl core::str::FromStr for LocationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAREHOUSE" => Ok(LocationType::Warehouse),
            "SHOP" => Ok(LocationType::Shop),
            "VIRTUAL" => Ok(LocationType::Virtual),
            other => Err(DomainError::validation(format!("unknown location type: {other}"))),
        }
    }
}

/// A physical or virtual site holding stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub tenant_id: TenantId,
    pub name: String,
    pub location_type: LocationType,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub location_type: LocationType,
    #[serde(default)]
    pub address: Option<String>,
}

impl Location {
    pub fn create(
        tenant_id: TenantId,
        id: LocationId,
        input: NewLocation,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("location name cannot be empty"));
        }

        Ok(Self {
            id,
            tenant_id,
            name,
            location_type: input.location_type,
            address: input.address,
            active: true,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_a_name() {
        let err = Location::create(
            TenantId::new(),
            LocationId::generate(),
            NewLocation {
                name: " ".into(),
                location_type: LocationType::Shop,
                address: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn location_type_string_round_trip() {
        for t in [LocationType::Warehouse, LocationType::Shop, LocationType::Virtual] {
            assert_eq!(t.as_str().parse::<LocationType>().unwrap(), t);
        }
        assert!("DEPOT".parse::<LocationType>().is_err());
    }
}
