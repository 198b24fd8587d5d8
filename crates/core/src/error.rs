//! Domain error model.

use thiserror::Error;

use crate::id::AggregateId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// stock rules, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input (empty lines, non-positive quantity, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An operation would drive on-hand or available quantity negative.
    #[error(
        "insufficient stock for item {item_id} at location {location_id} \
         (requested {requested}, available {available})"
    )]
    InsufficientStock {
        item_id: AggregateId,
        location_id: AggregateId,
        requested: i64,
        available: i64,
    },

    /// Cumulative received quantity would exceed the ordered quantity.
    #[error("over-receipt on line {line_no}: ordered {ordered}, would receive {received}")]
    OverReceipt {
        line_no: u32,
        ordered: i64,
        received: i64,
    },

    /// Transfer source equals destination.
    #[error("source and destination location must differ")]
    SameLocation,

    /// A domain invariant was violated (e.g. illegal status transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced entity does not exist within the caller's tenant.
    #[error("{0} not found")]
    NotFound(String),

    /// A conflict occurred (duplicate key, stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn insufficient_stock(
        item_id: AggregateId,
        location_id: AggregateId,
        requested: i64,
        available: i64,
    ) -> Self {
        Self::InsufficientStock {
            item_id,
            location_id,
            requested,
            available,
        }
    }
}
