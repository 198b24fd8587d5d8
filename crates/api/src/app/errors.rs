use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_core::DomainError;
use stockroom_infra::services::ServiceError;
use stockroom_infra::store::StoreError;

/// Status and error code for a service failure.
pub fn classify(err: &ServiceError) -> (StatusCode, &'static str) {
    match err {
        ServiceError::Domain(domain) => match domain {
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
            DomainError::InsufficientStock { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock")
            }
            DomainError::OverReceipt { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "over_receipt"),
            DomainError::SameLocation => (StatusCode::UNPROCESSABLE_ENTITY, "same_location"),
            DomainError::InvariantViolation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation")
            }
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            DomainError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized"),
        },
        ServiceError::Store(StoreError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
        ServiceError::Store(StoreError::TenantIsolation(_)) => {
            (StatusCode::FORBIDDEN, "tenant_isolation")
        }
        ServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        ServiceError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized"),
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let (status, code) = classify(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
