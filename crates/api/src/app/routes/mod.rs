use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use stockroom_auth::Permission;
use stockroom_core::DomainError;
use stockroom_infra::services::{Caller, ServiceError, ServiceResult};

use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext, caller};

pub mod catalog;
pub mod inventory;
pub mod parties;
pub mod purchasing;
pub mod reports;
pub mod sales;
pub mod system;

/// Handler result; both arms are complete responses.
pub type ApiResult = Result<Response, Response>;

/// Router for all authenticated, tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/catalog", catalog::router())
        .nest("/parties", parties::router())
        .nest("/inventory", inventory::router())
        .nest("/purchasing", purchasing::router())
        .nest("/sales", sales::router())
        .nest("/reports", reports::router())
}

pub(crate) fn ok<T: Serialize>(body: T) -> Response {
    Json(body).into_response()
}

pub(crate) fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub(crate) fn failed(err: ServiceError) -> Response {
    errors::service_error_to_response(err)
}

/// Shared shape of the `POST /…/:id/<action>` endpoints: check the
/// permission, parse the id, run the action.
pub(crate) async fn transition<Id, T, F, Fut>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    raw_id: &str,
    permission: &Permission,
    action: F,
) -> ApiResult
where
    Id: core::str::FromStr<Err = DomainError>,
    T: Serialize,
    F: FnOnce(Caller, Id) -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    require(tenant, principal, permission)?;
    let id: Id = dto::parse_id(raw_id)?;
    let body = action(caller(tenant, principal), id).await.map_err(failed)?;
    Ok(ok(body))
}
