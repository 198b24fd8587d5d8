use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use stockroom_auth::policy;
use stockroom_infra::services::Services;
use stockroom_parties::{NewParty, PartyId, PartyKind};

use super::{ApiResult, created, failed, ok};
use crate::app::dto::parse_id;
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext, caller};

pub fn router() -> Router {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/:id", get(get_party))
        .route("/:id/suspend", post(suspend_party))
}

pub async fn create_customer(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewParty>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PARTIES_WRITE)?;
    let party = services
        .create_customer(caller(&tenant, &principal), body)
        .await
        .map_err(failed)?;
    Ok(created(party))
}

pub async fn create_supplier(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewParty>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PARTIES_WRITE)?;
    let party = services
        .create_supplier(caller(&tenant, &principal), body)
        .await
        .map_err(failed)?;
    Ok(created(party))
}

pub async fn suspend_party(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PARTIES_WRITE)?;
    let id: PartyId = parse_id(&id)?;
    let party = services
        .suspend_party(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(party))
}

pub async fn get_party(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PARTIES_READ)?;
    let id: PartyId = parse_id(&id)?;
    let party = services
        .get_party(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(party))
}

pub async fn list_customers(
    services: Extension<Services>,
    tenant: Extension<TenantContext>,
    principal: Extension<PrincipalContext>,
) -> ApiResult {
    list_by_kind(services, tenant, principal, PartyKind::Customer).await
}

pub async fn list_suppliers(
    services: Extension<Services>,
    tenant: Extension<TenantContext>,
    principal: Extension<PrincipalContext>,
) -> ApiResult {
    list_by_kind(services, tenant, principal, PartyKind::Supplier).await
}

async fn list_by_kind(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    kind: PartyKind,
) -> ApiResult {
    require(&tenant, &principal, &policy::PARTIES_READ)?;
    let parties = services
        .list_parties(caller(&tenant, &principal), Some(kind))
        .await
        .map_err(failed)?;
    Ok(ok(parties))
}
