use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::get,
};

use stockroom_auth::policy;
use stockroom_catalog::{ItemId, ItemUpdate, LocationId, NewItem, NewLocation};
use stockroom_infra::services::Services;

use super::{ApiResult, created, failed, ok};
use crate::app::dto::parse_id;
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext, caller};

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).patch(update_item))
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/:id", get(get_location))
}

pub async fn create_item(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewItem>,
) -> ApiResult {
    require(&tenant, &principal, &policy::CATALOG_ITEMS_WRITE)?;
    let item = services
        .create_item(caller(&tenant, &principal), body)
        .await
        .map_err(failed)?;
    Ok(created(item))
}

pub async fn update_item(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<ItemUpdate>,
) -> ApiResult {
    require(&tenant, &principal, &policy::CATALOG_ITEMS_WRITE)?;
    let id: ItemId = parse_id(&id)?;
    let item = services
        .update_item(caller(&tenant, &principal), id, body)
        .await
        .map_err(failed)?;
    Ok(ok(item))
}

pub async fn get_item(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::CATALOG_READ)?;
    let id: ItemId = parse_id(&id)?;
    let item = services
        .get_item(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(item))
}

pub async fn list_items(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&tenant, &principal, &policy::CATALOG_READ)?;
    let items = services
        .list_items(caller(&tenant, &principal))
        .await
        .map_err(failed)?;
    Ok(ok(items))
}

pub async fn create_location(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewLocation>,
) -> ApiResult {
    require(&tenant, &principal, &policy::CATALOG_LOCATIONS_WRITE)?;
    let location = services
        .create_location(caller(&tenant, &principal), body)
        .await
        .map_err(failed)?;
    Ok(created(location))
}

pub async fn get_location(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::CATALOG_READ)?;
    let id: LocationId = parse_id(&id)?;
    let location = services
        .get_location(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(location))
}

pub async fn list_locations(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&tenant, &principal, &policy::CATALOG_READ)?;
    let locations = services
        .list_locations(caller(&tenant, &principal))
        .await
        .map_err(failed)?;
    Ok(ok(locations))
}
