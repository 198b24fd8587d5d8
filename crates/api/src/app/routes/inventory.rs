use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::{get, post},
};

use stockroom_auth::policy;
use stockroom_catalog::ItemId;
use stockroom_infra::services::Services;
use stockroom_infra::store::{LevelFilter, MovementFilter};
use stockroom_inventory::{AdjustmentId, CreateAdjustmentRequest, CreateTransferRequest, TransferId};

use super::{ApiResult, created, failed, ok};
use crate::app::dto::{AvailablePath, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext, caller};

pub fn router() -> Router {
    Router::new()
        .route("/levels", get(list_levels))
        .route("/available/:item_id/:location_id", get(available))
        .route("/on-hand/:item_id", get(on_hand))
        .route("/movements", get(list_movements))
        .route("/transfers", post(create_transfer))
        .route("/transfers/:id", get(get_transfer))
        .route("/adjustments", post(create_adjustment))
        .route("/adjustments/:id", get(get_adjustment))
}

pub async fn list_levels(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<LevelFilter>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_READ)?;
    let levels = services
        .list_levels(caller(&tenant, &principal), filter)
        .await
        .map_err(failed)?;
    Ok(ok(levels))
}

pub async fn available(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<AvailablePath>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_READ)?;
    let (item_id, location_id) = path.parse()?;
    let available = services
        .available_quantity(caller(&tenant, &principal), item_id, location_id)
        .await
        .map_err(failed)?;
    Ok(ok(serde_json::json!({
        "item_id": item_id,
        "location_id": location_id,
        "available": available,
    })))
}

pub async fn on_hand(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(item_id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_READ)?;
    let item_id: ItemId = parse_id(&item_id)?;
    let on_hand = services
        .total_on_hand(caller(&tenant, &principal), item_id)
        .await
        .map_err(failed)?;
    Ok(ok(serde_json::json!({ "item_id": item_id, "on_hand": on_hand })))
}

pub async fn list_movements(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<MovementFilter>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_READ)?;
    let movements = services
        .list_movements(caller(&tenant, &principal), filter)
        .await
        .map_err(failed)?;
    Ok(ok(movements))
}

pub async fn create_transfer(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateTransferRequest>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_TRANSFERS_CREATE)?;
    let transfer = services
        .create_transfer(caller(&tenant, &principal), body)
        .await
        .map_err(failed)?;
    Ok(created(transfer))
}

pub async fn get_transfer(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_READ)?;
    let id: TransferId = parse_id(&id)?;
    let transfer = services
        .get_transfer(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(transfer))
}

pub async fn create_adjustment(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateAdjustmentRequest>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_ADJUSTMENTS_CREATE)?;
    let adjustment = services
        .create_adjustment(caller(&tenant, &principal), body)
        .await
        .map_err(failed)?;
    Ok(created(adjustment))
}

pub async fn get_adjustment(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::INVENTORY_READ)?;
    let id: AdjustmentId = parse_id(&id)?;
    let adjustment = services
        .get_adjustment(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(adjustment))
}
