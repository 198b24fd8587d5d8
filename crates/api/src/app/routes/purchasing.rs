use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::{get, post},
};

use stockroom_auth::policy;
use stockroom_infra::services::Services;
use stockroom_purchasing::{
    CreatePurchaseOrderRequest, PurchaseLineRequest, PurchaseOrderId,
};

use super::{ApiResult, created, failed, ok, transition};
use crate::app::dto::{PurchaseOrderQuery, ReceiveGoodsBody, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext, caller};

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/lines", post(add_line))
        .route("/orders/:id/submit", post(submit_order))
        .route("/orders/:id/approve", post(approve_order))
        .route("/orders/:id/send", post(send_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/close", post(close_order))
        .route("/orders/:id/receipts", get(list_receipts).post(receive_goods))
}

pub async fn create_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreatePurchaseOrderRequest>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PURCHASING_ORDERS_WRITE)?;
    let order = services
        .create_purchase_order(caller(&tenant, &principal), body)
        .await
        .map_err(failed)?;
    Ok(created(order))
}

pub async fn add_line(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<PurchaseLineRequest>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PURCHASING_ORDERS_WRITE)?;
    let id: PurchaseOrderId = parse_id(&id)?;
    let order = services
        .add_purchase_order_line(caller(&tenant, &principal), id, body)
        .await
        .map_err(failed)?;
    Ok(ok(order))
}

pub async fn submit_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::PURCHASING_ORDERS_WRITE,
        |c, id: PurchaseOrderId| async move { services.submit_purchase_order(c, id).await },
    )
    .await
}

pub async fn approve_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::PURCHASING_ORDERS_APPROVE,
        |c, id: PurchaseOrderId| async move { services.approve_purchase_order(c, id).await },
    )
    .await
}

pub async fn send_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::PURCHASING_ORDERS_WRITE,
        |c, id: PurchaseOrderId| async move { services.send_purchase_order(c, id).await },
    )
    .await
}

pub async fn cancel_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::PURCHASING_ORDERS_WRITE,
        |c, id: PurchaseOrderId| async move { services.cancel_purchase_order(c, id).await },
    )
    .await
}

pub async fn close_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::PURCHASING_ORDERS_WRITE,
        |c, id: PurchaseOrderId| async move { services.close_purchase_order(c, id).await },
    )
    .await
}

pub async fn receive_goods(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<ReceiveGoodsBody>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PURCHASING_RECEIPTS_CREATE)?;
    let id: PurchaseOrderId = parse_id(&id)?;
    let outcome = services
        .receive_goods(caller(&tenant, &principal), body.into_request(id))
        .await
        .map_err(failed)?;
    Ok(created(outcome))
}

pub async fn list_receipts(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PURCHASING_READ)?;
    let id: PurchaseOrderId = parse_id(&id)?;
    let receipts = services
        .list_receipts(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(receipts))
}

pub async fn get_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PURCHASING_READ)?;
    let id: PurchaseOrderId = parse_id(&id)?;
    let order = services
        .get_purchase_order(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(order))
}

pub async fn list_orders(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<PurchaseOrderQuery>,
) -> ApiResult {
    require(&tenant, &principal, &policy::PURCHASING_READ)?;
    let orders = services
        .list_purchase_orders(caller(&tenant, &principal), query.status)
        .await
        .map_err(failed)?;
    Ok(ok(orders))
}
