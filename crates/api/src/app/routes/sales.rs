use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::{get, post},
};

use stockroom_auth::policy;
use stockroom_infra::services::Services;
use stockroom_infra::store::SalesOrderFilter;
use stockroom_sales::{SalesChannel, SalesOrderId};

use super::{ApiResult, created, failed, ok, transition};
use crate::app::dto::{PaymentRequest, SalesOrderBody, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext, caller};

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/confirm", post(confirm_order))
        .route("/orders/:id/process", post(process_order))
        .route("/orders/:id/ship", post(ship_order))
        .route("/orders/:id/deliver", post(deliver_order))
        .route("/orders/:id/complete", post(complete_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/return", post(return_order))
        .route("/orders/:id/payments", post(record_payment))
        .route("/pos/checkout", post(checkout))
}

/// Standard-channel order; stock is reserved on confirmation.
pub async fn create_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<SalesOrderBody>,
) -> ApiResult {
    require(&tenant, &principal, &policy::SALES_ORDERS_WRITE)?;
    let order = services
        .create_sales_order(
            caller(&tenant, &principal),
            body.into_request(SalesChannel::Standard),
        )
        .await
        .map_err(failed)?;
    Ok(created(order))
}

/// Point-of-sale sale: stock leaves the location immediately.
pub async fn checkout(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<SalesOrderBody>,
) -> ApiResult {
    require(&tenant, &principal, &policy::SALES_POS_CHECKOUT)?;
    let order = services
        .checkout(caller(&tenant, &principal), body.into_request(SalesChannel::Pos))
        .await
        .map_err(failed)?;
    Ok(created(order))
}

pub async fn confirm_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::SALES_ORDERS_WRITE,
        |c, id: SalesOrderId| async move { services.confirm_sales_order(c, id).await },
    )
    .await
}

pub async fn process_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::SALES_ORDERS_WRITE,
        |c, id: SalesOrderId| async move { services.start_processing_sales_order(c, id).await },
    )
    .await
}

pub async fn ship_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::SALES_ORDERS_WRITE,
        |c, id: SalesOrderId| async move { services.ship_sales_order(c, id).await },
    )
    .await
}

pub async fn deliver_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::SALES_ORDERS_WRITE,
        |c, id: SalesOrderId| async move { services.deliver_sales_order(c, id).await },
    )
    .await
}

pub async fn complete_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::SALES_ORDERS_WRITE,
        |c, id: SalesOrderId| async move { services.complete_sales_order(c, id).await },
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
        &policy::SALES_ORDERS_WRITE,
        |c, id: SalesOrderId| async move { services.cancel_sales_order(c, id).await },
    )
    .await
}

pub async fn return_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    transition(
        &tenant,
        &principal,
        &id,
        &policy::SALES_ORDERS_WRITE,
        |c, id: SalesOrderId| async move { services.return_sales_order(c, id).await },
    )
    .await
}

pub async fn record_payment(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<PaymentRequest>,
) -> ApiResult {
    require(&tenant, &principal, &policy::SALES_ORDERS_WRITE)?;
    let id: SalesOrderId = parse_id(&id)?;
    let order = services
        .record_payment(caller(&tenant, &principal), id, body.amount, body.payment_method)
        .await
        .map_err(failed)?;
    Ok(ok(order))
}

pub async fn get_order(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, &policy::SALES_READ)?;
    let id: SalesOrderId = parse_id(&id)?;
    let order = services
        .get_sales_order(caller(&tenant, &principal), id)
        .await
        .map_err(failed)?;
    Ok(ok(order))
}

pub async fn list_orders(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<SalesOrderFilter>,
) -> ApiResult {
    require(&tenant, &principal, &policy::SALES_READ)?;
    let orders = services
        .list_sales_orders(caller(&tenant, &principal), filter)
        .await
        .map_err(failed)?;
    Ok(ok(orders))
}
