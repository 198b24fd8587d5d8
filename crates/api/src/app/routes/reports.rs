use axum::{
    Router,
    extract::{Extension, Query},
    routing::get,
};

use stockroom_auth::policy;
use stockroom_infra::services::{AdjustmentReportFilter, Services};

use super::{ApiResult, failed, ok};
use crate::app::dto::PeriodQuery;
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext, caller};

pub fn router() -> Router {
    Router::new()
        .route("/sales", get(sales_summary))
        .route("/net-adjustment", get(net_adjustment))
        .route("/low-stock", get(low_stock))
        .route("/valuation", get(valuation))
}

pub async fn sales_summary(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult {
    require(&tenant, &principal, &policy::REPORTS_READ)?;
    let summary = services
        .sales_summary(caller(&tenant, &principal), period.from, period.to)
        .await
        .map_err(failed)?;
    Ok(ok(summary))
}

pub async fn net_adjustment(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<AdjustmentReportFilter>,
) -> ApiResult {
    require(&tenant, &principal, &policy::REPORTS_READ)?;
    let net = services
        .net_adjustment(caller(&tenant, &principal), filter)
        .await
        .map_err(failed)?;
    Ok(ok(net))
}

pub async fn low_stock(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&tenant, &principal, &policy::REPORTS_READ)?;
    let lines = services
        .low_stock_report(caller(&tenant, &principal))
        .await
        .map_err(failed)?;
    Ok(ok(lines))
}

pub async fn valuation(
    Extension(services): Extension<Services>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&tenant, &principal, &policy::REPORTS_READ)?;
    let valuation = services
        .inventory_valuation(caller(&tenant, &principal))
        .await
        .map_err(failed)?;
    Ok(ok(valuation))
}
