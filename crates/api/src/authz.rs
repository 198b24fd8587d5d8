//! Permission guard run by every mutating handler before it calls a service.

use axum::http::StatusCode;
use axum::response::Response;

use stockroom_auth::{Permission, Principal, membership_for};

use crate::app::errors;
use crate::context::{PrincipalContext, TenantContext};

/// Check `permission` for the request principal within its tenant.
pub fn require(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    permission: &Permission,
) -> Result<(), Response> {
    let resolved = Principal {
        principal_id: principal.principal_id(),
        active_tenant_id: tenant.tenant_id(),
        membership: membership_for(tenant.tenant_id(), principal.roles()),
    };

    stockroom_auth::authorize(&resolved, permission).map_err(|e| {
        tracing::debug!(
            principal_id = %principal.principal_id(),
            permission = permission.as_str(),
            "permission denied"
        );
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
