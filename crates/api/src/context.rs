use stockroom_auth::{PrincipalId, Role};
use stockroom_core::TenantId;
use stockroom_infra::services::Caller;

/// Tenant context for a request.
///
/// Taken from the verified token; never from the request body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request (authenticated identity + roles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>) -> Self {
        Self { principal_id, roles }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

/// The service-layer caller for this request.
pub fn caller(tenant: &TenantContext, principal: &PrincipalContext) -> Caller {
    Caller::new(tenant.tenant_id(), Some(principal.principal_id().into()))
}
