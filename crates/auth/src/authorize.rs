use thiserror::Error;

use stockroom_core::TenantId;

use crate::{Permission, PrincipalId, TenantMembership};

/// A fully resolved principal for authorization decisions.
///
/// Built from verified claims plus the role policy; no storage involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal within its active tenant context.
///
/// Pure policy check: no IO, no business rules.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let granted = principal
        .membership
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p.as_str() == required.as_str());

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn principal(tenant: TenantId, membership_tenant: TenantId, perms: &[&'static str]) -> Principal {
        Principal {
            principal_id: PrincipalId::new(),
            active_tenant_id: tenant,
            membership: TenantMembership {
                tenant_id: membership_tenant,
                roles: vec![Role::new("clerk")],
                permissions: perms.iter().map(|p| Permission::new(*p)).collect(),
            },
        }
    }

    #[test]
    fn explicit_permission_is_granted() {
        let t = TenantId::new();
        let p = principal(t, t, &["inventory.read"]);
        assert!(authorize(&p, &Permission::new("inventory.read")).is_ok());
        assert_eq!(
            authorize(&p, &Permission::new("inventory.transfers.create")),
            Err(AuthzError::Forbidden("inventory.transfers.create".into()))
        );
    }

    #[test]
    fn wildcard_grants_everything() {
        let t = TenantId::new();
        let p = principal(t, t, &["*"]);
        assert!(authorize(&p, &Permission::new("reports.read")).is_ok());
    }

    #[test]
    fn tenant_mismatch_is_rejected_first() {
        let p = principal(TenantId::new(), TenantId::new(), &["*"]);
        assert_eq!(
            authorize(&p, &Permission::new("reports.read")),
            Err(AuthzError::TenantMismatch)
        );
    }
}
