//! Static role → permission policy.
//!
//! | role      | grants                                          |
//! |-----------|-------------------------------------------------|
//! | `admin`   | `*`                                             |
//! | `manager` | every named permission, including PO approval   |
//! | `clerk`   | reads, stock documents, purchase orders, receipts |
//! | `cashier` | reads, sales orders, POS checkout               |
//! | `viewer`  | reads                                           |
//!
//! Unknown roles grant nothing.

use stockroom_core::TenantId;

use crate::{Permission, Role, TenantMembership};

pub const WILDCARD: Permission = Permission::from_static("*");

pub const CATALOG_READ: Permission = Permission::from_static("catalog.read");
pub const CATALOG_ITEMS_WRITE: Permission = Permission::from_static("catalog.items.write");
pub const CATALOG_LOCATIONS_WRITE: Permission = Permission::from_static("catalog.locations.write");
pub const PARTIES_READ: Permission = Permission::from_static("parties.read");
pub const PARTIES_WRITE: Permission = Permission::from_static("parties.write");
pub const INVENTORY_READ: Permission = Permission::from_static("inventory.read");
pub const INVENTORY_TRANSFERS_CREATE: Permission =
    Permission::from_static("inventory.transfers.create");
pub const INVENTORY_ADJUSTMENTS_CREATE: Permission =
    Permission::from_static("inventory.adjustments.create");
pub const PURCHASING_READ: Permission = Permission::from_static("purchasing.read");
pub const PURCHASING_ORDERS_WRITE: Permission = Permission::from_static("purchasing.orders.write");
pub const PURCHASING_ORDERS_APPROVE: Permission =
    Permission::from_static("purchasing.orders.approve");
pub const PURCHASING_RECEIPTS_CREATE: Permission =
    Permission::from_static("purchasing.receipts.create");
pub const SALES_READ: Permission = Permission::from_static("sales.read");
pub const SALES_ORDERS_WRITE: Permission = Permission::from_static("sales.orders.write");
pub const SALES_POS_CHECKOUT: Permission = Permission::from_static("sales.pos.checkout");
pub const REPORTS_READ: Permission = Permission::from_static("reports.read");

const READS: &[Permission] = &[
    CATALOG_READ,
    PARTIES_READ,
    INVENTORY_READ,
    PURCHASING_READ,
    SALES_READ,
];

const MANAGER: &[Permission] = &[
    CATALOG_ITEMS_WRITE,
    CATALOG_LOCATIONS_WRITE,
    PARTIES_WRITE,
    INVENTORY_TRANSFERS_CREATE,
    INVENTORY_ADJUSTMENTS_CREATE,
    PURCHASING_ORDERS_WRITE,
    PURCHASING_ORDERS_APPROVE,
    PURCHASING_RECEIPTS_CREATE,
    SALES_ORDERS_WRITE,
    SALES_POS_CHECKOUT,
    REPORTS_READ,
];

const CLERK: &[Permission] = &[
    INVENTORY_TRANSFERS_CREATE,
    INVENTORY_ADJUSTMENTS_CREATE,
    PURCHASING_ORDERS_WRITE,
    PURCHASING_RECEIPTS_CREATE,
];

const CASHIER: &[Permission] = &[SALES_ORDERS_WRITE, SALES_POS_CHECKOUT];

/// Permissions granted by one role.
pub fn permissions_for_role(role: &Role) -> Vec<Permission> {
    let extra: &[Permission] = match role.as_str() {
        "admin" => return vec![WILDCARD],
        "manager" => MANAGER,
        "clerk" => CLERK,
        "cashier" => CASHIER,
        "viewer" => &[],
        _ => return Vec::new(),
    };
    READS.iter().chain(extra).cloned().collect()
}

/// Resolve a membership in `tenant_id` for a set of token roles.
pub fn membership_for(tenant_id: TenantId, roles: &[Role]) -> TenantMembership {
    let mut permissions: Vec<Permission> = Vec::new();
    for role in roles {
        for perm in permissions_for_role(role) {
            if !permissions.contains(&perm) {
                permissions.push(perm);
            }
        }
    }

    TenantMembership {
        tenant_id,
        roles: roles.to_vec(),
        permissions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gets_wildcard() {
        assert_eq!(permissions_for_role(&Role::new("admin")), vec![WILDCARD]);
    }

    #[test]
    fn cashier_can_check_out_but_not_adjust() {
        let perms = permissions_for_role(&Role::new("cashier"));
        assert!(perms.contains(&SALES_POS_CHECKOUT));
        assert!(perms.contains(&INVENTORY_READ));
        assert!(!perms.contains(&INVENTORY_ADJUSTMENTS_CREATE));
    }

    #[test]
    fn only_managers_approve_purchase_orders() {
        assert!(permissions_for_role(&Role::new("manager")).contains(&PURCHASING_ORDERS_APPROVE));
        assert!(!permissions_for_role(&Role::new("clerk")).contains(&PURCHASING_ORDERS_APPROVE));
    }

    #[test]
    fn unknown_roles_grant_nothing_and_memberships_dedupe() {
        assert!(permissions_for_role(&Role::new("intern")).is_empty());

        let m = membership_for(TenantId::new(), &[Role::new("viewer"), Role::new("cashier")]);
        let reads = m.permissions.iter().filter(|p| **p == CATALOG_READ).count();
        assert_eq!(reads, 1);
        assert!(m.permissions.contains(&SALES_POS_CHECKOUT));
    }
}
