//! `stockroom-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage: token verification yields [`JwtClaims`],
//! the static [`policy`] turns roles into permissions, and [`authorize`]
//! checks a permission for a principal within its tenant.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use policy::{membership_for, permissions_for_role};
pub use principal::{PrincipalId, TenantMembership};
pub use roles::Role;
