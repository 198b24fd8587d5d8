//! HTTP application wiring.
//!
//! - `services.rs`: builds the service layer from configuration
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request shapes that differ from the service inputs
//! - `errors.rs`: error classification and JSON error bodies

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockroom_infra::services::Services;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Router over in-memory services, for local runs and tests.
pub fn build_app(jwt_secret: impl AsRef<[u8]>) -> Router {
    build_router(Services::in_memory(), jwt_secret)
}

/// Full router: `/health` is public, everything else needs a bearer token.
pub fn build_router(services: Services, jwt_secret: impl AsRef<[u8]>) -> Router {
    let jwt = Arc::new(stockroom_auth::Hs256JwtValidator::new(jwt_secret));
    let auth_state = middleware::AuthState { jwt };

    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
