//! API service routes
//!
//! Every protected route is wrapped by [`guarded`], which looks the route up
//! in the [`AccessPolicy`] and installs the guard layer. The authentication
//! layer wraps the whole router and runs first.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{MethodRouter, get},
};
use serde_json::json;

use crate::{
    context::AuthContext,
    middleware::{authenticate, enforce},
    models::catalog::CatalogKind,
    policy::{AccessPolicy, PolicyError},
    state::AppState,
};

mod audit;
mod catalog;
mod rbac;
mod users;

/// Attach the guard for `module`/`route` to a method router
pub(crate) fn guarded(
    method_router: MethodRouter<AppState>,
    policy: &AccessPolicy,
    module: &str,
    route: &str,
) -> Result<MethodRouter<AppState>, PolicyError> {
    let requirement = Arc::new(policy.requirement(module, route)?);
    Ok(method_router.route_layer(middleware::from_fn_with_state(requirement, enforce)))
}

/// Create the router for the API service using the standard access policy
pub fn create_router(state: AppState) -> Result<Router, PolicyError> {
    create_router_with_policy(state, &AccessPolicy::standard())
}

/// Create the router for the API service
pub fn create_router_with_policy(
    state: AppState,
    policy: &AccessPolicy,
) -> Result<Router, PolicyError> {
    let mut catalogs = Router::new();
    for kind in CatalogKind::ALL {
        catalogs = catalogs.nest(
            &format!("/{}", kind.slug()),
            catalog::router(kind, policy)?,
        );
    }

    let router = Router::new()
        .route("/perfil", guarded(get(profile), policy, "perfil", "ver")?)
        .nest("/roles", rbac::roles_router(policy)?)
        .nest("/permisos", rbac::permissions_router(policy)?)
        .nest("/usuarios", users::router(policy)?)
        .nest("/auditoria", audit::router(policy)?)
        .nest("/catalogos", catalogs)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .route("/health", get(health_check))
        .with_state(state);

    Ok(router)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db_pool {
        Some(pool) => match common::database::health_check(pool).await {
            Ok(true) => "ok",
            _ => "unavailable",
        },
        None => "in-memory",
    };

    Json(json!({
        "status": "ok",
        "service": "activos-fijos-api",
        "database": database,
    }))
}

/// Identity and resolved permissions of the caller
pub async fn profile(caller: AuthContext) -> impl IntoResponse {
    Json(caller)
}
