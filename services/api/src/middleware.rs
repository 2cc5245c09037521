//! Authentication and authorization middleware

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use common::token::{TokenKeys, TokenType};
use tracing::debug;

use crate::{
    context::AuthContext,
    error::ApiError,
    guards::{permission_guard, role_guard},
    policy::Requirement,
    state::AppState,
};

/// Decode the bearer token, if any, into an [`AuthContext`].
///
/// This layer never rejects: a missing, malformed, expired or refresh token
/// simply leaves the request without a caller, and the route guards decide
/// what that means.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(context) = caller_from_headers(&state.token_keys, req.headers()) {
        req.extensions_mut().insert(context);
    }
    next.run(req).await
}

fn caller_from_headers(keys: &TokenKeys, headers: &axum::http::HeaderMap) -> Option<AuthContext> {
    let Authorization(bearer) = headers.typed_get::<Authorization<Bearer>>()?;

    match keys.decode(bearer.token()) {
        Ok(claims) if claims.token_type == TokenType::Access => {
            Some(AuthContext::from_claims(&claims))
        }
        Ok(_) => {
            debug!("Refresh token presented as bearer credential");
            None
        }
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            None
        }
    }
}

/// Run the role guard and then the permission guard for one route.
pub fn check_access(requirement: &Requirement, caller: Option<&AuthContext>) -> Result<(), ApiError> {
    if requirement.is_open() {
        return Ok(());
    }

    let Some(caller) = caller else {
        return Err(ApiError::Unauthenticated);
    };

    if !role_guard(&requirement.roles, caller.role()) {
        return Err(ApiError::Forbidden(
            "Acceso denegado: su rol no tiene acceso a este recurso".to_string(),
        ));
    }

    permission_guard(&requirement.permissions, Some(caller))?;
    Ok(())
}

/// Route layer enforcing a [`Requirement`] before the handler runs
pub async fn enforce(
    State(requirement): State<Arc<Requirement>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_access(&requirement, req.extensions().get::<AuthContext>())?;
    Ok(next.run(req).await)
}
