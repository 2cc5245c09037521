//! User administration routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use serde::Deserialize;
use uuid::Uuid;

use super::guarded;
use crate::{
    context::AuthContext,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        StatusChange,
        audit::RequestMeta,
        user::{CreateUserRequest, RoleAssignment},
    },
    policy::{AccessPolicy, PolicyError},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
struct ListUsersQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

pub(super) fn router(policy: &AccessPolicy) -> Result<Router<AppState>, PolicyError> {
    Ok(Router::new()
        .route(
            "/",
            guarded(get(list_users), policy, "usuarios", "listar")?
                .merge(guarded(post(create_user), policy, "usuarios", "crear")?),
        )
        .route(
            "/:id/rol",
            guarded(put(assign_role), policy, "usuarios", "asignar-rol")?,
        )
        .route(
            "/:id/estado",
            guarded(patch(set_user_status), policy, "usuarios", "cambiar-estado")?,
        ))
}

/// Get all users, paginated
async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.users.list(query.page, query.limit).await?))
}

/// Create a new user
async fn create_user(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users.create(&caller, meta, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn assign_role(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RoleAssignment>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .users
            .assign_role(&caller, meta, id, payload.role_id)
            .await?,
    ))
}

async fn set_user_status(
    State(state): State<AppState>,
    caller: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusChange>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.users.set_status(&caller, id, payload.status).await?))
}
