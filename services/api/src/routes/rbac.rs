//! Role and permission administration routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
};
use uuid::Uuid;

use super::guarded;
use crate::{
    context::AuthContext,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
    models::{
        StatusChange,
        audit::RequestMeta,
        rbac::{NewPermission, NewRole, PermissionAssignment, UpdatePermission, UpdateRole},
    },
    policy::{AccessPolicy, PolicyError},
    state::AppState,
};

pub(super) fn roles_router(policy: &AccessPolicy) -> Result<Router<AppState>, PolicyError> {
    Ok(Router::new()
        .route(
            "/",
            guarded(get(list_roles), policy, "roles", "listar")?
                .merge(guarded(post(create_role), policy, "roles", "crear")?),
        )
        .route(
            "/:id",
            guarded(get(get_role), policy, "roles", "ver")?
                .merge(guarded(put(update_role), policy, "roles", "editar")?),
        )
        .route(
            "/:id/estado",
            guarded(patch(set_role_status), policy, "roles", "cambiar-estado")?,
        )
        .route(
            "/:id/permisos",
            guarded(post(assign_permissions), policy, "roles", "asignar-permisos")?.merge(
                guarded(delete(revoke_permissions), policy, "roles", "quitar-permisos")?,
            ),
        ))
}

pub(super) fn permissions_router(policy: &AccessPolicy) -> Result<Router<AppState>, PolicyError> {
    Ok(Router::new()
        .route(
            "/",
            guarded(get(list_permissions), policy, "permisos", "listar")?
                .merge(guarded(post(create_permission), policy, "permisos", "crear")?),
        )
        .route(
            "/:id",
            guarded(put(update_permission), policy, "permisos", "editar")?,
        ))
}

/// List roles with their permissions
async fn list_roles(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.rbac.list_roles().await?))
}

async fn get_role(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.rbac.get_role(id).await?))
}

async fn create_role(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiJson(payload): ApiJson<NewRole>,
) -> ApiResult<impl IntoResponse> {
    let role = state.rbac.create_role(&caller, meta, payload).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update_role(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateRole>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.rbac.update_role(&caller, meta, id, payload).await?))
}

async fn set_role_status(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusChange>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .rbac
            .set_role_status(&caller, meta, id, payload.status)
            .await?,
    ))
}

async fn assign_permissions(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<PermissionAssignment>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .rbac
            .assign_permissions(&caller, meta, id, payload)
            .await?,
    ))
}

async fn revoke_permissions(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<PermissionAssignment>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .rbac
            .revoke_permissions(&caller, meta, id, payload)
            .await?,
    ))
}

async fn list_permissions(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.rbac.list_permissions().await?))
}

async fn create_permission(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiJson(payload): ApiJson<NewPermission>,
) -> ApiResult<impl IntoResponse> {
    let permission = state.rbac.create_permission(&caller, meta, payload).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

async fn update_permission(
    State(state): State<AppState>,
    caller: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdatePermission>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .rbac
            .update_permission(&caller, meta, id, payload)
            .await?,
    ))
}
