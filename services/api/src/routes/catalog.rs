//! Catalog routes, one router per catalog kind
//!
//! The handlers are shared; the kind reaches them as a request extension
//! installed by the per-kind router.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use super::guarded;
use crate::{
    context::AuthContext,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        StatusChange,
        catalog::{
            CatalogKind, CatalogQuery, CodeSuggestionQuery, NewCatalogEntry, UpdateCatalogEntry,
        },
    },
    policy::{AccessPolicy, PolicyError},
    state::AppState,
};

pub(super) fn router(
    kind: CatalogKind,
    policy: &AccessPolicy,
) -> Result<Router<AppState>, PolicyError> {
    let slug = kind.slug();

    Ok(Router::new()
        .route(
            "/",
            guarded(get(list_entries), policy, slug, "listar")?
                .merge(guarded(post(create_entry), policy, slug, "crear")?),
        )
        .route(
            "/siguiente-codigo",
            guarded(get(suggest_code), policy, slug, "siguiente-codigo")?,
        )
        .route(
            "/:id",
            guarded(get(get_entry), policy, slug, "ver")?
                .merge(guarded(put(update_entry), policy, slug, "editar")?),
        )
        .route(
            "/:id/estado",
            guarded(patch(set_entry_status), policy, slug, "cambiar-estado")?,
        )
        .layer(Extension(kind)))
}

async fn list_entries(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalogs.list(kind, &query).await?))
}

async fn get_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalogs.get(kind, id).await?))
}

async fn create_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    caller: AuthContext,
    ApiJson(payload): ApiJson<NewCatalogEntry>,
) -> ApiResult<impl IntoResponse> {
    let entry = state.catalogs.create(kind, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    caller: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateCatalogEntry>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalogs.update(kind, id, &caller, payload).await?))
}

async fn set_entry_status(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    caller: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusChange>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .catalogs
            .set_status(kind, id, &caller, payload.status)
            .await?,
    ))
}

async fn suggest_code(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    ApiQuery(query): ApiQuery<CodeSuggestionQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalogs.suggest_code(kind, query.parent_id).await?))
}
