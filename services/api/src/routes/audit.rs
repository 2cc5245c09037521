//! Audit trail browsing

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};

use super::guarded;
use crate::{
    error::ApiResult,
    extract::ApiQuery,
    models::{Page, PageWindow, audit::AuditQuery},
    policy::{AccessPolicy, PolicyError},
    state::AppState,
};

pub(super) fn router(policy: &AccessPolicy) -> Result<Router<AppState>, PolicyError> {
    Ok(Router::new().route(
        "/",
        guarded(get(list_records), policy, "auditoria", "listar")?,
    ))
}

/// Audit records, newest first
async fn list_records(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AuditQuery>,
) -> ApiResult<impl IntoResponse> {
    let window = PageWindow::new(query.page, query.limit);
    let (items, total) = state.audit.list(&query, window).await?;

    Ok(Json(Page {
        items,
        page: window.page,
        limit: window.limit,
        total,
    }))
}
