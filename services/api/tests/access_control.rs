//! Role and permission guards exercised through the HTTP router

mod support;

use std::{collections::BTreeSet, sync::Arc};

use api::{
    middleware::{authenticate, enforce},
    policy::Requirement,
};
use axum::{
    Router,
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
};
use common::token::TokenType;
use support::{TestApp, request, send};

/// A report route guarded by `ufv:exportar-pdf`, wired like the real routes
fn export_router(app: &TestApp) -> Router {
    let requirement = Arc::new(Requirement {
        roles: BTreeSet::new(),
        permissions: vec!["ufv:exportar-pdf".to_string()],
    });

    Router::new()
        .route(
            "/catalogos/ufv/exportar-pdf",
            get(|| async { "%PDF" }).route_layer(from_fn_with_state(requirement, enforce)),
        )
        .layer(from_fn_with_state(app.state.clone(), authenticate))
        .with_state(app.state.clone())
}

#[tokio::test]
async fn test_no_token_on_guarded_route_is_unauthenticated() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/catalogos/ufv", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let app = TestApp::new();

    let (status, _) = app
        .send(Method::GET, "/catalogos/ufv", Some("not-a-jwt"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auxiliar_without_export_permission_is_forbidden() {
    let app = TestApp::new();
    let router = export_router(&app);
    let token = app.token_for_role("AUXILIAR", &["ufv:listar"]);

    let (status, body) = send(
        &router,
        request(Method::GET, "/catalogos/ufv/exportar-pdf", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_export_without_token_is_unauthenticated() {
    let app = TestApp::new();
    let router = export_router(&app);

    let (status, _) = send(
        &router,
        request(Method::GET, "/catalogos/ufv/exportar-pdf", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auxiliar_with_list_permission_can_list() {
    let app = TestApp::new();
    let token = app.token_for_role("AUXILIAR", &["ufv:listar"]);

    let (status, body) = app
        .send(Method::GET, "/catalogos/ufv", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_role_permissions_override_direct_list() {
    let app = TestApp::new();
    let token = app.sign(
        Some("INVITADO"),
        Some(&[]),
        Some(&["ufv:listar"]),
        TokenType::Access,
        600,
    );

    let (status, _) = app
        .send(Method::GET, "/catalogos/ufv", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_direct_list_applies_without_role() {
    let app = TestApp::new();
    let token = app.token_with_permissions(&["ufv:listar"]);

    let (status, _) = app
        .send(Method::GET, "/catalogos/ufv", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_and_refresh_tokens_are_not_credentials() {
    let app = TestApp::new();
    let expired = app.sign(
        Some("AUXILIAR"),
        Some(&["ufv:listar"]),
        None,
        TokenType::Access,
        -3600,
    );
    let refresh = app.sign(
        Some("AUXILIAR"),
        Some(&["ufv:listar"]),
        None,
        TokenType::Refresh,
        600,
    );

    for token in [expired, refresh] {
        let (status, _) = app
            .send(Method::GET, "/catalogos/ufv", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_audit_module_requires_role_and_permission() {
    let app = TestApp::new();

    let auxiliar = app.token_for_role("AUXILIAR", &["auditoria:listar"]);
    let (status, _) = app
        .send(Method::GET, "/auditoria", Some(&auxiliar), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let auditor_without_permission = app.token_for_role("AUDITOR", &[]);
    let (status, _) = app
        .send(Method::GET, "/auditoria", Some(&auditor_without_permission), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let auditor = app.token_for_role("AUDITOR", &["auditoria:listar"]);
    let (status, body) = app
        .send(Method::GET, "/auditoria", Some(&auditor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], serde_json::json!([]));
}

#[tokio::test]
async fn test_profile_reports_resolved_permissions() {
    let app = TestApp::new();
    let token = app.sign(
        Some("AUXILIAR"),
        Some(&["ufv:listar", "ciudades:listar"]),
        Some(&["roles:crear"]),
        TokenType::Access,
        600,
    );

    let (status, body) = app.send(Method::GET, "/perfil", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rol"], "AUXILIAR");
    assert_eq!(body["permisos"], serde_json::json!(["ciudades:listar", "ufv:listar"]));
}

#[tokio::test]
async fn test_profile_requires_authentication() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::GET, "/perfil", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "in-memory");
}
