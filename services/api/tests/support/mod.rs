//! Shared fixtures for the API integration tests

#![allow(dead_code)]

use std::sync::Arc;

use api::{
    AppState,
    repositories::memory::{
        InMemoryAuditRepository, InMemoryCatalogRepository, InMemoryRbacRepository,
        InMemoryUserRepository,
    },
    routes::create_router,
    state::Repositories,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use common::token::{Claims, RoleClaim, TokenKeys, TokenType, unix_now};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &[u8] = b"integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub keys: TokenKeys,
    pub rbac: Arc<InMemoryRbacRepository>,
    pub catalogs: Arc<InMemoryCatalogRepository>,
    pub audit: Arc<InMemoryAuditRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        let keys = TokenKeys::hs256(SECRET);
        let rbac = Arc::new(InMemoryRbacRepository::new());
        let catalogs = Arc::new(InMemoryCatalogRepository::new());
        let audit = Arc::new(InMemoryAuditRepository::new());

        let state = AppState::new(
            Repositories {
                rbac: rbac.clone(),
                users: Arc::new(InMemoryUserRepository::new()),
                catalogs: catalogs.clone(),
                audit: audit.clone(),
            },
            keys.clone(),
            None,
        );
        let router = create_router(state.clone()).expect("standard policy covers every route");

        Self {
            router,
            state,
            keys,
            rbac,
            catalogs,
            audit,
        }
    }

    /// Access token for a caller holding `role` with its permissions
    pub fn token_for_role(&self, role: &str, permissions: &[&str]) -> String {
        self.sign(Some(role), Some(permissions), None, TokenType::Access, 600)
    }

    /// Access token without a role, carrying a direct permission list
    pub fn token_with_permissions(&self, permissions: &[&str]) -> String {
        self.sign(None, None, Some(permissions), TokenType::Access, 600)
    }

    pub fn sign(
        &self,
        role: Option<&str>,
        role_permissions: Option<&[&str]>,
        direct_permissions: Option<&[&str]>,
        token_type: TokenType,
        ttl_seconds: i64,
    ) -> String {
        let now = unix_now();
        let to_vec = |items: &[&str]| items.iter().map(|p| p.to_string()).collect::<Vec<_>>();

        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "tester".to_string(),
            role: role.map(|name| RoleClaim {
                name: name.to_string(),
                permissions: role_permissions.map(to_vec).unwrap_or_default(),
            }),
            permissions: direct_permissions.map(to_vec),
            iat: now,
            exp: (now as i64 + ttl_seconds).max(0) as u64,
            token_type,
        };
        self.keys.encode(&claims).expect("sign test token")
    }

    /// Administrator holding every permission of the standard policy
    pub fn admin_token(&self) -> String {
        let mut permissions: Vec<String> = [
            "roles:listar",
            "roles:ver",
            "roles:crear",
            "roles:editar",
            "roles:cambiar-estado",
            "roles:asignar-permisos",
            "permisos:listar",
            "permisos:crear",
            "permisos:editar",
            "usuarios:listar",
            "usuarios:crear",
            "usuarios:asignar-rol",
            "usuarios:cambiar-estado",
            "auditoria:listar",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();

        for kind in api::models::catalog::CatalogKind::ALL {
            for action in ["listar", "ver", "crear", "editar", "cambiar-estado"] {
                permissions.push(format!("{}:{}", kind.slug(), action));
            }
        }

        let refs: Vec<&str> = permissions.iter().map(String::as_str).collect();
        self.token_for_role("ADMINISTRADOR", &refs)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(&self.router, request(method, uri, token, body)).await
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, body)
}
