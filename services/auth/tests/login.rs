//! Login and refresh flows against an in-memory credential store

use std::{sync::Arc, time::Duration};

use auth::{
    AppState,
    credentials::{InMemoryCredentialRepository, RoleGrant, UserCredentials},
    jwt::JwtService,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    routes::create_router,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use common::{
    password::hash_password,
    token::{TokenKeys, TokenType},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"auth-integration-secret";
const PASSWORD: &str = "Activos2024";

struct TestAuth {
    router: Router,
    users: Arc<InMemoryCredentialRepository>,
}

impl TestAuth {
    fn new() -> Self {
        let users = Arc::new(InMemoryCredentialRepository::new());
        let state = AppState {
            jwt_service: JwtService::with_keys(TokenKeys::hs256(SECRET), 900, 604800),
            credentials: users.clone(),
            rate_limiter: RateLimiter::new(RateLimiterConfig {
                max_attempts: 5,
                window: Duration::from_secs(300),
                ban_duration: Duration::from_secs(3600),
            }),
        };

        Self {
            router: create_router(state),
            users,
        }
    }

    async fn add_user(&self, username: &str, active: bool, role: Option<RoleGrant>) -> Uuid {
        let id = Uuid::new_v4();
        self.users
            .insert(UserCredentials {
                user_id: id,
                username: username.to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                active,
                role,
            })
            .await;
        id
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/login",
            json!({"username": username, "password": password}),
        )
        .await
    }
}

fn auxiliar() -> RoleGrant {
    RoleGrant {
        name: "AUXILIAR".to_string(),
        active: true,
        permissions: vec!["ufv:listar".to_string()],
    }
}

#[tokio::test]
async fn test_login_issues_tokens_with_role_permissions() {
    let app = TestAuth::new();
    let id = app.add_user("jperez", true, Some(auxiliar())).await;

    let (status, body) = app.login("jperez", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);

    let keys = TokenKeys::hs256(SECRET);
    let access = keys.decode(body["access_token"].as_str().unwrap()).unwrap();
    assert_eq!(access.sub, id);
    assert_eq!(access.token_type, TokenType::Access);
    assert_eq!(access.role.unwrap().permissions, vec!["ufv:listar"]);

    let refresh = keys.decode(body["refresh_token"].as_str().unwrap()).unwrap();
    assert_eq!(refresh.token_type, TokenType::Refresh);
}

#[tokio::test]
async fn test_failures_share_one_message() {
    let app = TestAuth::new();
    app.add_user("jperez", true, None).await;
    app.add_user("baja", false, None).await;

    let (wrong_status, wrong) = app.login("jperez", "Incorrecta1").await;
    let (unknown_status, unknown) = app.login("nadie", PASSWORD).await;
    let (inactive_status, inactive) = app.login("baja", PASSWORD).await;

    for status in [wrong_status, unknown_status, inactive_status] {
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(wrong, unknown);
    assert_eq!(unknown, inactive);
}

#[tokio::test]
async fn test_repeated_failures_are_rate_limited() {
    let app = TestAuth::new();
    app.add_user("jperez", true, None).await;

    for _ in 0..5 {
        let (status, _) = app.login("jperez", "Incorrecta1").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Banned even with the right password
    let (status, body) = app.login("jperez", PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
}

#[tokio::test]
async fn test_refresh_reloads_user() {
    let app = TestAuth::new();
    let id = app.add_user("jperez", true, Some(auxiliar())).await;

    let (_, tokens) = app.login("jperez", PASSWORD).await;

    // Role gains a permission after login
    let mut role = auxiliar();
    role.permissions.push("ufv:exportar-pdf".to_string());
    app.users
        .insert(UserCredentials {
            user_id: id,
            username: "jperez".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            active: true,
            role: Some(role),
        })
        .await;

    let (status, body) = app
        .post(
            "/auth/refresh",
            json!({"refresh_token": tokens["refresh_token"]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let access = TokenKeys::hs256(SECRET)
        .decode(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(
        access.role.unwrap().permissions,
        vec!["ufv:listar", "ufv:exportar-pdf"]
    );
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let app = TestAuth::new();
    app.add_user("jperez", true, None).await;
    let (_, tokens) = app.login("jperez", PASSWORD).await;

    let (status, _) = app
        .post(
            "/auth/refresh",
            json!({"refresh_token": tokens["access_token"]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_for_deactivated_user_fails() {
    let app = TestAuth::new();
    let id = app.add_user("jperez", true, None).await;
    let (_, tokens) = app.login("jperez", PASSWORD).await;

    app.users
        .insert(UserCredentials {
            user_id: id,
            username: "jperez".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            active: false,
            role: None,
        })
        .await;

    let (status, _) = app
        .post(
            "/auth/refresh",
            json!({"refresh_token": tokens["refresh_token"]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let app = TestAuth::new();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
