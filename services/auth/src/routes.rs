//! Authentication service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{AppState, credentials::UserCredentials, jwt::TokenPair};

/// Argon2id hash matching no password, with the default hashing parameters.
///
/// Unknown and inactive users are verified against it so a failed login costs
/// the same whether or not the name exists.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$LKhqIle8lZFP0cuumHShqQ$OU+3iCCyIpczTwsfzuW9WHtacH7DjDQThWVJk0Pk/BU";

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request for token refresh
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    info!("Login attempt for user: {}", payload.username);

    if !state.rate_limiter.is_allowed(&payload.username).await {
        return Err(AuthError::TooManyRequests);
    }

    let user = state
        .credentials
        .find_by_username(&payload.username)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .filter(|user| user.active);

    let Some(user) = user else {
        common::password::verify_password(UNKNOWN_USER_HASH, &payload.password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        warn!("Unknown or inactive user: {}", payload.username);
        return Err(AuthError::InvalidCredentials);
    };

    let valid = common::password::verify_password(&user.password_hash, &payload.password)
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    if !valid {
        warn!("Wrong password for user: {}", payload.username);
        return Err(AuthError::InvalidCredentials);
    }

    state.rate_limiter.reset(&payload.username).await;
    let pair = issue(&state, &user)?;

    info!("User {} logged in", user.username);
    Ok(Json(pair))
}

/// Refresh token endpoint
///
/// Reloads the user so role and permission changes apply to the new pair.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let claims = state
        .jwt_service
        .validate_refresh(&payload.refresh_token)
        .map_err(|_| AuthError::InvalidToken)?
        .ok_or(AuthError::InvalidToken)?;

    let user = state
        .credentials
        .find_by_id(claims.sub)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .filter(|user| user.active)
        .ok_or(AuthError::InvalidToken)?;

    let pair = issue(&state, &user)?;

    info!("Refreshed tokens for user {}", user.username);
    Ok(Json(pair))
}

fn issue(state: &AppState, user: &UserCredentials) -> Result<TokenPair, AuthError> {
    state
        .jwt_service
        .issue(user)
        .map_err(|e| AuthError::Internal(e.to_string()))
}

/// Custom error type for authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login rejected without revealing whether the user exists
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Too many login attempts")]
    TooManyRequests,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Usuario o contrasena incorrectos",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Token invalido o expirado",
            ),
            AuthError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Demasiados intentos, intente mas tarde",
            ),
            AuthError::Internal(_) => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Error interno del servidor",
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
