//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{DatabaseError, is_unique_violation};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// No caller identity, or the bearer token was missing or invalid
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Authenticated caller without the required role or permission
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate business key (role name, permission name, catalog code, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed or incomplete input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} no existe", entity, id))
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(DatabaseError::Query(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Map a write failure, turning a unique violation into a conflict.
pub fn conflict_or_query(err: sqlx::Error, message: impl Into<String>) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict(message.into())
    } else {
        ApiError::from(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let message = match &self {
            ApiError::Unauthenticated => "Autenticacion requerida".to_string(),
            ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::Validation(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Internal(_) | ApiError::Database(_) => {
                error!("Request failed: {}", self);
                "Error interno del servidor".to_string()
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
