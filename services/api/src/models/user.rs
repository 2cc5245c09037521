//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;

/// User entity
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "rol_id")]
    pub role_id: Option<Uuid>,
    #[serde(rename = "estado")]
    pub status: Status,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User registration request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    pub password: String,
    #[serde(rename = "rol_id", default)]
    pub role_id: Option<Uuid>,
}

/// Row to insert once the password has been hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
    pub role_id: Option<Uuid>,
}

/// Role assignment request
#[derive(Debug, Clone, Deserialize)]
pub struct RoleAssignment {
    #[serde(rename = "rol_id")]
    pub role_id: Uuid,
}
