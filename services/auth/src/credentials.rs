//! Credential lookup for login and token refresh
//!
//! A login needs the stored password hash together with everything that goes
//! into the access token: the assigned role and the names of its permissions.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Role assigned to a user, with its permission names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub name: String,
    pub active: bool,
    pub permissions: Vec<String>,
}

/// Everything needed to authenticate a user and mint their tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub password_hash: String,
    /// `ACTIVO` and not soft-deleted
    pub active: bool,
    pub role: Option<RoleGrant>,
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserCredentials>, sqlx::Error>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, sqlx::Error>;
}

const CREDENTIALS_QUERY: &str = r#"
    SELECT u.id, u.username, u.password_hash,
           (u.estado = 'ACTIVO' AND u.deleted_at IS NULL) AS activo,
           r.nombre AS rol_nombre,
           (r.estado = 'ACTIVO') AS rol_activo,
           COALESCE(
               ARRAY_AGG(p.nombre::text ORDER BY p.nombre) FILTER (WHERE p.nombre IS NOT NULL),
               '{}'::text[]
           ) AS permisos
    FROM usuarios u
    LEFT JOIN roles r ON r.id = u.rol_id
    LEFT JOIN roles_permisos rp ON rp.rol_id = r.id
    LEFT JOIN permisos p ON p.id = rp.permiso_id
"#;

/// PostgreSQL credential store over the `usuarios`, `roles` and
/// `roles_permisos` tables
#[derive(Clone)]
pub struct PgCredentialRepository {
    pool: PgPool,
}

impl PgCredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<UserCredentials, sqlx::Error> {
        let role = match row.try_get::<Option<String>, _>("rol_nombre")? {
            Some(name) => Some(RoleGrant {
                name,
                active: row.try_get::<Option<bool>, _>("rol_activo")?.unwrap_or(false),
                permissions: row.try_get("permisos")?,
            }),
            None => None,
        };

        Ok(UserCredentials {
            user_id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            active: row.try_get("activo")?,
            role,
        })
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserCredentials>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "{} WHERE u.username = $1 GROUP BY u.id, r.id",
            CREDENTIALS_QUERY
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "{} WHERE u.id = $1 GROUP BY u.id, r.id",
            CREDENTIALS_QUERY
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }
}

/// In-process credential store for tests and local runs
#[derive(Default)]
pub struct InMemoryCredentialRepository {
    users: RwLock<HashMap<Uuid, UserCredentials>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, credentials: UserCredentials) {
        self.users
            .write()
            .await
            .insert(credentials.user_id, credentials);
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserCredentials>, sqlx::Error> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, sqlx::Error> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(username: &str) -> UserCredentials {
        UserCredentials {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            active: true,
            role: None,
        }
    }

    #[tokio::test]
    async fn test_lookup_by_username_is_exact() {
        let repo = InMemoryCredentialRepository::new();
        repo.insert(credentials("jperez")).await;

        assert!(repo.find_by_username("jperez").await.unwrap().is_some());
        assert!(repo.find_by_username("JPEREZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let repo = InMemoryCredentialRepository::new();
        let user = credentials("mlopez");
        let id = user.user_id;
        repo.insert(user).await;

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.username, "mlopez");
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
