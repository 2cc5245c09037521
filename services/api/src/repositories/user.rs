//! PostgreSQL user store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{UserRepository, status_column};
use crate::{
    error::{ApiError, ApiResult, conflict_or_query},
    models::{
        PageWindow, Status,
        user::{NewUser, User},
    },
};

const USER_COLUMNS: &str =
    "id, username, nombre_completo, password_hash, rol_id, estado, deleted_at, created_at, updated_at";

/// User repository for database operations
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> ApiResult<User> {
    let status: String = row.try_get("estado")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        full_name: row.try_get("nombre_completo")?,
        password_hash: row.try_get("password_hash")?,
        role_id: row.try_get("rol_id")?,
        status: status_column(&status)?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self, window: PageWindow) -> ApiResult<(Vec<User>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM usuarios ORDER BY username LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        let users = rows.iter().map(user_from_row).collect::<ApiResult<Vec<_>>>()?;
        Ok((users, total))
    }

    async fn find(&self, id: Uuid) -> ApiResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM usuarios WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create(&self, user: &NewUser) -> ApiResult<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO usuarios (id, username, nombre_completo, password_hash, rol_id, estado, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(Status::Active.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_query(e, format!("El usuario '{}' ya existe", user.username))
        })?;

        user_from_row(&row)
    }

    async fn set_role(&self, id: Uuid, role_id: Uuid) -> ApiResult<User> {
        let row = sqlx::query(&format!(
            "UPDATE usuarios SET rol_id = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(role_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Usuario", id))?;

        user_from_row(&row)
    }

    async fn set_status(&self, id: Uuid, status: Status) -> ApiResult<User> {
        let now = Utc::now();
        let deleted_at = match status {
            Status::Active => None,
            Status::Inactive => Some(now),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE usuarios
            SET estado = $2, deleted_at = $3, updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(deleted_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Usuario", id))?;

        user_from_row(&row)
    }
}
