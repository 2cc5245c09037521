//! PostgreSQL role and permission store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use super::{RbacRepository, status_column};
use crate::{
    error::{ApiError, ApiResult, conflict_or_query},
    models::{
        Status,
        rbac::{Permission, Role},
    },
};

/// Role repository backed by the `roles`, `permisos` and `roles_permisos` tables
#[derive(Clone)]
pub struct PgRbacRepository {
    pool: PgPool,
}

impl PgRbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Permissions granted to each of the given roles
    async fn grants(&self, role_ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Vec<Permission>>> {
        let rows = sqlx::query(
            r#"
            SELECT rp.rol_id, p.id, p.nombre, p.descripcion, p.created_at, p.updated_at
            FROM roles_permisos rp
            JOIN permisos p ON p.id = rp.permiso_id
            WHERE rp.rol_id = ANY($1)
            ORDER BY p.nombre
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grants: HashMap<Uuid, Vec<Permission>> = HashMap::new();
        for row in rows {
            let role_id: Uuid = row.try_get("rol_id")?;
            grants.entry(role_id).or_default().push(permission_from_row(&row)?);
        }
        Ok(grants)
    }

    async fn role_with_grants(&self, row: PgRow) -> ApiResult<Role> {
        let id: Uuid = row.try_get("id")?;
        let mut grants = self.grants(&[id]).await?;
        role_from_row(&row, grants.remove(&id).unwrap_or_default())
    }

    async fn require_role(&self, id: Uuid) -> ApiResult<Role> {
        self.find_role(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Rol", id))
    }
}

fn permission_from_row(row: &PgRow) -> ApiResult<Permission> {
    Ok(Permission {
        id: row.try_get("id")?,
        name: row.try_get("nombre")?,
        description: row.try_get("descripcion")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn role_from_row(row: &PgRow, permissions: Vec<Permission>) -> ApiResult<Role> {
    let status: String = row.try_get("estado")?;
    Ok(Role {
        id: row.try_get("id")?,
        name: row.try_get("nombre")?,
        description: row.try_get("descripcion")?,
        status: status_column(&status)?,
        permissions,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn grant(
    tx: &mut Transaction<'_, Postgres>,
    role_id: Uuid,
    permission_ids: &[Uuid],
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO roles_permisos (rol_id, permiso_id)
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(role_id)
    .bind(permission_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn touch_role(tx: &mut Transaction<'_, Postgres>, role_id: Uuid) -> ApiResult<()> {
    let result = sqlx::query("UPDATE roles SET updated_at = $2 WHERE id = $1")
        .bind(role_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Rol", role_id));
    }
    Ok(())
}

#[async_trait]
impl RbacRepository for PgRbacRepository {
    async fn list_roles(&self) -> ApiResult<Vec<Role>> {
        let rows = sqlx::query(
            r#"
            SELECT id, nombre, descripcion, estado, created_at, updated_at
            FROM roles
            ORDER BY nombre
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<Vec<Uuid>, _>>()?;
        let mut grants = self.grants(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| role_from_row(row, grants.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn find_role(&self, id: Uuid) -> ApiResult<Option<Role>> {
        let row = sqlx::query(
            r#"
            SELECT id, nombre, descripcion, estado, created_at, updated_at
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.role_with_grants(row).await?)),
            None => Ok(None),
        }
    }

    async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
        permission_ids: &[Uuid],
    ) -> ApiResult<Role> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, nombre, descripcion, estado, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Status::Active.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_query(e, format!("El rol '{}' ya existe", name)))?;

        if !permission_ids.is_empty() {
            grant(&mut tx, id, permission_ids).await?;
        }

        tx.commit().await?;
        self.require_role(id).await
    }

    async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Role> {
        let row = sqlx::query(
            r#"
            UPDATE roles
            SET nombre = $2, descripcion = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, nombre, descripcion, estado, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_query(e, format!("El rol '{}' ya existe", name)))?
        .ok_or_else(|| ApiError::not_found("Rol", id))?;

        self.role_with_grants(row).await
    }

    async fn set_role_status(&self, id: Uuid, status: Status) -> ApiResult<Role> {
        let row = sqlx::query(
            r#"
            UPDATE roles
            SET estado = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, nombre, descripcion, estado, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Rol", id))?;

        self.role_with_grants(row).await
    }

    async fn add_role_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> ApiResult<Role> {
        let mut tx = self.pool.begin().await?;
        touch_role(&mut tx, id).await?;
        grant(&mut tx, id, permission_ids).await?;
        tx.commit().await?;

        self.require_role(id).await
    }

    async fn remove_role_permissions(
        &self,
        id: Uuid,
        permission_ids: &[Uuid],
    ) -> ApiResult<Role> {
        let mut tx = self.pool.begin().await?;
        touch_role(&mut tx, id).await?;
        sqlx::query("DELETE FROM roles_permisos WHERE rol_id = $1 AND permiso_id = ANY($2)")
            .bind(id)
            .bind(permission_ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.require_role(id).await
    }

    async fn list_permissions(&self) -> ApiResult<Vec<Permission>> {
        let rows = sqlx::query(
            r#"
            SELECT id, nombre, descripcion, created_at, updated_at
            FROM permisos
            ORDER BY nombre
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(permission_from_row).collect()
    }

    async fn find_permission(&self, id: Uuid) -> ApiResult<Option<Permission>> {
        let row = sqlx::query(
            r#"
            SELECT id, nombre, descripcion, created_at, updated_at
            FROM permisos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(permission_from_row).transpose()
    }

    async fn find_permissions(&self, ids: &[Uuid]) -> ApiResult<Vec<Permission>> {
        let rows = sqlx::query(
            r#"
            SELECT id, nombre, descripcion, created_at, updated_at
            FROM permisos
            WHERE id = ANY($1)
            ORDER BY nombre
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(permission_from_row).collect()
    }

    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Permission> {
        let row = sqlx::query(
            r#"
            INSERT INTO permisos (id, nombre, descripcion, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, nombre, descripcion, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_query(e, format!("El permiso '{}' ya existe", name)))?;

        permission_from_row(&row)
    }

    async fn update_permission(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Permission> {
        let row = sqlx::query(
            r#"
            UPDATE permisos
            SET nombre = $2, descripcion = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, nombre, descripcion, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_query(e, format!("El permiso '{}' ya existe", name)))?
        .ok_or_else(|| ApiError::not_found("Permiso", id))?;

        permission_from_row(&row)
    }
}
