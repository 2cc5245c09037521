//! PostgreSQL catalog store
//!
//! All kinds share the `catalogos` table, discriminated by `tipo`. The
//! `UNIQUE (tipo, codigo)` constraint is the authority on duplicate codes.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{CatalogRepository, status_column};
use crate::{
    error::{ApiError, ApiResult, conflict_or_query},
    models::{
        PageWindow, Status,
        catalog::{CatalogChanges, CatalogEntry, CatalogInsert, CatalogKind, CatalogQuery},
    },
};

const CATALOG_COLUMNS: &str = "id, tipo, codigo, descripcion, padre_id, estado, atributos, \
     creado_por, modificado_por, created_at, updated_at";

/// Filter shared by the listing and its count. `$1` kind, `$2` status,
/// `$3` parent, `$4` ILIKE pattern.
const CATALOG_FILTER: &str = "tipo = $1 \
     AND ($2::text IS NULL OR estado = $2) \
     AND ($3::uuid IS NULL OR padre_id = $3) \
     AND ($4::text IS NULL OR codigo ILIKE $4 OR descripcion ILIKE $4)";

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> ApiResult<CatalogEntry> {
    let kind: String = row.try_get("tipo")?;
    let status: String = row.try_get("estado")?;

    Ok(CatalogEntry {
        id: row.try_get("id")?,
        kind: CatalogKind::from_slug(&kind)
            .ok_or_else(|| ApiError::Internal(format!("unexpected catalog kind '{}'", kind)))?,
        code: row.try_get("codigo")?,
        description: row.try_get("descripcion")?,
        parent_id: row.try_get("padre_id")?,
        status: status_column(&status)?,
        attributes: row.try_get("atributos")?,
        created_by: row.try_get("creado_por")?,
        updated_by: row.try_get("modificado_por")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Escape LIKE metacharacters and wrap the term for a substring match
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn duplicate_code(kind: CatalogKind, code: &str) -> String {
    format!("El codigo '{}' ya existe en {}", code, kind)
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list(
        &self,
        kind: CatalogKind,
        query: &CatalogQuery,
        window: PageWindow,
    ) -> ApiResult<(Vec<CatalogEntry>, i64)> {
        let status = query.status.map(|s| s.as_str());
        let search = query
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| like_pattern(s.trim()));

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM catalogos WHERE {}", CATALOG_FILTER))
                .bind(kind.slug())
                .bind(status)
                .bind(query.parent_id)
                .bind(search.as_deref())
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM catalogos WHERE {} ORDER BY codigo LIMIT $5 OFFSET $6",
            CATALOG_COLUMNS, CATALOG_FILTER
        ))
        .bind(kind.slug())
        .bind(status)
        .bind(query.parent_id)
        .bind(search.as_deref())
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        let entries = rows.iter().map(entry_from_row).collect::<ApiResult<Vec<_>>>()?;
        Ok((entries, total))
    }

    async fn find(&self, kind: CatalogKind, id: Uuid) -> ApiResult<Option<CatalogEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM catalogos WHERE tipo = $1 AND id = $2",
            CATALOG_COLUMNS
        ))
        .bind(kind.slug())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_by_code(
        &self,
        kind: CatalogKind,
        code: &str,
    ) -> ApiResult<Option<CatalogEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM catalogos WHERE tipo = $1 AND codigo = $2",
            CATALOG_COLUMNS
        ))
        .bind(kind.slug())
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn count_children(&self, kind: CatalogKind, parent_id: Uuid) -> ApiResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalogos WHERE tipo = $1 AND padre_id = $2")
                .bind(kind.slug())
                .bind(parent_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert(&self, kind: CatalogKind, row: &CatalogInsert) -> ApiResult<CatalogEntry> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO catalogos
                (id, tipo, codigo, descripcion, padre_id, estado, atributos, creado_por, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {}
            "#,
            CATALOG_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(kind.slug())
        .bind(&row.code)
        .bind(&row.description)
        .bind(row.parent_id)
        .bind(Status::Active.as_str())
        .bind(&row.attributes)
        .bind(row.created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_query(e, duplicate_code(kind, &row.code)))?;

        entry_from_row(&inserted)
    }

    async fn update(
        &self,
        kind: CatalogKind,
        id: Uuid,
        changes: &CatalogChanges,
    ) -> ApiResult<CatalogEntry> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE catalogos
            SET codigo = $3, descripcion = $4, atributos = $5, modificado_por = $6, updated_at = $7
            WHERE tipo = $1 AND id = $2
            RETURNING {}
            "#,
            CATALOG_COLUMNS
        ))
        .bind(kind.slug())
        .bind(id)
        .bind(&changes.code)
        .bind(&changes.description)
        .bind(&changes.attributes)
        .bind(changes.updated_by)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_query(e, duplicate_code(kind, &changes.code)))?
        .ok_or_else(|| ApiError::not_found(kind.slug(), id))?;

        entry_from_row(&updated)
    }

    async fn set_status(
        &self,
        kind: CatalogKind,
        id: Uuid,
        status: Status,
        updated_by: Uuid,
    ) -> ApiResult<CatalogEntry> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE catalogos
            SET estado = $3, modificado_por = $4, updated_at = $5
            WHERE tipo = $1 AND id = $2
            RETURNING {}
            "#,
            CATALOG_COLUMNS
        ))
        .bind(kind.slug())
        .bind(id)
        .bind(status.as_str())
        .bind(updated_by)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(kind.slug(), id))?;

        entry_from_row(&updated)
    }
}
