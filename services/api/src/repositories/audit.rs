//! PostgreSQL audit trail store
//!
//! Rows are only ever inserted; a trigger in the schema rejects UPDATE and
//! DELETE on `auditoria_roles_permisos`.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::AuditRepository;
use crate::{
    error::ApiResult,
    models::{
        PageWindow,
        audit::{AuditQuery, AuditRecord, NewAuditRecord, RequestMeta},
    },
};

const AUDIT_COLUMNS: &str = "id, usuario_id, accion, detalle, rol_afectado_id, \
     permiso_afectado_id, datos_antes, datos_despues, ip, user_agent, equipo, fecha";

const AUDIT_FILTER: &str = "($1::uuid IS NULL OR usuario_id = $1) \
     AND ($2::text IS NULL OR accion = $2) \
     AND ($3::uuid IS NULL OR rol_afectado_id = $3) \
     AND ($4::uuid IS NULL OR permiso_afectado_id = $4) \
     AND ($5::timestamptz IS NULL OR fecha >= $5) \
     AND ($6::timestamptz IS NULL OR fecha <= $6)";

#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &PgRow) -> ApiResult<AuditRecord> {
    Ok(AuditRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("usuario_id")?,
        action: row.try_get("accion")?,
        detail: row.try_get("detalle")?,
        affected_role_id: row.try_get("rol_afectado_id")?,
        affected_permission_id: row.try_get("permiso_afectado_id")?,
        before: row.try_get("datos_antes")?,
        after: row.try_get("datos_despues")?,
        meta: RequestMeta {
            ip: row.try_get("ip")?,
            user_agent: row.try_get("user_agent")?,
            device: row.try_get("equipo")?,
        },
        created_at: row.try_get("fecha")?,
    })
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn append(&self, record: &NewAuditRecord) -> ApiResult<AuditRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO auditoria_roles_permisos
                (id, usuario_id, accion, detalle, rol_afectado_id, permiso_afectado_id,
                 datos_antes, datos_despues, ip, user_agent, equipo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            AUDIT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(&record.action)
        .bind(&record.detail)
        .bind(record.affected_role_id)
        .bind(record.affected_permission_id)
        .bind(&record.before)
        .bind(&record.after)
        .bind(&record.meta.ip)
        .bind(&record.meta.user_agent)
        .bind(&record.meta.device)
        .fetch_one(&self.pool)
        .await?;

        record_from_row(&row)
    }

    async fn list(
        &self,
        query: &AuditQuery,
        window: PageWindow,
    ) -> ApiResult<(Vec<AuditRecord>, i64)> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM auditoria_roles_permisos WHERE {}",
            AUDIT_FILTER
        ))
        .bind(query.user_id)
        .bind(query.action.as_deref())
        .bind(query.role_id)
        .bind(query.permission_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM auditoria_roles_permisos WHERE {} ORDER BY fecha DESC, id LIMIT $7 OFFSET $8",
            AUDIT_COLUMNS, AUDIT_FILTER
        ))
        .bind(query.user_id)
        .bind(query.action.as_deref())
        .bind(query.role_id)
        .bind(query.permission_id)
        .bind(query.from)
        .bind(query.to)
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        let records = rows.iter().map(record_from_row).collect::<ApiResult<Vec<_>>>()?;
        Ok((records, total))
    }
}
