//! Audit trail models for role and permission mutations
//!
//! Rows map one-to-one onto the `auditoria_roles_permisos` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutations recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CreateRole,
    UpdateRole,
    ChangeRoleStatus,
    AssignPermission,
    RevokePermission,
    CreatePermission,
    UpdatePermission,
    AssignRole,
}

impl AuditAction {
    /// Tag persisted in the `accion` column
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateRole => "CREAR_ROL",
            AuditAction::UpdateRole => "EDITAR_ROL",
            AuditAction::ChangeRoleStatus => "CAMBIAR_ESTADO_ROL",
            AuditAction::AssignPermission => "ASIGNAR_PERMISO",
            AuditAction::RevokePermission => "QUITAR_PERMISO",
            AuditAction::CreatePermission => "CREAR_PERMISO",
            AuditAction::UpdatePermission => "EDITAR_PERMISO",
            AuditAction::AssignRole => "ASIGNAR_ROL",
        }
    }
}

/// Network and device details of the request that caused a mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    #[serde(rename = "equipo")]
    pub device: Option<String>,
}

/// Persisted audit record. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub id: Uuid,
    #[serde(rename = "usuario_id")]
    pub user_id: Uuid,
    #[serde(rename = "accion")]
    pub action: String,
    #[serde(rename = "detalle")]
    pub detail: String,
    #[serde(rename = "rol_afectado_id")]
    pub affected_role_id: Option<Uuid>,
    #[serde(rename = "permiso_afectado_id")]
    pub affected_permission_id: Option<Uuid>,
    #[serde(rename = "datos_antes")]
    pub before: Option<serde_json::Value>,
    #[serde(rename = "datos_despues")]
    pub after: Option<serde_json::Value>,
    #[serde(flatten)]
    pub meta: RequestMeta,
    #[serde(rename = "fecha")]
    pub created_at: DateTime<Utc>,
}

/// Audit payload before it is written; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditRecord {
    pub user_id: Uuid,
    pub action: String,
    pub detail: String,
    pub affected_role_id: Option<Uuid>,
    pub affected_permission_id: Option<Uuid>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub meta: RequestMeta,
}

impl NewAuditRecord {
    pub fn new(user_id: Uuid, action: AuditAction, detail: impl Into<String>) -> Self {
        Self {
            user_id,
            action: action.as_str().to_string(),
            detail: detail.into(),
            affected_role_id: None,
            affected_permission_id: None,
            before: None,
            after: None,
            meta: RequestMeta::default(),
        }
    }

    pub fn role(mut self, role_id: Uuid) -> Self {
        self.affected_role_id = Some(role_id);
        self
    }

    pub fn permission(mut self, permission_id: Uuid) -> Self {
        self.affected_permission_id = Some(permission_id);
        self
    }

    /// Snapshot of the affected entity before the mutation
    pub fn before<T: Serialize>(mut self, state: &T) -> Self {
        self.before = serde_json::to_value(state).ok();
        self
    }

    /// Snapshot of the affected entity after the mutation
    pub fn after<T: Serialize>(mut self, state: &T) -> Self {
        self.after = serde_json::to_value(state).ok();
        self
    }

    pub fn meta(mut self, meta: RequestMeta) -> Self {
        self.meta = meta;
        self
    }
}

/// Filters for browsing the audit trail
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "usuario_id")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "accion")]
    pub action: Option<String>,
    #[serde(rename = "rol_id")]
    pub role_id: Option<Uuid>,
    #[serde(rename = "permiso_id")]
    pub permission_id: Option<Uuid>,
    #[serde(rename = "desde")]
    pub from: Option<DateTime<Utc>>,
    #[serde(rename = "hasta")]
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.user_id.is_none_or(|id| record.user_id == id)
            && self.action.as_deref().is_none_or(|a| record.action == a)
            && self
                .role_id
                .is_none_or(|id| record.affected_role_id == Some(id))
            && self
                .permission_id
                .is_none_or(|id| record.affected_permission_id == Some(id))
            && self.from.is_none_or(|from| record.created_at >= from)
            && self.to.is_none_or(|to| record.created_at <= to)
    }
}
