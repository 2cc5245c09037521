//! Role and permission administration

use std::{collections::BTreeSet, sync::Arc};

use tracing::info;
use uuid::Uuid;

use crate::{
    audit::AuditRecorder,
    context::AuthContext,
    error::{ApiError, ApiResult},
    models::{
        Status,
        audit::{AuditAction, NewAuditRecord, RequestMeta},
        rbac::{
            NewPermission, NewRole, Permission, PermissionAssignment, Role, UpdatePermission,
            UpdateRole,
        },
    },
    repositories::RbacRepository,
    validation::{validate_permission_name, validate_role_name},
};

#[derive(Clone)]
pub struct RbacService {
    repository: Arc<dyn RbacRepository>,
    recorder: AuditRecorder,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RbacService {
    pub fn new(repository: Arc<dyn RbacRepository>, recorder: AuditRecorder) -> Self {
        Self {
            repository,
            recorder,
        }
    }

    pub async fn list_roles(&self) -> ApiResult<Vec<Role>> {
        self.repository.list_roles().await
    }

    pub async fn get_role(&self, id: Uuid) -> ApiResult<Role> {
        self.repository
            .find_role(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Rol", id))
    }

    /// Resolve permission ids, failing if any of them is unknown
    async fn require_permissions(&self, ids: &[Uuid]) -> ApiResult<Vec<Permission>> {
        let wanted: BTreeSet<Uuid> = ids.iter().copied().collect();
        let found = self
            .repository
            .find_permissions(&wanted.iter().copied().collect::<Vec<_>>())
            .await?;

        let known: BTreeSet<Uuid> = found.iter().map(|p| p.id).collect();
        let missing: Vec<String> = wanted
            .difference(&known)
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::NotFound(format!(
                "Permisos inexistentes: {}",
                missing.join(", ")
            )));
        }
        Ok(found)
    }

    pub async fn create_role(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        input: NewRole,
    ) -> ApiResult<Role> {
        let name = input.name.trim().to_string();
        validate_role_name(&name).map_err(ApiError::Validation)?;
        let permissions = self.require_permissions(&input.permission_ids).await?;
        let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();

        let role = self
            .repository
            .create_role(
                &name,
                non_blank(input.description).as_deref(),
                &permission_ids,
            )
            .await?;

        info!(role = %role.name, by = %actor.username(), "Role created");
        self.recorder
            .record(
                NewAuditRecord::new(
                    actor.user_id(),
                    AuditAction::CreateRole,
                    format!("Rol '{}' creado", role.name),
                )
                .role(role.id)
                .after(&role)
                .meta(meta),
            )
            .await;

        Ok(role)
    }

    pub async fn update_role(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        id: Uuid,
        input: UpdateRole,
    ) -> ApiResult<Role> {
        let before = self.get_role(id).await?;

        let name = match input.name {
            Some(name) => name.trim().to_string(),
            None => before.name.clone(),
        };
        validate_role_name(&name).map_err(ApiError::Validation)?;
        let description = match input.description {
            Some(description) => non_blank(Some(description)),
            None => before.description.clone(),
        };

        let role = self
            .repository
            .update_role(id, &name, description.as_deref())
            .await?;

        info!(role = %role.name, by = %actor.username(), "Role updated");
        self.recorder
            .record(
                NewAuditRecord::new(
                    actor.user_id(),
                    AuditAction::UpdateRole,
                    format!("Rol '{}' editado", role.name),
                )
                .role(role.id)
                .before(&before)
                .after(&role)
                .meta(meta),
            )
            .await;

        Ok(role)
    }

    pub async fn set_role_status(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        id: Uuid,
        status: Status,
    ) -> ApiResult<Role> {
        let before = self.get_role(id).await?;
        let role = self.repository.set_role_status(id, status).await?;

        info!(role = %role.name, status = %status, by = %actor.username(), "Role status changed");
        self.recorder
            .record(
                NewAuditRecord::new(
                    actor.user_id(),
                    AuditAction::ChangeRoleStatus,
                    format!(
                        "Estado del rol '{}' cambiado de {} a {}",
                        role.name, before.status, role.status
                    ),
                )
                .role(role.id)
                .before(&before)
                .after(&role)
                .meta(meta),
            )
            .await;

        Ok(role)
    }

    /// Grant permissions to a role. One audit record covers the whole request.
    pub async fn assign_permissions(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        id: Uuid,
        input: PermissionAssignment,
    ) -> ApiResult<Role> {
        self.change_grants(actor, meta, id, input, AuditAction::AssignPermission)
            .await
    }

    /// Revoke permissions from a role. One audit record covers the whole request.
    pub async fn revoke_permissions(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        id: Uuid,
        input: PermissionAssignment,
    ) -> ApiResult<Role> {
        self.change_grants(actor, meta, id, input, AuditAction::RevokePermission)
            .await
    }

    async fn change_grants(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        id: Uuid,
        input: PermissionAssignment,
        action: AuditAction,
    ) -> ApiResult<Role> {
        if input.permission_ids.is_empty() {
            return Err(ApiError::Validation(
                "Debe indicar al menos un permiso".to_string(),
            ));
        }

        let before = self.get_role(id).await?;
        let permissions = self.require_permissions(&input.permission_ids).await?;
        let ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        let names: Vec<&str> = permissions.iter().map(|p| p.name.as_str()).collect();

        let (role, detail) = match action {
            AuditAction::RevokePermission => (
                self.repository.remove_role_permissions(id, &ids).await?,
                format!(
                    "Permisos quitados del rol '{}': {}",
                    before.name,
                    names.join(", ")
                ),
            ),
            _ => (
                self.repository.add_role_permissions(id, &ids).await?,
                format!(
                    "Permisos asignados al rol '{}': {}",
                    before.name,
                    names.join(", ")
                ),
            ),
        };

        info!(role = %role.name, by = %actor.username(), "{}", detail);

        let mut record = NewAuditRecord::new(actor.user_id(), action, detail)
            .role(role.id)
            .before(&before.permission_names())
            .after(&role.permission_names())
            .meta(meta);
        if let [single] = ids.as_slice() {
            record = record.permission(*single);
        }
        self.recorder.record(record).await;

        Ok(role)
    }

    pub async fn list_permissions(&self) -> ApiResult<Vec<Permission>> {
        self.repository.list_permissions().await
    }

    pub async fn create_permission(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        input: NewPermission,
    ) -> ApiResult<Permission> {
        let name = input.name.trim().to_string();
        validate_permission_name(&name).map_err(ApiError::Validation)?;

        let permission = self
            .repository
            .create_permission(&name, non_blank(input.description).as_deref())
            .await?;

        info!(permission = %permission.name, by = %actor.username(), "Permission created");
        self.recorder
            .record(
                NewAuditRecord::new(
                    actor.user_id(),
                    AuditAction::CreatePermission,
                    format!("Permiso '{}' creado", permission.name),
                )
                .permission(permission.id)
                .after(&permission)
                .meta(meta),
            )
            .await;

        Ok(permission)
    }

    pub async fn update_permission(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        id: Uuid,
        input: UpdatePermission,
    ) -> ApiResult<Permission> {
        let before = self
            .repository
            .find_permission(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Permiso", id))?;

        let name = match input.name {
            Some(name) => name.trim().to_string(),
            None => before.name.clone(),
        };
        validate_permission_name(&name).map_err(ApiError::Validation)?;
        let description = match input.description {
            Some(description) => non_blank(Some(description)),
            None => before.description.clone(),
        };

        let permission = self
            .repository
            .update_permission(id, &name, description.as_deref())
            .await?;

        info!(permission = %permission.name, by = %actor.username(), "Permission updated");
        self.recorder
            .record(
                NewAuditRecord::new(
                    actor.user_id(),
                    AuditAction::UpdatePermission,
                    format!("Permiso '{}' editado", permission.name),
                )
                .permission(permission.id)
                .before(&before)
                .after(&permission)
                .meta(meta),
            )
            .await;

        Ok(permission)
    }
}
