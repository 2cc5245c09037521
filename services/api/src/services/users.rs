//! User account administration

use std::sync::Arc;

use common::password::hash_password;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    audit::AuditRecorder,
    context::AuthContext,
    error::{ApiError, ApiResult},
    models::{
        Page, PageWindow, Status,
        audit::{AuditAction, NewAuditRecord, RequestMeta},
        rbac::Role,
        user::{CreateUserRequest, NewUser, User},
    },
    repositories::{RbacRepository, UserRepository},
    validation::{validate_password, validate_username},
};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RbacRepository>,
    recorder: AuditRecorder,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RbacRepository>,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            users,
            roles,
            recorder,
        }
    }

    pub async fn list(&self, page: Option<u32>, limit: Option<u32>) -> ApiResult<Page<User>> {
        let window = PageWindow::new(page, limit);
        let (items, total) = self.users.list(window).await?;
        Ok(Page {
            items,
            page: window.page,
            limit: window.limit,
            total,
        })
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<User> {
        self.users
            .find(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Usuario", id))
    }

    /// Only active roles may be handed out
    async fn assignable_role(&self, role_id: Uuid) -> ApiResult<Role> {
        let role = self
            .roles
            .find_role(role_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Rol", role_id))?;

        if role.status != Status::Active {
            return Err(ApiError::Validation(format!(
                "El rol '{}' esta inactivo",
                role.name
            )));
        }
        Ok(role)
    }

    pub async fn create(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        request: CreateUserRequest,
    ) -> ApiResult<User> {
        let username = request.username.trim().to_string();
        validate_username(&username).map_err(ApiError::Validation)?;
        validate_password(&request.password).map_err(ApiError::Validation)?;
        let full_name = request.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ApiError::Validation(
                "El nombre completo es obligatorio".to_string(),
            ));
        }

        let role = match request.role_id {
            Some(role_id) => Some(self.assignable_role(role_id).await?),
            None => None,
        };

        let password_hash = hash_password(&request.password).map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::Internal("password hashing failed".to_string())
        })?;

        let user = self
            .users
            .create(&NewUser {
                username,
                full_name,
                password_hash,
                role_id: role.as_ref().map(|r| r.id),
            })
            .await?;

        info!(user = %user.username, by = %actor.username(), "User created");

        if let Some(role) = role {
            self.record_assignment(actor, meta, &user, None, &role).await;
        }

        Ok(user)
    }

    pub async fn assign_role(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        id: Uuid,
        role_id: Uuid,
    ) -> ApiResult<User> {
        let before = self.get(id).await?;
        let role = self.assignable_role(role_id).await?;
        let user = self.users.set_role(id, role.id).await?;

        info!(user = %user.username, role = %role.name, by = %actor.username(), "Role assigned");
        self.record_assignment(actor, meta, &user, before.role_id, &role)
            .await;

        Ok(user)
    }

    async fn record_assignment(
        &self,
        actor: &AuthContext,
        meta: RequestMeta,
        user: &User,
        previous_role: Option<Uuid>,
        role: &Role,
    ) {
        self.recorder
            .record(
                NewAuditRecord::new(
                    actor.user_id(),
                    AuditAction::AssignRole,
                    format!("Rol '{}' asignado al usuario '{}'", role.name, user.username),
                )
                .role(role.id)
                .before(&serde_json::json!({ "usuario_id": user.id, "rol_id": previous_role }))
                .after(&serde_json::json!({ "usuario_id": user.id, "rol_id": role.id }))
                .meta(meta),
            )
            .await;
    }

    /// Status toggle; inactivation is the soft delete.
    pub async fn set_status(
        &self,
        actor: &AuthContext,
        id: Uuid,
        status: Status,
    ) -> ApiResult<User> {
        if id == actor.user_id() && status == Status::Inactive {
            return Err(ApiError::Validation(
                "No puede desactivar su propio usuario".to_string(),
            ));
        }

        let user = self.users.set_status(id, status).await?;
        info!(user = %user.username, status = %status, by = %actor.username(), "User status changed");
        Ok(user)
    }
}
