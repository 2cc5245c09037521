//! Repositories for database operations
//!
//! Each store is a trait with a PostgreSQL implementation and an in-memory
//! implementation in [`memory`]. Write operations report duplicate business
//! keys as [`ApiError::Conflict`](crate::error::ApiError::Conflict) and
//! missing rows as `NotFound`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        PageWindow, Status,
        audit::{AuditQuery, AuditRecord, NewAuditRecord},
        catalog::{CatalogChanges, CatalogEntry, CatalogInsert, CatalogKind, CatalogQuery},
        rbac::{Permission, Role},
        user::{NewUser, User},
    },
};

pub mod audit;
pub mod catalog;
pub mod memory;
pub mod rbac;
pub mod user;

pub use audit::PgAuditRepository;
pub use catalog::PgCatalogRepository;
pub use rbac::PgRbacRepository;
pub use user::PgUserRepository;

/// Roles, permissions and the grants between them
#[async_trait]
pub trait RbacRepository: Send + Sync {
    async fn list_roles(&self) -> ApiResult<Vec<Role>>;

    async fn find_role(&self, id: Uuid) -> ApiResult<Option<Role>>;

    async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
        permission_ids: &[Uuid],
    ) -> ApiResult<Role>;

    async fn update_role(&self, id: Uuid, name: &str, description: Option<&str>)
    -> ApiResult<Role>;

    async fn set_role_status(&self, id: Uuid, status: Status) -> ApiResult<Role>;

    /// Grant permissions; already granted ones are left untouched.
    async fn add_role_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> ApiResult<Role>;

    async fn remove_role_permissions(&self, id: Uuid, permission_ids: &[Uuid])
    -> ApiResult<Role>;

    async fn list_permissions(&self) -> ApiResult<Vec<Permission>>;

    async fn find_permission(&self, id: Uuid) -> ApiResult<Option<Permission>>;

    /// Permissions for the given ids; unknown ids are skipped.
    async fn find_permissions(&self, ids: &[Uuid]) -> ApiResult<Vec<Permission>>;

    async fn create_permission(&self, name: &str, description: Option<&str>)
    -> ApiResult<Permission>;

    async fn update_permission(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Permission>;
}

/// User accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self, window: PageWindow) -> ApiResult<(Vec<User>, i64)>;

    async fn find(&self, id: Uuid) -> ApiResult<Option<User>>;

    async fn create(&self, user: &NewUser) -> ApiResult<User>;

    async fn set_role(&self, id: Uuid, role_id: Uuid) -> ApiResult<User>;

    /// Toggle status; inactivating stamps `deleted_at`, reactivating clears it.
    async fn set_status(&self, id: Uuid, status: Status) -> ApiResult<User>;
}

/// Parametric catalog rows of every kind
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list(
        &self,
        kind: CatalogKind,
        query: &CatalogQuery,
        window: PageWindow,
    ) -> ApiResult<(Vec<CatalogEntry>, i64)>;

    async fn find(&self, kind: CatalogKind, id: Uuid) -> ApiResult<Option<CatalogEntry>>;

    async fn find_by_code(&self, kind: CatalogKind, code: &str)
    -> ApiResult<Option<CatalogEntry>>;

    async fn count_children(&self, kind: CatalogKind, parent_id: Uuid) -> ApiResult<u64>;

    /// Insert a row. A duplicate `(kind, code)` fails with `Conflict`
    /// atomically; an existing row is never overwritten.
    async fn insert(&self, kind: CatalogKind, row: &CatalogInsert) -> ApiResult<CatalogEntry>;

    async fn update(
        &self,
        kind: CatalogKind,
        id: Uuid,
        changes: &CatalogChanges,
    ) -> ApiResult<CatalogEntry>;

    async fn set_status(
        &self,
        kind: CatalogKind,
        id: Uuid,
        status: Status,
        updated_by: Uuid,
    ) -> ApiResult<CatalogEntry>;
}

/// Append-only audit trail: no update or delete operation exists.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, record: &NewAuditRecord) -> ApiResult<AuditRecord>;

    /// Records matching the filters, newest first
    async fn list(&self, query: &AuditQuery, window: PageWindow)
    -> ApiResult<(Vec<AuditRecord>, i64)>;
}

/// Parse a status column value
pub(crate) fn status_column(value: &str) -> ApiResult<Status> {
    Status::parse(value)
        .ok_or_else(|| ApiError::Internal(format!("unexpected status value '{}'", value)))
}
