//! In-memory stores
//!
//! Used by the test suites and by local runs without a database. Each store
//! guards its rows with one lock, so a uniqueness check and the write that
//! depends on it happen atomically, as the PostgreSQL constraints do.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditRepository, CatalogRepository, RbacRepository, UserRepository};
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

/// Slice out one page of already ordered rows
fn paginate<T: Clone>(rows: &[T], window: PageWindow) -> Vec<T> {
    rows.iter()
        .skip(window.offset() as usize)
        .take(window.limit as usize)
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: Status,
    grants: BTreeSet<Uuid>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RbacTables {
    roles: HashMap<Uuid, RoleRow>,
    permissions: HashMap<Uuid, Permission>,
}

impl RbacTables {
    fn materialize(&self, row: &RoleRow) -> Role {
        let mut permissions: Vec<Permission> = row
            .grants
            .iter()
            .filter_map(|id| self.permissions.get(id).cloned())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));

        Role {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            status: row.status,
            permissions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn role_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }

    fn permission_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.permissions
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    fn role_mut(&mut self, id: Uuid) -> ApiResult<&mut RoleRow> {
        self.roles
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Rol", id))
    }
}

/// Role and permission store
#[derive(Debug, Default)]
pub struct InMemoryRbacRepository {
    tables: RwLock<RbacTables>,
}

impl InMemoryRbacRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RbacRepository for InMemoryRbacRepository {
    async fn list_roles(&self) -> ApiResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables.roles.values().map(|r| tables.materialize(r)).collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn find_role(&self, id: Uuid) -> ApiResult<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).map(|r| tables.materialize(r)))
    }

    async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
        permission_ids: &[Uuid],
    ) -> ApiResult<Role> {
        let mut tables = self.tables.write().await;
        if tables.role_name_taken(name, None) {
            return Err(ApiError::Conflict(format!("El rol '{}' ya existe", name)));
        }

        let now = Utc::now();
        let row = RoleRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(String::from),
            status: Status::Active,
            grants: permission_ids
                .iter()
                .copied()
                .filter(|id| tables.permissions.contains_key(id))
                .collect(),
            created_at: now,
            updated_at: now,
        };
        let role = tables.materialize(&row);
        tables.roles.insert(row.id, row);
        Ok(role)
    }

    async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Role> {
        let mut tables = self.tables.write().await;
        if tables.role_name_taken(name, Some(id)) {
            return Err(ApiError::Conflict(format!("El rol '{}' ya existe", name)));
        }

        let row = tables.role_mut(id)?;
        row.name = name.to_string();
        row.description = description.map(String::from);
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(tables.materialize(&row))
    }

    async fn set_role_status(&self, id: Uuid, status: Status) -> ApiResult<Role> {
        let mut tables = self.tables.write().await;
        let row = tables.role_mut(id)?;
        row.status = status;
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(tables.materialize(&row))
    }

    async fn add_role_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> ApiResult<Role> {
        let mut tables = self.tables.write().await;
        let known: Vec<Uuid> = permission_ids
            .iter()
            .copied()
            .filter(|p| tables.permissions.contains_key(p))
            .collect();

        let row = tables.role_mut(id)?;
        row.grants.extend(known);
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(tables.materialize(&row))
    }

    async fn remove_role_permissions(
        &self,
        id: Uuid,
        permission_ids: &[Uuid],
    ) -> ApiResult<Role> {
        let mut tables = self.tables.write().await;
        let row = tables.role_mut(id)?;
        for permission_id in permission_ids {
            row.grants.remove(permission_id);
        }
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(tables.materialize(&row))
    }

    async fn list_permissions(&self) -> ApiResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        let mut permissions: Vec<Permission> = tables.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn find_permission(&self, id: Uuid) -> ApiResult<Option<Permission>> {
        Ok(self.tables.read().await.permissions.get(&id).cloned())
    }

    async fn find_permissions(&self, ids: &[Uuid]) -> ApiResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        let unique: BTreeSet<&Uuid> = ids.iter().collect();
        let mut permissions: Vec<Permission> = unique
            .into_iter()
            .filter_map(|id| tables.permissions.get(id).cloned())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Permission> {
        let mut tables = self.tables.write().await;
        if tables.permission_name_taken(name, None) {
            return Err(ApiError::Conflict(format!("El permiso '{}' ya existe", name)));
        }

        let now = Utc::now();
        let permission = Permission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(String::from),
            created_at: now,
            updated_at: now,
        };
        tables.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn update_permission(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Permission> {
        let mut tables = self.tables.write().await;
        if tables.permission_name_taken(name, Some(id)) {
            return Err(ApiError::Conflict(format!("El permiso '{}' ya existe", name)));
        }

        let permission = tables
            .permissions
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Permiso", id))?;
        permission.name = name.to_string();
        permission.description = description.map(String::from);
        permission.updated_at = Utc::now();
        Ok(permission.clone())
    }
}

/// User store
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self, window: PageWindow) -> ApiResult<(Vec<User>, i64)> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok((paginate(&all, window), all.len() as i64))
    }

    async fn find(&self, id: Uuid) -> ApiResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, user: &NewUser) -> ApiResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(ApiError::Conflict(format!(
                "El usuario '{}' ya existe",
                user.username
            )));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            password_hash: user.password_hash.clone(),
            role_id: user.role_id,
            status: Status::Active,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_role(&self, id: Uuid, role_id: Uuid) -> ApiResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Usuario", id))?;
        user.role_id = Some(role_id);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_status(&self, id: Uuid, status: Status) -> ApiResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Usuario", id))?;
        let now = Utc::now();
        user.status = status;
        user.deleted_at = match status {
            Status::Active => None,
            Status::Inactive => Some(now),
        };
        user.updated_at = now;
        Ok(user.clone())
    }
}

/// Catalog store for every kind
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    entries: RwLock<HashMap<Uuid, CatalogEntry>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn code_taken(
    entries: &HashMap<Uuid, CatalogEntry>,
    kind: CatalogKind,
    code: &str,
    except: Option<Uuid>,
) -> bool {
    entries
        .values()
        .any(|e| e.kind == kind && e.code == code && Some(e.id) != except)
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list(
        &self,
        kind: CatalogKind,
        query: &CatalogQuery,
        window: PageWindow,
    ) -> ApiResult<(Vec<CatalogEntry>, i64)> {
        let entries = self.entries.read().await;
        let mut matching: Vec<CatalogEntry> = entries
            .values()
            .filter(|e| e.kind == kind && query.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.code.cmp(&b.code));
        Ok((paginate(&matching, window), matching.len() as i64))
    }

    async fn find(&self, kind: CatalogKind, id: Uuid) -> ApiResult<Option<CatalogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&id).filter(|e| e.kind == kind).cloned())
    }

    async fn find_by_code(
        &self,
        kind: CatalogKind,
        code: &str,
    ) -> ApiResult<Option<CatalogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|e| e.kind == kind && e.code == code)
            .cloned())
    }

    async fn count_children(&self, kind: CatalogKind, parent_id: Uuid) -> ApiResult<u64> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| e.kind == kind && e.parent_id == Some(parent_id))
            .count() as u64)
    }

    async fn insert(&self, kind: CatalogKind, row: &CatalogInsert) -> ApiResult<CatalogEntry> {
        let mut entries = self.entries.write().await;
        if code_taken(&entries, kind, &row.code, None) {
            return Err(ApiError::Conflict(format!(
                "El codigo '{}' ya existe en {}",
                row.code, kind
            )));
        }

        let now = Utc::now();
        let entry = CatalogEntry {
            id: Uuid::new_v4(),
            kind,
            code: row.code.clone(),
            description: row.description.clone(),
            parent_id: row.parent_id,
            status: Status::Active,
            attributes: row.attributes.clone(),
            created_by: row.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update(
        &self,
        kind: CatalogKind,
        id: Uuid,
        changes: &CatalogChanges,
    ) -> ApiResult<CatalogEntry> {
        let mut entries = self.entries.write().await;
        if code_taken(&entries, kind, &changes.code, Some(id)) {
            return Err(ApiError::Conflict(format!(
                "El codigo '{}' ya existe en {}",
                changes.code, kind
            )));
        }

        let entry = entries
            .get_mut(&id)
            .filter(|e| e.kind == kind)
            .ok_or_else(|| ApiError::not_found(kind.slug(), id))?;
        entry.code = changes.code.clone();
        entry.description = changes.description.clone();
        entry.attributes = changes.attributes.clone();
        entry.updated_by = Some(changes.updated_by);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn set_status(
        &self,
        kind: CatalogKind,
        id: Uuid,
        status: Status,
        updated_by: Uuid,
    ) -> ApiResult<CatalogEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .filter(|e| e.kind == kind)
            .ok_or_else(|| ApiError::not_found(kind.slug(), id))?;
        entry.status = status;
        entry.updated_by = Some(updated_by);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}

/// Audit trail held in insertion order
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record written so far, oldest first
    pub async fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, record: &NewAuditRecord) -> ApiResult<AuditRecord> {
        let stored = AuditRecord {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            action: record.action.clone(),
            detail: record.detail.clone(),
            affected_role_id: record.affected_role_id,
            affected_permission_id: record.affected_permission_id,
            before: record.before.clone(),
            after: record.after.clone(),
            meta: record.meta.clone(),
            created_at: Utc::now(),
        };
        self.records.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        query: &AuditQuery,
        window: PageWindow,
    ) -> ApiResult<(Vec<AuditRecord>, i64)> {
        let records = self.records.read().await;
        let matching: Vec<AuditRecord> = records
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok((paginate(&matching, window), matching.len() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn insert_row(code: &str, parent_id: Option<Uuid>) -> CatalogInsert {
        CatalogInsert {
            code: code.to_string(),
            description: format!("Entrada {}", code),
            parent_id,
            attributes: None,
            created_by: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_is_a_conflict_per_kind() {
        let repo = InMemoryCatalogRepository::new();
        repo.insert(CatalogKind::District, &insert_row("05", None))
            .await
            .unwrap();

        let err = repo
            .insert(CatalogKind::District, &insert_row("05", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Same code under another kind is fine.
        repo.insert(CatalogKind::City, &insert_row("05", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_one_code_admit_exactly_one() {
        let repo = Arc::new(InMemoryCatalogRepository::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.insert(CatalogKind::Environment, &insert_row("01.01", None))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(ApiError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_find_is_scoped_to_kind() {
        let repo = InMemoryCatalogRepository::new();
        let entry = repo
            .insert(CatalogKind::Area, &insert_row("A1", None))
            .await
            .unwrap();

        assert!(repo.find(CatalogKind::Area, entry.id).await.unwrap().is_some());
        assert!(repo.find(CatalogKind::City, entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_role_grants_skip_unknown_permissions() {
        let repo = InMemoryRbacRepository::new();
        let listar = repo.create_permission("ufv:listar", None).await.unwrap();
        let role = repo
            .create_role("AUXILIAR", None, &[listar.id, Uuid::new_v4()])
            .await
            .unwrap();

        assert_eq!(role.permission_names(), vec!["ufv:listar".to_string()]);

        let role = repo.remove_role_permissions(role.id, &[listar.id]).await.unwrap();
        assert!(role.permissions.is_empty());
    }

    #[tokio::test]
    async fn test_user_status_toggle_sets_deleted_at() {
        let repo = InMemoryUserRepository::new();
        let user = repo
            .create(&NewUser {
                username: "jperez".to_string(),
                full_name: "Juan Perez".to_string(),
                password_hash: "hash".to_string(),
                role_id: None,
            })
            .await
            .unwrap();

        let inactive = repo.set_status(user.id, Status::Inactive).await.unwrap();
        assert!(inactive.deleted_at.is_some());

        let active = repo.set_status(user.id, Status::Active).await.unwrap();
        assert!(active.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_audit_list_is_newest_first() {
        let repo = InMemoryAuditRepository::new();
        let actor = Uuid::new_v4();
        for detail in ["uno", "dos", "tres"] {
            repo.append(&NewAuditRecord::new(
                actor,
                crate::models::audit::AuditAction::CreateRole,
                detail,
            ))
            .await
            .unwrap();
        }

        let (records, total) = repo
            .list(&AuditQuery::default(), PageWindow::new(None, Some(2)))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(records[0].detail, "tres");
        assert_eq!(records[1].detail, "dos");
    }
}
