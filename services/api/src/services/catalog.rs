//! Parametric catalog operations shared by every catalog kind

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    codes::{is_child_code, next_child_code},
    context::AuthContext,
    error::{ApiError, ApiResult},
    models::{
        Page, PageWindow, Status,
        catalog::{
            CatalogChanges, CatalogEntry, CatalogInsert, CatalogKind, CatalogQuery,
            CodeSuggestion, NewCatalogEntry, UpdateCatalogEntry,
        },
    },
    repositories::CatalogRepository,
    validation::{validate_code, validate_description},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn CatalogRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(
        &self,
        kind: CatalogKind,
        query: &CatalogQuery,
    ) -> ApiResult<Page<CatalogEntry>> {
        let window = PageWindow::new(query.page, query.limit);
        let (items, total) = self.repository.list(kind, query, window).await?;
        Ok(Page {
            items,
            page: window.page,
            limit: window.limit,
            total,
        })
    }

    pub async fn get(&self, kind: CatalogKind, id: Uuid) -> ApiResult<CatalogEntry> {
        self.repository
            .find(kind, id)
            .await?
            .ok_or_else(|| ApiError::not_found(kind.slug(), id))
    }

    /// Parent row of a hierarchical entry, which must exist and be active
    async fn active_parent(&self, kind: CatalogKind, parent_id: Uuid) -> ApiResult<CatalogEntry> {
        let parent = self
            .repository
            .find(kind, parent_id)
            .await?
            .ok_or_else(|| ApiError::not_found(kind.slug(), parent_id))?;

        if parent.status != Status::Active {
            return Err(ApiError::Validation(format!(
                "El registro padre '{}' de {} esta inactivo",
                parent.code, kind
            )));
        }
        Ok(parent)
    }

    fn check_child_code(kind: CatalogKind, parent: &CatalogEntry, code: &str) -> ApiResult<()> {
        if is_child_code(&parent.code, code) {
            Ok(())
        } else {
            Err(ApiError::Validation(format!(
                "El codigo de {} debe comenzar con '{}.'",
                kind, parent.code
            )))
        }
    }

    /// Early duplicate check; the store's uniqueness constraint still decides
    /// races between concurrent writers.
    async fn ensure_code_free(
        &self,
        kind: CatalogKind,
        code: &str,
        except: Option<Uuid>,
    ) -> ApiResult<()> {
        match self.repository.find_by_code(kind, code).await? {
            Some(existing) if Some(existing.id) != except => Err(ApiError::Conflict(format!(
                "El codigo '{}' ya existe en {}",
                code, kind
            ))),
            _ => Ok(()),
        }
    }

    /// Children codes embed the parent's code, so a parent with children keeps it.
    async fn ensure_no_children(&self, kind: CatalogKind, entry: &CatalogEntry) -> ApiResult<()> {
        for child_kind in kind.children() {
            if self.repository.count_children(child_kind, entry.id).await? > 0 {
                return Err(ApiError::Validation(format!(
                    "El codigo '{}' de {} tiene registros de {} que dependen de el",
                    entry.code, kind, child_kind
                )));
            }
        }
        Ok(())
    }

    pub async fn create(
        &self,
        kind: CatalogKind,
        actor: &AuthContext,
        input: NewCatalogEntry,
    ) -> ApiResult<CatalogEntry> {
        let code = input.code.trim().to_string();
        validate_code(&code).map_err(ApiError::Validation)?;
        validate_description(&input.description).map_err(ApiError::Validation)?;

        self.ensure_code_free(kind, &code, None).await?;

        let parent_id = match (kind.hierarchy(), input.parent_id) {
            (Some(hierarchy), Some(parent_id)) => {
                let parent = self.active_parent(hierarchy.parent, parent_id).await?;
                Self::check_child_code(kind, &parent, &code)?;
                Some(parent.id)
            }
            (Some(hierarchy), None) => {
                return Err(ApiError::Validation(format!(
                    "{} requiere un registro padre de {}",
                    kind, hierarchy.parent
                )));
            }
            (None, Some(_)) => {
                return Err(ApiError::Validation(format!(
                    "{} no admite registro padre",
                    kind
                )));
            }
            (None, None) => None,
        };

        let entry = self
            .repository
            .insert(
                kind,
                &CatalogInsert {
                    code,
                    description: input.description.trim().to_string(),
                    parent_id,
                    attributes: input.attributes,
                    created_by: actor.user_id(),
                },
            )
            .await?;

        info!(kind = %kind, code = %entry.code, by = %actor.username(), "Catalog entry created");
        Ok(entry)
    }

    pub async fn update(
        &self,
        kind: CatalogKind,
        id: Uuid,
        actor: &AuthContext,
        input: UpdateCatalogEntry,
    ) -> ApiResult<CatalogEntry> {
        let current = self.get(kind, id).await?;

        let code = match input.code {
            Some(code) => code.trim().to_string(),
            None => current.code.clone(),
        };
        validate_code(&code).map_err(ApiError::Validation)?;
        let description = input.description.unwrap_or_else(|| current.description.clone());
        validate_description(&description).map_err(ApiError::Validation)?;

        if code != current.code {
            self.ensure_code_free(kind, &code, Some(id)).await?;
            self.ensure_no_children(kind, &current).await?;

            if let (Some(hierarchy), Some(parent_id)) = (kind.hierarchy(), current.parent_id) {
                let parent = self
                    .repository
                    .find(hierarchy.parent, parent_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found(hierarchy.parent.slug(), parent_id))?;
                Self::check_child_code(kind, &parent, &code)?;
            }
        }

        let entry = self
            .repository
            .update(
                kind,
                id,
                &CatalogChanges {
                    code,
                    description: description.trim().to_string(),
                    attributes: input.attributes.or(current.attributes),
                    updated_by: actor.user_id(),
                },
            )
            .await?;

        info!(kind = %kind, code = %entry.code, by = %actor.username(), "Catalog entry updated");
        Ok(entry)
    }

    /// Status toggle; rows are never physically deleted.
    pub async fn set_status(
        &self,
        kind: CatalogKind,
        id: Uuid,
        actor: &AuthContext,
        status: Status,
    ) -> ApiResult<CatalogEntry> {
        let entry = self
            .repository
            .set_status(kind, id, status, actor.user_id())
            .await?;

        info!(kind = %kind, code = %entry.code, status = %status, by = %actor.username(), "Catalog entry status changed");
        Ok(entry)
    }

    /// Advisory next code for a new child of `parent_id`.
    ///
    /// Two callers may receive the same suggestion; the second insert of
    /// that code fails with `Conflict` and the client asks again.
    pub async fn suggest_code(&self, kind: CatalogKind, parent_id: Uuid) -> ApiResult<CodeSuggestion> {
        let hierarchy = kind.hierarchy().ok_or_else(|| {
            ApiError::Validation(format!("{} no genera codigos jerarquicos", kind))
        })?;

        let parent = self
            .repository
            .find(hierarchy.parent, parent_id)
            .await?
            .ok_or_else(|| ApiError::not_found(hierarchy.parent.slug(), parent_id))?;
        let children = self.repository.count_children(kind, parent.id).await?;

        Ok(CodeSuggestion {
            parent_id: parent.id,
            code: next_child_code(&parent.code, children, hierarchy.width),
            parent_code: parent.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryCatalogRepository;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryCatalogRepository::new()))
    }

    fn actor() -> AuthContext {
        AuthContext::new(Uuid::new_v4(), "catalogador", None, Vec::new())
    }

    fn entry(code: &str, parent_id: Option<Uuid>) -> NewCatalogEntry {
        NewCatalogEntry {
            code: code.to_string(),
            description: format!("Registro {}", code),
            parent_id,
            attributes: None,
        }
    }

    #[tokio::test]
    async fn test_suggestion_follows_child_count() {
        let svc = service();
        let actor = actor();
        let unit = svc
            .create(CatalogKind::OrganizationalUnit, &actor, entry("01", None))
            .await
            .unwrap();

        let first = svc.suggest_code(CatalogKind::Environment, unit.id).await.unwrap();
        assert_eq!(first.code, "01.01");
        assert_eq!(first.parent_code, "01");

        svc.create(CatalogKind::Environment, &actor, entry(&first.code, Some(unit.id)))
            .await
            .unwrap();
        let second = svc.suggest_code(CatalogKind::Environment, unit.id).await.unwrap();
        assert_eq!(second.code, "01.02");
    }

    #[tokio::test]
    async fn test_positions_use_three_digit_suffix() {
        let svc = service();
        let actor = actor();
        let unit = svc
            .create(CatalogKind::OrganizationalUnit, &actor, entry("02", None))
            .await
            .unwrap();
        let env = svc
            .create(CatalogKind::Environment, &actor, entry("02.01", Some(unit.id)))
            .await
            .unwrap();

        let suggestion = svc.suggest_code(CatalogKind::Position, env.id).await.unwrap();
        assert_eq!(suggestion.code, "02.01.001");
    }

    #[tokio::test]
    async fn test_same_suggestion_committed_twice_conflicts() {
        let svc = service();
        let actor = actor();
        let group = svc
            .create(CatalogKind::AccountingGroup, &actor, entry("10", None))
            .await
            .unwrap();

        let a = svc.suggest_code(CatalogKind::Auxiliary, group.id).await.unwrap();
        let b = svc.suggest_code(CatalogKind::Auxiliary, group.id).await.unwrap();
        assert_eq!(a.code, b.code);

        svc.create(CatalogKind::Auxiliary, &actor, entry(&a.code, Some(group.id)))
            .await
            .unwrap();
        let err = svc
            .create(CatalogKind::Auxiliary, &actor, entry(&b.code, Some(group.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_suggestion_for_flat_kind_is_a_validation_error() {
        let err = service()
            .suggest_code(CatalogKind::District, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_suggestion_for_missing_parent_is_not_found() {
        let err = service()
            .suggest_code(CatalogKind::Environment, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_child_code_must_extend_parent_code() {
        let svc = service();
        let actor = actor();
        let unit = svc
            .create(CatalogKind::OrganizationalUnit, &actor, entry("01", None))
            .await
            .unwrap();

        let err = svc
            .create(CatalogKind::Environment, &actor, entry("02.01", Some(unit.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_parent_rules() {
        let svc = service();
        let actor = actor();

        let err = svc
            .create(CatalogKind::Environment, &actor, entry("01.01", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = svc
            .create(CatalogKind::District, &actor, entry("05", Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let unit = svc
            .create(CatalogKind::OrganizationalUnit, &actor, entry("03", None))
            .await
            .unwrap();
        svc.set_status(CatalogKind::OrganizationalUnit, unit.id, &actor, Status::Inactive)
            .await
            .unwrap();
        let err = svc
            .create(CatalogKind::Environment, &actor, entry("03.01", Some(unit.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_to_existing_code_conflicts() {
        let svc = service();
        let actor = actor();
        svc.create(CatalogKind::District, &actor, entry("05", None))
            .await
            .unwrap();
        let other = svc
            .create(CatalogKind::District, &actor, entry("06", None))
            .await
            .unwrap();

        let err = svc
            .update(
                CatalogKind::District,
                other.id,
                &actor,
                UpdateCatalogEntry {
                    code: Some("05".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_untouched_fields() {
        let svc = service();
        let actor = actor();
        let mut input = entry("UFV-2024-01", None);
        input.attributes = Some(serde_json::json!({"valor": 2.45, "fecha": "2024-01-02"}));
        let created = svc.create(CatalogKind::Ufv, &actor, input).await.unwrap();

        let updated = svc
            .update(
                CatalogKind::Ufv,
                created.id,
                &actor,
                UpdateCatalogEntry {
                    description: Some("UFV enero".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.code, "UFV-2024-01");
        assert_eq!(updated.description, "UFV enero");
        assert_eq!(updated.attributes, created.attributes);
        assert_eq!(updated.updated_by, Some(actor.user_id()));
    }

    fn recode(code: &str) -> UpdateCatalogEntry {
        UpdateCatalogEntry {
            code: Some(code.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_parent_with_children_keeps_its_code() {
        let svc = service();
        let actor = actor();
        let unit = svc
            .create(CatalogKind::OrganizationalUnit, &actor, entry("01", None))
            .await
            .unwrap();
        let env = svc
            .create(CatalogKind::Environment, &actor, entry("01.01", Some(unit.id)))
            .await
            .unwrap();

        let err = svc
            .update(CatalogKind::OrganizationalUnit, unit.id, &actor, recode("02"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let parent = svc.get(CatalogKind::OrganizationalUnit, unit.id).await.unwrap();
        let child = svc.get(CatalogKind::Environment, env.id).await.unwrap();
        assert!(is_child_code(&parent.code, &child.code));

        // Description changes are still allowed
        let renamed = svc
            .update(
                CatalogKind::OrganizationalUnit,
                unit.id,
                &actor,
                UpdateCatalogEntry {
                    description: Some("Unidad renombrada".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.code, "01");
    }

    #[tokio::test]
    async fn test_childless_parent_and_leaf_can_be_recoded() {
        let svc = service();
        let actor = actor();
        let unit = svc
            .create(CatalogKind::OrganizationalUnit, &actor, entry("01", None))
            .await
            .unwrap();
        let env = svc
            .create(CatalogKind::Environment, &actor, entry("01.01", Some(unit.id)))
            .await
            .unwrap();

        let env = svc
            .update(CatalogKind::Environment, env.id, &actor, recode("01.07"))
            .await
            .unwrap();
        assert_eq!(env.code, "01.07");

        let empty = svc
            .create(CatalogKind::OrganizationalUnit, &actor, entry("09", None))
            .await
            .unwrap();
        let moved = svc
            .update(CatalogKind::OrganizationalUnit, empty.id, &actor, recode("10"))
            .await
            .unwrap();
        assert_eq!(moved.code, "10");
    }

    #[test]
    fn test_child_kinds() {
        let children: Vec<_> = CatalogKind::OrganizationalUnit.children().collect();
        assert_eq!(children, vec![CatalogKind::Environment]);
        assert_eq!(CatalogKind::District.children().count(), 0);
    }
}
