//! Per-request caller identity
//!
//! The authentication middleware decodes the bearer token once and stores an
//! [`AuthContext`] in the request extensions. Guards and handlers read that
//! value; nothing else holds caller state.

use std::collections::BTreeSet;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use common::token::Claims;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    #[serde(rename = "usuario_id")]
    user_id: Uuid,
    username: String,
    #[serde(rename = "rol")]
    role: Option<String>,
    #[serde(rename = "permisos")]
    permissions: BTreeSet<String>,
}

impl AuthContext {
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        role: Option<String>,
        permissions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username.clone(),
            role: claims.role.as_ref().map(|r| r.name.clone()),
            permissions: resolve_permissions(claims),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }
}

/// Effective permission set of a token.
///
/// Precedence: when the token carries a role, the role's permissions are
/// used (even if that list is empty). The directly attached list is only a
/// fallback for tokens without a role. No role and no list yields nothing.
pub fn resolve_permissions(claims: &Claims) -> BTreeSet<String> {
    match (&claims.role, &claims.permissions) {
        (Some(role), _) => role.permissions.iter().cloned().collect(),
        (None, Some(direct)) => direct.iter().cloned().collect(),
        (None, None) => BTreeSet::new(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::token::{RoleClaim, TokenType};

    fn claims(role: Option<RoleClaim>, permissions: Option<Vec<&str>>) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            username: "mlopez".to_string(),
            role,
            permissions: permissions.map(|p| p.into_iter().map(String::from).collect()),
            iat: 0,
            exp: 0,
            token_type: TokenType::Access,
        }
    }

    fn role(name: &str, permissions: &[&str]) -> RoleClaim {
        RoleClaim {
            name: name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_role_permissions_take_priority() {
        let c = claims(
            Some(role("AUXILIAR", &["ufv:listar"])),
            Some(vec!["roles:crear"]),
        );
        let resolved = resolve_permissions(&c);
        assert_eq!(resolved, BTreeSet::from(["ufv:listar".to_string()]));
    }

    #[test]
    fn test_role_with_empty_list_does_not_fall_back() {
        let c = claims(Some(role("INVITADO", &[])), Some(vec!["ufv:listar"]));
        assert!(resolve_permissions(&c).is_empty());
    }

    #[test]
    fn test_direct_list_used_without_role() {
        let c = claims(None, Some(vec!["ufv:listar", "ufv:listar", "ciudades:ver"]));
        let resolved = resolve_permissions(&c);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.contains("ciudades:ver"));
    }

    #[test]
    fn test_nothing_resolves_to_empty() {
        assert!(resolve_permissions(&claims(None, None)).is_empty());
    }

    #[test]
    fn test_context_from_claims() {
        let c = claims(Some(role("ADMINISTRADOR", &["roles:crear"])), None);
        let ctx = AuthContext::from_claims(&c);
        assert_eq!(ctx.user_id(), c.sub);
        assert_eq!(ctx.username(), "mlopez");
        assert_eq!(ctx.role(), Some("ADMINISTRADOR"));
        assert!(ctx.has_permission("roles:crear"));
        assert!(!ctx.has_permission("roles:editar"));
    }
}
