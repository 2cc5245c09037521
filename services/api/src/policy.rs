//! Access policy table
//!
//! Every protected route is declared here with the roles and permissions it
//! requires. Module-level roles apply to all routes of the module and are
//! merged with the route's own roles at lookup time. The router asks for the
//! requirement of each route while it is being built, so an undeclared route
//! fails start-up instead of silently running unguarded.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::models::catalog::CatalogKind;

/// Role names used by the standard policy
pub mod roles {
    pub const ADMINISTRATOR: &str = "ADMINISTRADOR";
    pub const AUDITOR: &str = "AUDITOR";
}

/// Lookup failure while wiring routes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no access policy declared for {module}/{route}")]
    Undeclared { module: String, route: String },
}

/// Merged requirement of one route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirement {
    pub roles: BTreeSet<String>,
    pub permissions: Vec<String>,
}

impl Requirement {
    /// Authenticated-only routes with no role or permission restriction
    pub fn is_open(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct RouteRule {
    roles: BTreeSet<String>,
    permissions: Vec<String>,
}

/// Role and permission requirements keyed by module and route
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    module_roles: HashMap<String, BTreeSet<String>>,
    routes: HashMap<(String, String), RouteRule>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roles required by every route of `module`
    pub fn module_roles(mut self, module: &str, roles: &[&str]) -> Self {
        self.module_roles
            .entry(module.to_string())
            .or_default()
            .extend(roles.iter().map(|r| r.to_string()));
        self
    }

    /// Declare a route guarded by permissions only
    pub fn route(self, module: &str, route: &str, permissions: &[&str]) -> Self {
        self.route_with_roles(module, route, &[], permissions)
    }

    /// Declare a route guarded by roles and permissions
    pub fn route_with_roles(
        mut self,
        module: &str,
        route: &str,
        roles: &[&str],
        permissions: &[&str],
    ) -> Self {
        let rule = self
            .routes
            .entry((module.to_string(), route.to_string()))
            .or_default();
        rule.roles.extend(roles.iter().map(|r| r.to_string()));
        for permission in permissions {
            if !rule.permissions.iter().any(|p| p == permission) {
                rule.permissions.push(permission.to_string());
            }
        }
        self
    }

    /// Requirement for a declared route, module roles merged in
    pub fn requirement(&self, module: &str, route: &str) -> Result<Requirement, PolicyError> {
        let rule = self
            .routes
            .get(&(module.to_string(), route.to_string()))
            .ok_or_else(|| PolicyError::Undeclared {
                module: module.to_string(),
                route: route.to_string(),
            })?;

        let mut roles = rule.roles.clone();
        if let Some(module_roles) = self.module_roles.get(module) {
            roles.extend(module_roles.iter().cloned());
        }

        Ok(Requirement {
            roles,
            permissions: rule.permissions.clone(),
        })
    }

    /// The policy shipped with the service
    pub fn standard() -> Self {
        let mut policy = Self::new()
            .route("roles", "listar", &["roles:listar"])
            .route("roles", "ver", &["roles:ver"])
            .route("roles", "crear", &["roles:crear"])
            .route("roles", "editar", &["roles:editar"])
            .route("roles", "cambiar-estado", &["roles:cambiar-estado"])
            .route("roles", "asignar-permisos", &["roles:asignar-permisos"])
            .route("roles", "quitar-permisos", &["roles:asignar-permisos"])
            .route("permisos", "listar", &["permisos:listar"])
            .route("permisos", "crear", &["permisos:crear"])
            .route("permisos", "editar", &["permisos:editar"])
            .route("usuarios", "listar", &["usuarios:listar"])
            .route("usuarios", "crear", &["usuarios:crear"])
            .route("usuarios", "asignar-rol", &["usuarios:asignar-rol"])
            .route("usuarios", "cambiar-estado", &["usuarios:cambiar-estado"])
            .module_roles("auditoria", &[roles::ADMINISTRATOR, roles::AUDITOR])
            .route("auditoria", "listar", &["auditoria:listar"])
            .route("perfil", "ver", &[]);

        for kind in CatalogKind::ALL {
            let slug = kind.slug();
            for action in ["listar", "ver", "crear", "editar", "cambiar-estado"] {
                let permission = format!("{}:{}", slug, action);
                policy = policy.route(slug, action, &[permission.as_str()]);
            }
            let create = format!("{}:crear", slug);
            policy = policy.route(slug, "siguiente-codigo", &[create.as_str()]);
        }

        policy
    }
}
