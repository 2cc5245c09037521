//! Parametric catalog models
//!
//! Every catalog shares one shape: a business code, a description, a
//! lifecycle status and audit fields. Entity-specific fields (a UFV value
//! and date, a building's address, ...) travel in the opaque `atributos`
//! document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;

/// The parametric catalogs managed by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogKind {
    #[serde(rename = "direcciones-administrativas")]
    AdministrativeAddress,
    #[serde(rename = "distritos")]
    District,
    #[serde(rename = "ciudades")]
    City,
    #[serde(rename = "areas")]
    Area,
    #[serde(rename = "unidades-organizacionales")]
    OrganizationalUnit,
    #[serde(rename = "ambientes")]
    Environment,
    #[serde(rename = "cargos")]
    Position,
    #[serde(rename = "personal")]
    Personnel,
    #[serde(rename = "grupos-contables")]
    AccountingGroup,
    #[serde(rename = "auxiliares")]
    Auxiliary,
    #[serde(rename = "edificios")]
    Building,
    #[serde(rename = "equipos-oficina")]
    OfficeEquipment,
    #[serde(rename = "ufv")]
    Ufv,
}

/// Parent catalog of a hierarchical kind and the zero-padding of the
/// sequential suffix appended to the parent's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hierarchy {
    pub parent: CatalogKind,
    pub width: usize,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 13] = [
        CatalogKind::AdministrativeAddress,
        CatalogKind::District,
        CatalogKind::City,
        CatalogKind::Area,
        CatalogKind::OrganizationalUnit,
        CatalogKind::Environment,
        CatalogKind::Position,
        CatalogKind::Personnel,
        CatalogKind::AccountingGroup,
        CatalogKind::Auxiliary,
        CatalogKind::Building,
        CatalogKind::OfficeEquipment,
        CatalogKind::Ufv,
    ];

    /// URL segment, permission resource and `tipo` column value
    pub fn slug(&self) -> &'static str {
        match self {
            CatalogKind::AdministrativeAddress => "direcciones-administrativas",
            CatalogKind::District => "distritos",
            CatalogKind::City => "ciudades",
            CatalogKind::Area => "areas",
            CatalogKind::OrganizationalUnit => "unidades-organizacionales",
            CatalogKind::Environment => "ambientes",
            CatalogKind::Position => "cargos",
            CatalogKind::Personnel => "personal",
            CatalogKind::AccountingGroup => "grupos-contables",
            CatalogKind::Auxiliary => "auxiliares",
            CatalogKind::Building => "edificios",
            CatalogKind::OfficeEquipment => "equipos-oficina",
            CatalogKind::Ufv => "ufv",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    pub fn hierarchy(&self) -> Option<Hierarchy> {
        match self {
            CatalogKind::Environment => Some(Hierarchy {
                parent: CatalogKind::OrganizationalUnit,
                width: 2,
            }),
            CatalogKind::Position => Some(Hierarchy {
                parent: CatalogKind::Environment,
                width: 3,
            }),
            CatalogKind::Auxiliary => Some(Hierarchy {
                parent: CatalogKind::AccountingGroup,
                width: 2,
            }),
            _ => None,
        }
    }

    /// Kinds whose entries hang below entries of this kind
    pub fn children(&self) -> impl Iterator<Item = CatalogKind> + '_ {
        Self::ALL
            .into_iter()
            .filter(move |kind| kind.hierarchy().is_some_and(|h| h.parent == *self))
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Catalog row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    #[serde(rename = "tipo")]
    pub kind: CatalogKind,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "padre_id")]
    pub parent_id: Option<Uuid>,
    #[serde(rename = "estado")]
    pub status: Status,
    #[serde(rename = "atributos")]
    pub attributes: Option<serde_json::Value>,
    #[serde(rename = "creado_por")]
    pub created_by: Uuid,
    #[serde(rename = "modificado_por")]
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewCatalogEntry {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "padre_id", default)]
    pub parent_id: Option<Uuid>,
    #[serde(rename = "atributos", default)]
    pub attributes: Option<serde_json::Value>,
}

/// Catalog update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCatalogEntry {
    #[serde(rename = "codigo", default)]
    pub code: Option<String>,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "atributos", default)]
    pub attributes: Option<serde_json::Value>,
}

/// Validated row handed to the store for insertion
#[derive(Debug, Clone)]
pub struct CatalogInsert {
    pub code: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    pub attributes: Option<serde_json::Value>,
    pub created_by: Uuid,
}

/// Validated changes handed to the store
#[derive(Debug, Clone)]
pub struct CatalogChanges {
    pub code: String,
    pub description: String,
    pub attributes: Option<serde_json::Value>,
    pub updated_by: Uuid,
}

/// Query parameters for catalog listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "estado")]
    pub status: Option<Status>,
    #[serde(rename = "padre_id")]
    pub parent_id: Option<Uuid>,
    /// Case-insensitive match on code or description
    #[serde(rename = "buscar")]
    pub search: Option<String>,
}

impl CatalogQuery {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        let search = self.search.as_deref().map(str::to_lowercase);
        self.status.is_none_or(|s| entry.status == s)
            && self.parent_id.is_none_or(|p| entry.parent_id == Some(p))
            && search.is_none_or(|term| {
                entry.code.to_lowercase().contains(&term)
                    || entry.description.to_lowercase().contains(&term)
            })
    }
}

/// Query parameters for the next-code suggestion
#[derive(Debug, Clone, Deserialize)]
pub struct CodeSuggestionQuery {
    #[serde(rename = "padre_id")]
    pub parent_id: Uuid,
}

/// Suggested code for the next child of a parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSuggestion {
    #[serde(rename = "padre_id")]
    pub parent_id: Uuid,
    #[serde(rename = "codigo_padre")]
    pub parent_code: String,
    #[serde(rename = "codigo")]
    pub code: String,
}
