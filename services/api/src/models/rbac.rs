//! Role and permission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;

/// Permission entity
///
/// The name is a capability token of the form `<resource>:<action>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role entity with its granted permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "estado")]
    pub status: Status,
    #[serde(rename = "permisos")]
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Permission names, sorted
    pub fn permission_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.permissions.iter().map(|p| p.name.clone()).collect();
        names.sort();
        names
    }
}

/// New role creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "permisos", default)]
    pub permission_ids: Vec<Uuid>,
}

/// Role update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRole {
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
}

/// Permission assignment or revocation payload
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionAssignment {
    #[serde(rename = "permisos")]
    pub permission_ids: Vec<Uuid>,
}

/// New permission creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewPermission {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
}

/// Permission update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePermission {
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
}
