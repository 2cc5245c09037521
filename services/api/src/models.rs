//! API models for request and response payloads

use serde::{Deserialize, Serialize};

pub mod audit;
pub mod catalog;
pub mod rbac;
pub mod user;

/// Lifecycle status shared by users, roles and catalog rows.
///
/// Rows are never physically deleted; "deleting" flips them to `INACTIVO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "ACTIVO")]
    Active,
    #[serde(rename = "INACTIVO")]
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVO",
            Status::Inactive => "INACTIVO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVO" => Some(Status::Active),
            "INACTIVO" => Some(Status::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for status toggles
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    #[serde(rename = "estado")]
    pub status: Status,
}

/// Paginated listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

/// Normalized pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    /// Clamp client-supplied paging: pages start at 1, limit is 1..=100.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(10).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) as i64 * self.limit as i64
    }
}
