//! Role and permission guards
//!
//! Both guards are pure functions over the caller's [`AuthContext`]; the
//! HTTP wiring lives in [`crate::middleware::enforce`].

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::warn;

use crate::{context::AuthContext, error::ApiError};

/// Outcome of a failed permission check
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("authentication required")]
    Unauthenticated,

    #[error("missing any of the permissions {required:?}")]
    Forbidden { required: Vec<String> },
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => ApiError::Unauthenticated,
            AccessDenied::Forbidden { required } => ApiError::Forbidden(format!(
                "Acceso denegado: se requiere alguno de los permisos {}",
                required.join(", ")
            )),
        }
    }
}

/// Role guard.
///
/// `required` is the merged role set of the handler and its module. An empty
/// set means the route is not role-restricted.
pub fn role_guard(required: &BTreeSet<String>, caller_role: Option<&str>) -> bool {
    if required.is_empty() {
        return true;
    }

    let allowed = caller_role.is_some_and(|role| required.contains(role));
    if !allowed {
        warn!(
            role = caller_role.unwrap_or("<none>"),
            "Role guard rejected caller; required one of {:?}", required
        );
    }
    allowed
}

/// Permission guard.
///
/// Any single matching permission is enough. A missing caller is reported
/// before the intersection is evaluated.
pub fn permission_guard(
    required: &[String],
    caller: Option<&AuthContext>,
) -> Result<(), AccessDenied> {
    if required.is_empty() {
        return Ok(());
    }

    let caller = caller.ok_or_else(|| {
        warn!("Permission guard: no authenticated caller");
        AccessDenied::Unauthenticated
    })?;

    if required.iter().any(|p| caller.has_permission(p)) {
        Ok(())
    } else {
        warn!(
            user = %caller.user_id(),
            "Permission guard rejected caller; required one of {:?}", required
        );
        Err(AccessDenied::Forbidden {
            required: required.to_vec(),
        })
    }
}
