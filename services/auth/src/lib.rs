//! Authentication service: verifies credentials and issues bearer tokens

pub mod config;
pub mod credentials;
pub mod jwt;
pub mod rate_limiter;
pub mod routes;

use std::sync::Arc;

use crate::{credentials::CredentialRepository, jwt::JwtService, rate_limiter::RateLimiter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub jwt_service: JwtService,
    pub credentials: Arc<dyn CredentialRepository>,
    pub rate_limiter: RateLimiter,
}
