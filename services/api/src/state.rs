//! Application state shared across handlers

use std::sync::Arc;

use common::token::TokenKeys;
use sqlx::PgPool;

use crate::{
    audit::AuditRecorder,
    repositories::{
        AuditRepository, CatalogRepository, PgAuditRepository, PgCatalogRepository,
        PgRbacRepository, PgUserRepository, RbacRepository, UserRepository,
        memory::{
            InMemoryAuditRepository, InMemoryCatalogRepository, InMemoryRbacRepository,
            InMemoryUserRepository,
        },
    },
    services::{CatalogService, RbacService, UserService},
};

/// The stores one application instance runs against
#[derive(Clone)]
pub struct Repositories {
    pub rbac: Arc<dyn RbacRepository>,
    pub users: Arc<dyn UserRepository>,
    pub catalogs: Arc<dyn CatalogRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            rbac: Arc::new(PgRbacRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            catalogs: Arc::new(PgCatalogRepository::new(pool.clone())),
            audit: Arc::new(PgAuditRepository::new(pool.clone())),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            rbac: Arc::new(InMemoryRbacRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            catalogs: Arc::new(InMemoryCatalogRepository::new()),
            audit: Arc::new(InMemoryAuditRepository::new()),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub token_keys: TokenKeys,
    pub rbac: RbacService,
    pub users: UserService,
    pub catalogs: CatalogService,
    pub audit: Arc<dyn AuditRepository>,
}

impl AppState {
    pub fn new(repositories: Repositories, token_keys: TokenKeys, db_pool: Option<PgPool>) -> Self {
        let recorder = AuditRecorder::new(repositories.audit.clone());

        Self {
            db_pool,
            token_keys,
            rbac: RbacService::new(repositories.rbac.clone(), recorder.clone()),
            users: UserService::new(repositories.users, repositories.rbac, recorder),
            catalogs: CatalogService::new(repositories.catalogs),
            audit: repositories.audit,
        }
    }

    /// State backed by PostgreSQL
    pub fn postgres(pool: PgPool, token_keys: TokenKeys) -> Self {
        Self::new(Repositories::postgres(&pool), token_keys, Some(pool))
    }

    /// State backed by the in-memory stores
    pub fn in_memory(token_keys: TokenKeys) -> Self {
        Self::new(Repositories::in_memory(), token_keys, None)
    }
}
