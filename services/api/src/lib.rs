//! Activos Fijos REST API
//!
//! Role and permission administration with an audit trail, user accounts
//! and the parametric catalogs, all behind role and permission guards.

pub mod audit;
pub mod codes;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod guards;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

pub use state::AppState;
