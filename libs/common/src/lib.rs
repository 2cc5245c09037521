//! Common library for the Activos Fijos services
//!
//! This crate provides shared functionality used by the authentication and
//! API services: database connectivity, configuration loading, tracing
//! setup, password hashing and the bearer token format.

pub mod database;
pub mod error;
pub mod password;
pub mod settings;
pub mod telemetry;
pub mod token;
