//! Custom error types for the common library
//!
//! This module defines application-specific error types that can be used
//! throughout the services.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// SQLSTATE raised by PostgreSQL on a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Returns true when the error is a unique constraint violation.
///
/// Stores use this to turn a racing duplicate insert into a conflict instead
/// of a generic query failure.
pub fn is_unique_violation(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}
