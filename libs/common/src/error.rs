//! Custom error types for the common library
//!
//! This module defines database error types shared by every service that
//! talks to PostgreSQL.

use sqlx::Error as SqlxError;
use thiserror::Error;

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

/// Name of the violated constraint when `err` is a unique violation
/// (SQLSTATE 23505), `None` for every other error.
pub fn unique_violation(err: &SqlxError) -> Option<String> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    Some(db_err.constraint().unwrap_or("unique").to_string())
}

/// Name of the violated constraint when `err` is a foreign key violation
/// (SQLSTATE 23503), `None` for every other error.
pub fn foreign_key_violation(err: &SqlxError) -> Option<String> {
    let db_err = err.as_database_error()?;
    if !db_err.is_foreign_key_violation() {
        return None;
    }
    Some(db_err.constraint().unwrap_or("foreign_key").to_string())
}
