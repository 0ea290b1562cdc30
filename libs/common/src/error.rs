//! Custom error types for the common library
//!
//! This module defines the errors raised by the document store backends and
//! by configuration loading, shared by every service in the workspace.

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

    /// Error occurred while creating the schema
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised by a document store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure talking to a remote store
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with a non-success status
    #[error("Store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Obtaining or using store credentials failed
    #[error("Store authentication error: {0}")]
    Auth(String),

    /// Relational backend failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The addressed document does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A document could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store returned data we could not interpret
    #[error("Malformed store response: {0}")]
    Malformed(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while loading configuration at startup
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable is set but cannot be used
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
