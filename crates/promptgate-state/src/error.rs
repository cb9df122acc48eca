//! Error types for promptgate-state

use thiserror::Error;

/// Errors raised while connecting to or initialising the database.
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

/// Errors returned by the storage trait operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The addressed record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A draft's stored status no longer matches the status the caller read.
    #[error("draft {draft_id} is {actual}, expected {expected}")]
    StatusConflict {
        draft_id: String,
        expected: String,
        actual: String,
    },

    /// A write collided with an existing record (duplicate id or version).
    #[error("write conflict: {0}")]
    Conflict(String),

    /// The backend failed (connection lost, query error, ...).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StorageError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
