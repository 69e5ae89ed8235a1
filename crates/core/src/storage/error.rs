use thiserror::Error;

/// Errors that can occur during repository operations.
///
/// Absent results are not errors: point lookups return `Ok(None)` and the
/// write operations return `Ok(false)` for transient storage failures, so
/// `NotFound` only surfaces where the caller needs to distinguish "nothing
/// to update" from "update failed".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    /// Transient store failure; safe to retry.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
