use thiserror::Error;

use nexus_core::storage::RepositoryError;

/// Errors surfaced by the business services.
///
/// `PermissionDenied` is raised here, by comparing the stored owner to the
/// requesting identity — never by the repository layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("user {user_id} is not the owner of {entity_type} {id}")]
    PermissionDenied {
        entity_type: &'static str,
        id: String,
        user_id: String,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_display() {
        let error = ServiceError::PermissionDenied {
            entity_type: "Prompt",
            id: "p-1".to_string(),
            user_id: "user-2".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "user user-2 is not the owner of Prompt p-1"
        );
    }

    #[test]
    fn test_repository_error_passes_through() {
        let error = ServiceError::from(RepositoryError::QueryFailed("boom".to_string()));
        assert_eq!(error.to_string(), "Query failed: boom");
    }
}
