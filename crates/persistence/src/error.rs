//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx, IO and serde errors.

use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    // === Query errors ===
    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Invalid row in {collection}: {reason}")]
    InvalidRow { collection: String, reason: String },

    // === Audit log errors ===
    #[error("Audit log IO error: {0}")]
    AuditIo(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // === Other errors ===
    #[error("{0}")]
    Other(String),
}

/// Result type alias for PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, id: &str) -> Self {
        Self::AlreadyExists {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_row(collection: &str, reason: impl ToString) -> Self {
        Self::InvalidRow {
            collection: collection.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = PersistenceError::not_found("clearance_requests", "req-9");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Record not found: clearance_requests with id req-9"
        );
    }
}
