//! Business layer errors
//!
//! Every service returns `BusinessResult`; callers match on the variant to
//! tell a refused operation from a store failure.

use ssg_core::{ApprovalState, ClearanceStatus, CoreError, Party, Role};
use ssg_persistence::PersistenceError;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Identity errors ===
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Operation not permitted for {role}: {operation}")]
    Unauthorized { role: String, operation: String },

    // === Clearance errors ===
    #[error("{party} stage already decided: {state}")]
    AlreadyDecided { party: Party, state: ApprovalState },

    #[error("Clearance {request_id} is not fully approved (status: {status})")]
    NotFullyApproved {
        request_id: String,
        status: ClearanceStatus,
    },

    // === Lookup / input errors ===
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Certificate rendering failed: {0}")]
    Render(String),

    #[error("Password hashing failed: {0}")]
    PasswordHashing(String),

    // === Wrapped errors ===
    #[error("Store failure: {0}")]
    StoreFailure(#[from] PersistenceError),

    #[error("Core error: {0}")]
    Core(CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl BusinessError {
    pub fn unauthorized(role: Role, operation: &str) -> Self {
        Self::Unauthorized {
            role: role.as_str().to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Store-level not-found becomes a business `NotFound`
    pub fn from_lookup(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::StoreFailure(other),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Clearance state-machine errors surface as their own variants.
impl From<CoreError> for BusinessError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AlreadyDecided { party, state } => Self::AlreadyDecided { party, state },
            CoreError::NotFullyApproved { request_id, status } => {
                Self::NotFullyApproved { request_id, status }
            }
            other => Self::Core(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_error() {
        let err = BusinessError::unauthorized(Role::ClubAdmin, "decide department stage");
        assert!(err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "Operation not permitted for club_admin: decide department stage"
        );
    }

    #[test]
    fn test_core_clearance_errors_are_lifted() {
        let err: BusinessError = CoreError::AlreadyDecided {
            party: Party::Ssg,
            state: ApprovalState::Approved,
        }
        .into();
        assert!(matches!(err, BusinessError::AlreadyDecided { party: Party::Ssg, .. }));

        let err: BusinessError = CoreError::ValidationError("x".to_string()).into();
        assert!(matches!(err, BusinessError::Core(_)));
    }

    #[test]
    fn test_from_lookup() {
        let err = BusinessError::from_lookup(PersistenceError::not_found("Event", "e-1"));
        assert_eq!(err.to_string(), "Event not found: e-1");
    }
}
