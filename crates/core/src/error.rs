//! # Error Module
//!
//! Domain errors raised by pure state transitions.

use crate::clearance::{ApprovalState, ClearanceStatus, Party};
use thiserror::Error;

/// Core domain errors.
///
/// Raised by the domain types themselves, independent of storage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    // === Clearance errors ===
    #[error("{party} stage already decided: {state}")]
    AlreadyDecided { party: Party, state: ApprovalState },

    #[error("Clearance {request_id} is not fully approved (status: {status})")]
    NotFullyApproved {
        request_id: String,
        status: ClearanceStatus,
    },

    // === Parsing errors ===
    #[error("Invalid {field}: {value}")]
    InvalidEnumValue { field: String, value: String },

    // === Validation errors ===
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Raised by the clearance state machine
    pub fn is_clearance_error(&self) -> bool {
        matches!(
            self,
            CoreError::AlreadyDecided { .. } | CoreError::NotFullyApproved { .. }
        )
    }
}
