//! Error types for the authorization engine

use crate::engine::Decision;
use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed policy document, with every structural problem found
    #[error("Invalid policy document: {}", .problems.join("; "))]
    Validation {
        /// Human-readable problem list, one entry per defect
        problems: Vec<String>,
    },

    /// Condition block names an operator the engine does not know
    #[error("Unknown condition operator: {0}")]
    UnknownOperator(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Policy not found
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resolution backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Request was denied at an imperative call site
    #[error(transparent)]
    Forbidden(#[from] ForbiddenError),
}

impl AuthzError {
    /// Build a validation error from a single problem
    pub fn validation(problem: impl Into<String>) -> Self {
        Self::Validation {
            problems: vec![problem.into()],
        }
    }
}

/// Raised by [`assert_allowed`](crate::engine::assert_allowed) when a decision denies access
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ForbiddenError {
    /// Message for the caller
    pub message: String,

    /// The decision that caused the failure
    pub decision: Decision,
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_problems() {
        let err = AuthzError::Validation {
            problems: vec!["Statement[0].Effect: invalid".to_string(), "Version: not a string".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid policy document: Statement[0].Effect: invalid; Version: not a string"
        );
    }

    #[test]
    fn test_forbidden_converts_into_authz_error() {
        let forbidden = ForbiddenError {
            message: "nope".to_string(),
            decision: Decision::default_deny(),
        };
        let err: AuthzError = forbidden.into();
        assert!(matches!(err, AuthzError::Forbidden(_)));
        assert_eq!(err.to_string(), "nope");
    }
}
