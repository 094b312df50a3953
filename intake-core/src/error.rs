// intake-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    // --- DOMAIN ERRORS (validation, business rules, lookups) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, config, storage, deadlines) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),

    #[error("Unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

impl IntakeError {
    /// True when the error is a missing record rather than a failure of the store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IntakeError::Domain(DomainError::NotFound { .. }))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IntakeError::Domain(DomainError::Duplicate { .. }))
    }
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for IntakeError {
    fn from(err: std::io::Error) -> Self {
        IntakeError::Infrastructure(InfrastructureError::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_routes_through_infrastructure() {
        let err: IntakeError = std::io::Error::other("disk gone").into();
        assert!(matches!(
            err,
            IntakeError::Infrastructure(InfrastructureError::Io(_))
        ));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_not_found_helper() {
        let err: IntakeError = DomainError::not_found("entity", "42").into();
        assert!(err.is_not_found());
        assert!(!err.is_duplicate());
        assert_eq!(err.to_string(), "entity with ID 42 not found");
    }
}
