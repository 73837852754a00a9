//! Core error types for the debtorbook application.
//!
//! Validation errors carry the stable wire codes the HTTP layer surfaces in
//! error envelopes. Storage-specific failures are wrapped in string form to
//! keep this crate storage-agnostic.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for trade debtor operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Trade debtor not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Shallow request validation failures.
///
/// Each variant maps to one wire error code; the message is what the client
/// sees in the response envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("accountCode, customerName and title are required")]
    RequiredFieldsMissing,

    #[error("Field '{0}' is not valid JSON")]
    InvalidJsonFormat(String),

    #[error("At least one address is required")]
    MissingAddress,

    #[error("At least one employee is required")]
    MissingEmployee,

    #[error("Address {index}: {detail}")]
    InvalidAddressData { index: usize, detail: String },

    #[error("Employee {index}: {detail}")]
    InvalidEmployeeData { index: usize, detail: String },

    #[error("Trade debtor id is required")]
    MissingId,

    #[error("Search term must be at least {0} characters")]
    InvalidSearchTerm(usize),

    #[error("A non-empty list of ids is required")]
    MissingIds,

    #[error("Status must be one of: active, inactive, suspended")]
    InvalidStatus,
}

impl ValidationError {
    /// Stable error code surfaced in HTTP error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::RequiredFieldsMissing => "REQUIRED_FIELDS_MISSING",
            ValidationError::InvalidJsonFormat(_) => "INVALID_JSON_FORMAT",
            ValidationError::MissingAddress => "MISSING_ADDRESS",
            ValidationError::MissingEmployee => "MISSING_EMPLOYEE",
            ValidationError::InvalidAddressData { .. } => "INVALID_ADDRESS_DATA",
            ValidationError::InvalidEmployeeData { .. } => "INVALID_EMPLOYEE_DATA",
            ValidationError::MissingId => "MISSING_ID",
            ValidationError::InvalidSearchTerm(_) => "INVALID_SEARCH_TERM",
            ValidationError::MissingIds => "MISSING_IDS",
            ValidationError::InvalidStatus => "INVALID_STATUS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_are_stable() {
        assert_eq!(
            ValidationError::RequiredFieldsMissing.code(),
            "REQUIRED_FIELDS_MISSING"
        );
        assert_eq!(
            ValidationError::InvalidJsonFormat("addresses".into()).code(),
            "INVALID_JSON_FORMAT"
        );
        assert_eq!(ValidationError::InvalidSearchTerm(2).code(), "INVALID_SEARCH_TERM");
    }

    #[test]
    fn validation_error_wraps_into_root_error() {
        let err: Error = ValidationError::MissingAddress.into();
        assert!(matches!(err, Error::Validation(ValidationError::MissingAddress)));
    }
}
