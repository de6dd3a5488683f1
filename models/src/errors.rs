// models/src/errors.rs

use std::io;
pub use thiserror::Error;
use anyhow::Error as AnyhowError;
use serde_json::Error as SerdeJsonError;
use serde::{Serialize, Deserialize};

use crate::medical::appointment::AppointmentStatus;

#[derive(Debug, Serialize, Deserialize, Error, Clone, PartialEq)]
pub enum ClinicError {
    #[error("{0}")]
    Validation(ValidationError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("authentication failed: {0}")]
    Unauthenticated(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("an internal error occurred: {0}")]
    Internal(String),
    #[cfg(feature = "sled-errors")]
    #[error("sled error: {0}")]
    Sled(String),
}

impl ClinicError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        ClinicError::NotFound(format!("{} {}", kind, id))
    }
}

// Implement From for serde_json::Error
impl From<SerdeJsonError> for ClinicError {
    fn from(err: SerdeJsonError) -> Self {
        ClinicError::Serialization(format!("JSON serialization error: {}", err))
    }
}

// Implement From for anyhow::Error
impl From<AnyhowError> for ClinicError {
    fn from(err: AnyhowError) -> Self {
        ClinicError::Internal(format!("{:#}", err))
    }
}

// Implement From for io::Error
impl From<io::Error> for ClinicError {
    fn from(err: io::Error) -> Self {
        ClinicError::Storage(format!("IO error: {}", err))
    }
}

// Implement From for ValidationError
impl From<ValidationError> for ClinicError {
    fn from(err: ValidationError) -> Self {
        ClinicError::Validation(err)
    }
}

// Implement From for sled::Error
#[cfg(feature = "sled-errors")]
impl From<sled::Error> for ClinicError {
    fn from(err: sled::Error) -> Self {
        ClinicError::Sled(format!("Sled error: {}", err))
    }
}

#[derive(Debug, Serialize, Deserialize, Error, PartialEq, Clone)]
pub enum ValidationError {
    #[error("username must be at least {min} characters")]
    UsernameTooShort { min: usize },
    #[error("username must contain only letters and digits")]
    UsernameNotAlphanumeric,
    #[error("username taken")]
    UsernameTaken,
    #[error("weak password: {0}")]
    WeakPassword(String),
    #[error("full name may contain only letters, spaces, '.' and '-'")]
    InvalidFullName,
    #[error("{0} must not be blank")]
    RequiredField(String),
    #[error("doctor accounts require a department and a specialization")]
    MissingDoctorDetails,
    #[error("identifier '{0}' is invalid")]
    InvalidIdentifier(String),
    #[error("unknown appointment status '{0}'")]
    InvalidStatus(String),
    #[error("unknown role '{0}'")]
    InvalidRole(String),
}

/// A type alias for a `Result` that returns a `ClinicError` on failure.
pub type ClinicResult<T> = Result<T, ClinicError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_username_taken_verbatim() {
        let err: ClinicError = ValidationError::UsernameTaken.into();
        assert_eq!(err.to_string(), "username taken");
    }

    #[test]
    fn should_name_both_ends_of_a_rejected_transition() {
        let err = ClinicError::InvalidTransition {
            from: AppointmentStatus::Rejected,
            to: AppointmentStatus::Approved,
        };
        assert_eq!(err.to_string(), "invalid transition from REJECTED to APPROVED");
    }

    #[test]
    fn should_wrap_json_errors_as_serialization() {
        let json_err = serde_json::from_str::<u64>("not json").unwrap_err();
        assert!(matches!(ClinicError::from(json_err), ClinicError::Serialization(_)));
    }
}
