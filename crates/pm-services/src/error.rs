//! Service error type

use pm_auth::{AuthError, DirectoryError};
use pm_core::traits::{Entity, Id};
use pm_core::ValidationErrors;
use pm_db::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Argument `{param}` must not be null")]
    ArgumentNull { param: &'static str },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.into())
    }
}

impl ServiceError {
    pub fn not_found<T: Entity>(id: Id) -> Self {
        ServiceError::NotFound {
            entity: T::TYPE_NAME,
            id,
        }
    }

    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        ServiceError::Validation(errors)
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::ArgumentNull { .. } => "argument_null",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Validation(_) => "validation_failed",
            ServiceError::Auth(AuthError::Unauthenticated(_)) => "unauthorized",
            ServiceError::Auth(AuthError::Forbidden { .. }) => "forbidden",
            ServiceError::Auth(AuthError::UnknownRole(_)) => "unknown_role",
            ServiceError::Directory(error) => match error {
                DirectoryError::AccountNotFound(_) => "account_not_found",
                DirectoryError::RoleNotFound(_) => "role_not_found",
                DirectoryError::DuplicateEmail(_) => "duplicate_email",
                DirectoryError::DuplicateRole(_) => "duplicate_role",
                DirectoryError::InvalidToken => "invalid_token",
                DirectoryError::PasswordPolicy(_) => "password_policy",
                DirectoryError::Hashing(_) => "hashing_failed",
            },
            ServiceError::Repository(error) => match error {
                RepositoryError::Database(_) => "database_error",
                RepositoryError::ForeignKey(_) => "foreign_key_violation",
                RepositoryError::Conflict(_) => "conflict",
                RepositoryError::Corrupt(_) => "corrupt_row",
                RepositoryError::Disposed => "disposed",
            },
            ServiceError::Runtime(_) => "runtime_error",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
