//! # AppError
//! 
//! Centralized error handling for the Rusty-Blog ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all rb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., a post id that was never created or was deleted)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., missing form field, disallowed file type)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Registration attempted with a username that is already taken
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    /// Unknown username or wrong password. Deliberately does not say which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Caller is authenticated but does not own the resource
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No authenticated session on a route that requires one
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for Rusty-Blog logic.
pub type Result<T> = std::result::Result<T, AppError>;
