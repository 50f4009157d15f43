//! Collaborator service error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the account and word services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Call did not finish in time
    #[error("Service call timed out after {0:?}")]
    Timeout(Duration),

    /// Service rejected or could not serve the call
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Word is blank or holds something other than letters a-z
    #[error("'{0}' is not a puzzle word")]
    InvalidWord(String),
}

impl ServiceError {
    /// Get a client-safe error message
    ///
    /// Database errors are sanitized so SQL details never reach players.
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
