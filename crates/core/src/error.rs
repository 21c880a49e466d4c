// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// True when the error was caused by caller input rather than a fault
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::Domain(crate::domain::DomainError::InvalidInput(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_domain_error_converts() {
        let err: AppError = DomainError::InvalidInput("name must not be empty".into()).into();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("name must not be empty"));
    }

    #[test]
    fn test_internal_is_not_user_error() {
        let err = AppError::Internal("lock poisoned".into());
        assert!(!err.is_user_error());
    }
}
