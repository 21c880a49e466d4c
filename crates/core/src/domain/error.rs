// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An indexed entry could not be reached through the queue links
    #[error("Queue inconsistency: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
