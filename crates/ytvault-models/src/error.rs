//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid job status: {0}")]
    InvalidStatus(String),

    #[error("Invalid download format: {0}")]
    InvalidFormat(String),

    #[error("Invalid job kind: {0}")]
    InvalidKind(String),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}
