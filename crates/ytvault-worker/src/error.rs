//! Worker error types.

use thiserror::Error;
use ytvault_models::{FileId, JobId};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job already exists: {0}")]
    JobExists(JobId),

    #[error("Job {0} already has a live worker")]
    AlreadyRunning(JobId),

    #[error("File not found: {0}")]
    FileNotFound(FileId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Store error: {0}")]
    Store(#[from] ytvault_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] ytvault_media::MediaError),

    #[error("Invalid value: {0}")]
    Model(#[from] ytvault_models::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller asked for something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkerError::JobNotFound(_) | WorkerError::FileNotFound(_))
    }

    /// Whether the caller sent a request that can never succeed as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WorkerError::Validation(_)
                | WorkerError::JobExists(_)
                | WorkerError::AlreadyRunning(_)
                | WorkerError::Model(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(WorkerError::JobNotFound(JobId::from("x")).is_not_found());
        assert!(WorkerError::JobExists(JobId::from("x")).is_client_error());
        assert!(!WorkerError::internal("boom").is_client_error());
        let model: WorkerError = ytvault_models::ModelError::NotPositive { field: "interval" }.into();
        assert!(model.is_client_error());
    }
}
