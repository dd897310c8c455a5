//! Job-scoped structured logging.

use std::fmt::Display;
use tracing::{error, info, warn, Span};
use ytvault_models::JobId;

/// Attaches `job_id` and `operation` fields to every line it emits.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.clone(),
            operation,
        }
    }

    /// Logger for a download worker.
    pub fn download(job_id: &JobId) -> Self {
        Self::new(job_id, "download")
    }

    /// Logger for the preview indexing pipeline.
    pub fn indexing(job_id: &JobId) -> Self {
        Self::new(job_id, "thumbnail_index")
    }

    pub fn log_start(&self, message: impl Display) {
        info!(job_id = %self.job_id, operation = self.operation, "Job started: {}", message);
    }

    pub fn log_progress(&self, message: impl Display) {
        info!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn log_warning(&self, message: impl Display) {
        warn!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn log_error(&self, message: impl Display) {
        error!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn log_completion(&self, message: impl Display) {
        info!(job_id = %self.job_id, operation = self.operation, "Job completed: {}", message);
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Span the worker task runs inside.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, operation = self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_constructors() {
        let id = JobId::from("job-1");
        let logger = JobLogger::download(&id);
        assert_eq!(logger.job_id(), &id);
        assert_eq!(logger.operation(), "download");
        assert_eq!(JobLogger::indexing(&id).operation(), "thumbnail_index");
    }
}
