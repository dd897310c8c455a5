//! Startup resumption of interrupted jobs.

use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::manager::JobManager;
use crate::metrics;

/// Respawns workers for jobs a previous process left queued or downloading.
///
/// Partial artifacts are not inspected; the engine's own continuation picks
/// up `.part` files where it can.
pub struct Bootstrapper {
    manager: JobManager,
}

impl Bootstrapper {
    pub fn new(manager: JobManager) -> Self {
        Self { manager }
    }

    /// Spawn one worker per resumable job. Returns how many were started.
    pub async fn resume_interrupted_jobs(&self) -> WorkerResult<usize> {
        let jobs = self.manager.db().list_resumable_jobs().await?;
        if jobs.is_empty() {
            info!("No interrupted jobs to resume");
            return Ok(0);
        }

        let mut resumed = 0;
        for job in jobs {
            let id = job.id.clone();
            match self.manager.spawn(job) {
                Ok(_) => {
                    info!(job_id = %id, "Resumed interrupted job");
                    resumed += 1;
                }
                Err(WorkerError::AlreadyRunning(_)) => {
                    warn!(job_id = %id, "Job already has a live worker; not resuming");
                }
                Err(e) => return Err(e),
            }
        }

        metrics::record_jobs_resumed(resumed);
        info!("Resumed {} interrupted job(s)", resumed);
        Ok(resumed)
    }
}
