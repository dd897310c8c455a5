//! Job lifecycle entry points used by the API layer and the bootstrapper.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ytvault_media::{fs_utils, DownloadEngine, FrameSampler};
use ytvault_models::{FileId, Job, JobId, JobPatch};
use ytvault_store::{Database, FileRegistry, StoreError};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::event_bus::{EventBus, NotificationTransport};
use crate::registry::{JobRegistry, WorkerHandle};
use crate::thumbnail_index::ThumbnailIndexer;
use crate::worker::{DownloadWorker, WorkerDeps, WorkerState};

/// Extensions whose delivery marks a job as downloaded.
const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "mov", "webm"];

/// Owns the shared services and the registry of live workers.
#[derive(Clone)]
pub struct JobManager {
    deps: WorkerDeps,
}

impl JobManager {
    pub fn new(
        db: Database,
        transport: Arc<dyn NotificationTransport>,
        engine: Arc<dyn DownloadEngine>,
        sampler: Arc<dyn FrameSampler>,
        config: WorkerConfig,
    ) -> Self {
        let files = FileRegistry::new(db.clone());
        let indexer = ThumbnailIndexer::new(files.clone(), sampler, &config);
        Self {
            deps: WorkerDeps {
                db,
                files,
                bus: EventBus::new(transport),
                registry: Arc::new(JobRegistry::new()),
                engine,
                indexer,
                config: Arc::new(config),
            },
        }
    }

    pub fn db(&self) -> &Database {
        &self.deps.db
    }

    pub fn files(&self) -> &FileRegistry {
        &self.deps.files
    }

    pub fn bus(&self) -> &EventBus {
        &self.deps.bus
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.deps.registry
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.deps.config
    }

    /// Persist a new job and start downloading it.
    ///
    /// The registry slot is claimed before the row is written, so a failed
    /// create never leaves a record without a worker.
    pub async fn create_job(&self, job: Job) -> WorkerResult<Job> {
        if job.url.trim().is_empty() {
            return Err(WorkerError::validation("url must not be empty"));
        }
        let handle = match self.deps.registry.register(&job.id) {
            Ok(handle) => handle,
            Err(WorkerError::AlreadyRunning(id)) => {
                if self.deps.db.job_exists(&id).await? {
                    return Err(WorkerError::JobExists(id));
                }
                return Err(WorkerError::AlreadyRunning(id));
            }
            Err(e) => return Err(e),
        };
        if let Err(e) = self.deps.db.insert_job(&job).await {
            self.deps.registry.remove_if_same(&handle);
            return Err(match e {
                StoreError::DuplicateJob(id) => WorkerError::JobExists(id),
                e => e.into(),
            });
        }
        info!(job_id = %job.id, url = %job.url, "Job created");

        self.deps.bus.message(&job).await;
        self.start(job.clone(), handle);
        Ok(job)
    }

    /// Start a worker for `job`. Fails if one is already live for its id.
    pub fn spawn(&self, job: Job) -> WorkerResult<JoinHandle<WorkerState>> {
        let handle = self.deps.registry.register(&job.id)?;
        Ok(self.start(job, handle))
    }

    fn start(&self, job: Job, handle: Arc<WorkerHandle>) -> JoinHandle<WorkerState> {
        let worker = DownloadWorker::new(job, handle, self.deps.clone());
        tokio::spawn(worker.run())
    }

    /// Ask the live worker for `job_id` to stop; `false` if none is running.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        self.deps.registry.cancel(job_id)
    }

    pub async fn get_job(&self, job_id: &JobId) -> WorkerResult<Job> {
        self.deps
            .db
            .get_job(job_id)
            .await?
            .ok_or_else(|| WorkerError::JobNotFound(job_id.clone()))
    }

    pub async fn list_jobs(&self) -> WorkerResult<Vec<Job>> {
        Ok(self.deps.db.list_jobs().await?)
    }

    /// Apply a partial update and publish the new record.
    pub async fn update_job(&self, job_id: &JobId, patch: JobPatch) -> WorkerResult<Job> {
        let mut job = self.get_job(job_id).await?;
        patch.apply(&mut job);
        if !self.deps.db.update_job(&job).await? {
            return Err(WorkerError::JobNotFound(job_id.clone()));
        }
        self.deps.bus.message(&job).await;
        Ok(job)
    }

    /// Cancel any live worker, delete every file the job references from
    /// disk and registry, then drop the record.
    pub async fn delete_job(&self, job_id: &JobId) -> WorkerResult<()> {
        if self.cancel(job_id) {
            info!(job_id = %job_id, "Cancelled live worker before delete");
        }

        let job = self.get_job(job_id).await?;
        for file_id in job.file_ids() {
            self.discard_file(file_id).await?;
        }

        self.deps.db.delete_job(job_id).await?;
        info!(job_id = %job_id, "Job deleted");
        Ok(())
    }

    async fn discard_file(&self, file_id: &FileId) -> WorkerResult<()> {
        let Some(path) = self.deps.files.resolve(file_id).await? else {
            warn!(file_id = %file_id, "Referenced file is not registered");
            return Ok(());
        };
        if let Err(e) = fs_utils::remove_if_exists(&path).await {
            warn!(file_id = %file_id, "Failed to delete {}: {}", path.display(), e);
        }
        self.deps.files.remove(file_id).await?;
        Ok(())
    }

    /// Resolve a registered file for delivery.
    ///
    /// Serving a video marks the owning job as downloaded and publishes it.
    pub async fn serve_file(&self, file_id: &FileId) -> WorkerResult<PathBuf> {
        let path = self
            .deps
            .files
            .resolve(file_id)
            .await?
            .ok_or_else(|| WorkerError::FileNotFound(file_id.clone()))?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(WorkerError::FileNotFound(file_id.clone()));
        }

        if is_video(&path) {
            if let Some(mut job) = self.deps.db.find_job_by_video_file(file_id).await? {
                if !job.downloaded {
                    job.downloaded = true;
                    self.deps.db.update_job(&job).await?;
                    self.deps.bus.message(&job).await;
                }
            }
        }
        Ok(path)
    }
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
