//! One download job: engine invocation, telemetry handling, finalization.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

use ytvault_media::{
    fs_utils, DownloadEngine, EngineRequest, HookControl, MediaError, ProgressTranslator,
    RawTelemetry, TelemetryStatus,
};
use ytvault_models::{Job, JobStatus, Notification};
use ytvault_store::{Database, FileRegistry};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::event_bus::EventBus;
use crate::logging::JobLogger;
use crate::metrics;
use crate::registry::{JobRegistry, WorkerHandle};
use crate::thumbnail_index::ThumbnailIndexer;

/// Latch for the one-time work done on the first progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstUpdate {
    Awaiting,
    Ongoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Queued,
    Downloading(FirstUpdate),
    Completed,
    Failed,
    Canceled,
}

impl WorkerState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerState::Queued => "queued",
            WorkerState::Downloading(_) => "downloading",
            WorkerState::Completed => "completed",
            WorkerState::Failed => "failed",
            WorkerState::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerState::Completed | WorkerState::Failed | WorkerState::Canceled
        )
    }
}

/// Everything a worker needs from its manager.
#[derive(Clone)]
pub struct WorkerDeps {
    pub db: Database,
    pub files: FileRegistry,
    pub bus: EventBus,
    pub registry: Arc<JobRegistry>,
    pub engine: Arc<dyn DownloadEngine>,
    pub indexer: ThumbnailIndexer,
    pub config: Arc<WorkerConfig>,
}

/// Drives one engine invocation for one job.
///
/// The engine runs on a blocking thread; its callback forwards telemetry
/// over a channel so all state changes happen on this worker's task, in
/// the order the engine produced them.
pub struct DownloadWorker {
    job: Job,
    handle: Arc<WorkerHandle>,
    deps: WorkerDeps,
    state: WorkerState,
    logger: JobLogger,
}

impl DownloadWorker {
    pub fn new(job: Job, handle: Arc<WorkerHandle>, deps: WorkerDeps) -> Self {
        let logger = JobLogger::download(&job.id);
        Self {
            job,
            handle,
            deps,
            state: WorkerState::Queued,
            logger,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Run to a terminal state and release the registry slot.
    pub async fn run(self) -> WorkerState {
        let span = self.logger.create_span();
        self.drive().instrument(span).await
    }

    async fn drive(mut self) -> WorkerState {
        self.logger.log_start(&self.job.url);
        metrics::record_job_started();

        let config = &self.deps.config;
        let request = EngineRequest::new(&self.job.url, &config.download_dir)
            .with_format(self.job.format, self.job.wants_audio_only())
            .with_options(config.engine.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = self.handle.cancel_flag();
        let engine = Arc::clone(&self.deps.engine);
        let engine_task = tokio::task::spawn_blocking(move || {
            let mut hook = move |telemetry| progress_hook(&cancel, &tx, telemetry);
            engine.download(&request, &mut hook)
        });

        while let Some(telemetry) = rx.recv().await {
            self.on_telemetry(telemetry).await;
        }

        let outcome = match engine_task.await {
            Ok(result) => result.map_err(WorkerError::from),
            Err(e) => Err(WorkerError::internal(format!("engine task failed: {e}"))),
        };
        self.settle(outcome).await;

        self.deps.registry.remove_if_same(&self.handle);
        metrics::record_job_finished(self.state.name());
        self.state
    }

    async fn on_telemetry(&mut self, raw: RawTelemetry) {
        match raw.status {
            TelemetryStatus::Downloading => self.on_progress(raw).await,
            TelemetryStatus::Finished => self.on_finished(raw).await,
        }
    }

    async fn on_progress(&mut self, raw: RawTelemetry) {
        if self.state == WorkerState::Queued {
            self.state = WorkerState::Downloading(FirstUpdate::Awaiting);
        }

        if self.state == WorkerState::Downloading(FirstUpdate::Awaiting) {
            self.job.download_status = JobStatus::Downloading;
            self.job.apply_metadata(&ProgressTranslator::metadata(&raw));
            self.persist().await;
            self.deps.bus.message(&self.job).await;
            self.state = WorkerState::Downloading(FirstUpdate::Ongoing);
            self.logger
                .log_progress(format!("Downloading \"{}\"", self.job.full_title));
        }

        let snapshot = ProgressTranslator::translate(&self.job.id, &raw);
        self.deps.bus.status_update(snapshot).await;
    }

    async fn on_finished(&mut self, raw: RawTelemetry) {
        self.state = WorkerState::Completed;
        self.job.download_status = JobStatus::Completed;
        self.job.apply_metadata(&ProgressTranslator::metadata(&raw));
        let snapshot = ProgressTranslator::translate(&self.job.id, &raw);

        match raw.filename.as_deref() {
            Some(video) => {
                match self.deps.files.get_or_create(video).await {
                    Ok(id) => self.job.video_path_id = Some(id),
                    Err(e) => self.logger.log_error(format!(
                        "Failed to register {}: {}",
                        video.display(),
                        e
                    )),
                }
                if let Some(thumbnail) = raw.thumbnail.as_deref() {
                    self.adopt_thumbnail(thumbnail).await;
                }
                self.attach_preview(video).await;
            }
            None => self
                .logger
                .log_warning("Engine finished without reporting an output file"),
        }

        self.persist().await;
        self.deps.bus.status_update(snapshot).await;
        self.deps.bus.message(&self.job).await;
        self.logger.log_completion(&self.job.full_title);
    }

    /// Move the engine's thumbnail into the managed area and register it.
    async fn adopt_thumbnail(&mut self, thumbnail: &Path) {
        let Some(name) = thumbnail.file_name() else {
            return;
        };
        let target = self.deps.config.thumbnails_dir().join(name);
        if let Err(e) = fs_utils::move_file(thumbnail, &target).await {
            self.logger.log_warning(format!(
                "Failed to move thumbnail {}: {}",
                thumbnail.display(),
                e
            ));
            return;
        }
        match self.deps.files.get_or_create(&target).await {
            Ok(id) => self.job.thumbnail_path_id = Some(id),
            Err(e) => self
                .logger
                .log_warning(format!("Failed to register thumbnail: {}", e)),
        }
    }

    async fn attach_preview(&mut self, video: &Path) {
        let preview = self
            .deps
            .indexer
            .index(&self.job.id, video, &self.deps.config.thumbnails)
            .await;
        if let Some(preview) = preview {
            self.job.vtt_sprite_path_id = Some(preview.sprite_id);
            self.job.vtt_path_id = Some(preview.vtt_id);
        }
    }

    /// Write the download columns, then pick up whatever the user changed
    /// on the record meanwhile so published messages carry it.
    async fn persist(&mut self) {
        match self.deps.db.update_job_download(&self.job).await {
            Ok(true) => {}
            Ok(false) => {
                self.logger.log_warning("Job record is gone; skipping persist");
                return;
            }
            Err(e) => {
                self.logger.log_error(format!("Failed to persist job: {}", e));
                return;
            }
        }
        match self.deps.db.get_job(&self.job.id).await {
            Ok(Some(stored)) => self.job = stored,
            Ok(None) => {}
            Err(e) => self.logger.log_warning(format!("Failed to reload job: {}", e)),
        }
    }

    /// Map the engine outcome onto the worker's terminal state.
    ///
    /// Engine failures leave the persisted status untouched.
    async fn settle(&mut self, outcome: Result<(), WorkerError>) {
        match outcome {
            Ok(()) if self.state == WorkerState::Completed => {}
            Ok(()) => {
                self.state = WorkerState::Failed;
                self.logger
                    .log_error("Engine returned without a finished event");
            }
            Err(WorkerError::Media(MediaError::Cancelled)) => {
                self.state = WorkerState::Canceled;
                self.logger.log_warning("Download cancelled");
            }
            Err(e) => {
                self.state = WorkerState::Failed;
                self.logger.log_error(format!("Download failed: {}", e));
                let note = Notification::error(format!("Download failed: {}", e))
                    .with_extra("jobId", self.job.id.as_str())
                    .with_extra("url", self.job.url.as_str());
                self.deps.bus.notify(note).await;
            }
        }
    }
}

/// Engine callback body; runs on the engine's blocking thread.
fn progress_hook(
    cancel: &AtomicBool,
    tx: &mpsc::UnboundedSender<RawTelemetry>,
    telemetry: RawTelemetry,
) -> HookControl {
    if cancel.load(Ordering::SeqCst) {
        discard_partial_artifacts(&telemetry);
        return HookControl::Abort;
    }
    // Receiver gone means the worker task was dropped.
    match tx.send(telemetry) {
        Ok(()) => HookControl::Continue,
        Err(_) => HookControl::Abort,
    }
}

fn discard_partial_artifacts(telemetry: &RawTelemetry) {
    let candidates = [
        telemetry.part_file(),
        telemetry.tmp_filename.clone(),
        telemetry.thumbnail.clone(),
    ];
    for path in candidates.into_iter().flatten() {
        fs_utils::remove_if_exists_blocking(&path);
    }
}
