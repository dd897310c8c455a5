//! Scrubbing-preview generation for completed downloads.
//!
//! Pipeline: sample frames → compose sprite → register sprite → write WebVTT
//! cues pointing into the sprite → register cue file → drop scratch frames.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ytvault_media::{
    build_cues, compose_sprite, fs_utils, render_cue_file, FrameSampler, SpriteLayout,
};
use ytvault_models::{FileId, JobId, ThumbnailVttConfig};
use ytvault_store::FileRegistry;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Registered outputs of one indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewIndex {
    pub sprite_id: FileId,
    pub vtt_id: FileId,
    pub sprite_path: PathBuf,
    pub vtt_path: PathBuf,
    pub layout: SpriteLayout,
}

#[derive(Clone)]
pub struct ThumbnailIndexer {
    files: FileRegistry,
    sampler: Arc<dyn FrameSampler>,
    sprite_dir: PathBuf,
    vtt_dir: PathBuf,
    temp_root: PathBuf,
}

impl ThumbnailIndexer {
    pub fn new(files: FileRegistry, sampler: Arc<dyn FrameSampler>, config: &WorkerConfig) -> Self {
        Self {
            files,
            sampler,
            sprite_dir: config.sprite_dir(),
            vtt_dir: config.vtt_dir(),
            temp_root: config.temp_thumbs_root(),
        }
    }

    /// Build the preview for `video`.
    ///
    /// Returns `None` when the video yields no frames or any step fails;
    /// failures are logged and never propagate to the job.
    pub async fn index(
        &self,
        job_id: &JobId,
        video: &Path,
        config: &ThumbnailVttConfig,
    ) -> Option<PreviewIndex> {
        let logger = JobLogger::indexing(job_id);
        let temp_dir = self.temp_root.join(job_id.as_str());
        let started = Instant::now();

        let result = self.build(video, config, &temp_dir).await;

        if let Err(e) = fs_utils::remove_dir_if_exists(&temp_dir).await {
            logger.log_warning(format!("Failed to remove {}: {}", temp_dir.display(), e));
        }

        match result {
            Ok(Some(index)) => {
                metrics::record_preview_index_duration(started.elapsed().as_secs_f64());
                logger.log_completion(format!(
                    "{} frames in a {}x{} sprite",
                    index.layout.frame_count, index.layout.columns, index.layout.rows
                ));
                Some(index)
            }
            Ok(None) => {
                logger.log_warning(format!("No frames sampled from {}", video.display()));
                None
            }
            Err(e) => {
                logger.log_error(format!("Preview generation failed: {}", e));
                None
            }
        }
    }

    async fn build(
        &self,
        video: &Path,
        config: &ThumbnailVttConfig,
        temp_dir: &Path,
    ) -> WorkerResult<Option<PreviewIndex>> {
        let frames = self.sampler.sample(video, config, temp_dir).await?;
        if frames.is_empty() {
            return Ok(None);
        }

        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| WorkerError::validation(format!("{} has no file name", video.display())))?;

        let sprite_path = self.sprite_dir.join(format!("{stem}_sprite.jpg"));
        let columns = config.columns();
        let layout = {
            let out = sprite_path.clone();
            tokio::task::spawn_blocking(move || compose_sprite(&frames, columns, &out))
                .await
                .map_err(|e| WorkerError::internal(format!("sprite task failed: {e}")))??
        };
        let sprite_id = self.files.get_or_create(&sprite_path).await?;

        let cues = build_cues(&layout, config.interval_secs());
        let vtt_path = self.vtt_dir.join(format!("{stem}_thumbs.vtt"));
        tokio::fs::create_dir_all(&self.vtt_dir).await?;
        tokio::fs::write(&vtt_path, render_cue_file(&cues, sprite_id.as_str())).await?;
        let vtt_id = self.files.get_or_create(&vtt_path).await?;

        Ok(Some(PreviewIndex {
            sprite_id,
            vtt_id,
            sprite_path,
            vtt_path,
            layout,
        }))
    }
}
