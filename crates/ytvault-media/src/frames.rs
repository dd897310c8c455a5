//! Fixed-interval frame sampling.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use ytvault_models::ThumbnailVttConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// File name pattern for sampled frames.
pub const FRAME_PATTERN: &str = "thumb%04d.jpg";

/// Extracts preview frames from a video.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// Write one frame per `config.interval` seconds into `out_dir` and return
    /// their paths in timestamp order.
    async fn sample(
        &self,
        video: &Path,
        config: &ThumbnailVttConfig,
        out_dir: &Path,
    ) -> MediaResult<Vec<PathBuf>>;
}

/// [`FrameSampler`] using FFmpeg's `fps` filter.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameSampler {
    runner: FfmpegRunner,
}

impl FfmpegFrameSampler {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn sample(
        &self,
        video: &Path,
        config: &ThumbnailVttConfig,
        out_dir: &Path,
    ) -> MediaResult<Vec<PathBuf>> {
        if !video.exists() {
            return Err(MediaError::FileNotFound(video.to_path_buf()));
        }
        fs::create_dir_all(out_dir).await?;

        let cmd = FfmpegCommand::new(video, out_dir.join(FRAME_PATTERN))
            .video_filter(config.fps_filter())
            .image_quality(3);
        self.runner.run(&cmd).await?;

        let frames = list_frames(out_dir).await?;
        debug!("Sampled {} frames from {}", frames.len(), video.display());
        Ok(frames)
    }
}

/// Sampled frames in `dir`, sorted by name (and therefore by timestamp).
pub async fn list_frames(dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("thumb") && n.ends_with(".jpg"));
        if is_frame {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}
