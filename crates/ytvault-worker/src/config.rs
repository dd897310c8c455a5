//! Worker configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ytvault_media::EngineOptions;
use ytvault_models::ThumbnailVttConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for finished downloads and every derived artifact directory
    pub download_dir: PathBuf,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Preview sampling applied to every completed job
    pub thumbnails: ThumbnailVttConfig,
    /// Retry/concurrency knobs handed to yt-dlp
    pub engine: EngineOptions,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            database_path: PathBuf::from("./data/data.db"),
            thumbnails: ThumbnailVttConfig::default(),
            engine: EngineOptions::default(),
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WorkerResult<Self> {
        let defaults = Self::default();
        let defaults_engine = EngineOptions::default();

        let thumbnails = ThumbnailVttConfig::new(
            parse_or(&lookup, "YTVAULT_THUMB_INTERVAL", defaults.thumbnails.interval_secs())?,
            parse_or(&lookup, "YTVAULT_THUMB_COLUMNS", defaults.thumbnails.columns())?,
        )
        .map_err(|e| WorkerError::config_error(e.to_string()))?;

        Ok(Self {
            download_dir: lookup("YTVAULT_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            database_path: lookup("YTVAULT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            thumbnails,
            engine: EngineOptions {
                retries: parse_or(&lookup, "YTVAULT_RETRIES", defaults_engine.retries)?,
                fragment_retries: parse_or(
                    &lookup,
                    "YTVAULT_FRAGMENT_RETRIES",
                    defaults_engine.fragment_retries,
                )?,
                concurrent_fragments: parse_or(
                    &lookup,
                    "YTVAULT_CONCURRENT_FRAGMENTS",
                    defaults_engine.concurrent_fragments,
                )?,
                merge_output_format: lookup("YTVAULT_MERGE_FORMAT")
                    .unwrap_or(defaults_engine.merge_output_format),
            },
            ytdlp_bin: lookup("YTVAULT_YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            ffmpeg_bin: lookup("YTVAULT_FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
        })
    }

    /// Same settings rooted at another download directory.
    pub fn with_download_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.download_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.download_dir.join("thumbnails")
    }

    pub fn sprite_dir(&self) -> PathBuf {
        self.download_dir.join("sprite")
    }

    pub fn vtt_dir(&self) -> PathBuf {
        self.download_dir.join("vtt")
    }

    /// Parent of the per-job frame scratch directories.
    pub fn temp_thumbs_root(&self) -> PathBuf {
        self.download_dir.join("temp").join("thumbs")
    }

    /// Create the download directory tree.
    pub async fn ensure_dirs(&self) -> WorkerResult<()> {
        for dir in [
            self.download_dir.clone(),
            self.thumbnails_dir(),
            self.sprite_dir(),
            self.vtt_dir(),
            self.temp_thumbs_root(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> WorkerResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WorkerError::config_error(format!("{key} has invalid value {raw:?}"))),
        None => Ok(default),
    }
}
