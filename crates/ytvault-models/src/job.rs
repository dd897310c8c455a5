//! Download job definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ModelError;
use crate::file::{empty_as_none, FileId};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Persisted lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for the engine to report its first progress event
    #[default]
    Queued,
    /// Engine is transferring data
    Downloading,
    Paused,
    /// Artifacts are finalized and registered
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Downloading,
        JobStatus::Paused,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether a job in this status is picked up again on startup.
    pub fn is_resumable(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Downloading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ModelError::InvalidStatus(s.to_string()))
    }
}

/// Requested quality for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadFormat {
    #[default]
    Best,
    AudioOnly,
    Worst,
}

impl DownloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFormat::Best => "best",
            DownloadFormat::AudioOnly => "audio_only",
            DownloadFormat::Worst => "worst",
        }
    }
}

impl FromStr for DownloadFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(DownloadFormat::Best),
            "audio_only" => Ok(DownloadFormat::AudioOnly),
            "worst" => Ok(DownloadFormat::Worst),
            other => Err(ModelError::InvalidFormat(other.to_string())),
        }
    }
}

/// What the job was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    #[default]
    Download,
    Scan,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Download => "download",
            JobKind::Scan => "scan",
        }
    }
}

impl FromStr for JobKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(JobKind::Download),
            "scan" => Ok(JobKind::Scan),
            other => Err(ModelError::InvalidKind(other.to_string())),
        }
    }
}

/// Metadata the engine resolves for a source URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Engine-assigned video id (e.g. the YouTube id)
    pub video_id: String,
    pub full_title: String,
    pub duration_string: String,
    pub resolution: String,
    /// Human readable total size, e.g. `"12.34MiB"`
    pub size: String,
}

/// A tracked download task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID
    #[serde(default)]
    pub id: JobId,

    /// Source URL handed to the engine
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub full_title: String,
    #[serde(default)]
    pub duration_string: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub size: String,

    /// Lifecycle status
    #[serde(default)]
    pub download_status: JobStatus,

    #[serde(default)]
    pub format: DownloadFormat,
    #[serde(default)]
    pub audio_only: bool,
    #[serde(default, rename = "type")]
    pub kind: JobKind,

    #[serde(default)]
    pub watched: bool,
    /// Set once the video file has been served to a client
    #[serde(default)]
    pub downloaded: bool,
    /// Playback offset in seconds
    #[serde(default)]
    pub prev_watch_time: i64,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub video_path_id: Option<FileId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub thumbnail_path_id: Option<FileId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub vtt_path_id: Option<FileId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub vtt_sprite_path_id: Option<FileId>,
}

impl Job {
    /// Create a queued job for a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            url: url.into(),
            video_id: String::new(),
            full_title: String::new(),
            duration_string: String::new(),
            resolution: String::new(),
            size: String::new(),
            download_status: JobStatus::Queued,
            format: DownloadFormat::Best,
            audio_only: false,
            kind: JobKind::Download,
            watched: false,
            downloaded: false,
            prev_watch_time: 0,
            video_path_id: None,
            thumbnail_path_id: None,
            vtt_path_id: None,
            vtt_sprite_path_id: None,
        }
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    pub fn with_format(mut self, format: DownloadFormat) -> Self {
        self.format = format;
        self.audio_only = format == DownloadFormat::AudioOnly;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.download_status = status;
        self
    }

    /// Copy resolved engine metadata onto the record.
    pub fn apply_metadata(&mut self, meta: &VideoMetadata) {
        self.video_id = meta.video_id.clone();
        self.full_title = meta.full_title.clone();
        self.duration_string = meta.duration_string.clone();
        self.resolution = meta.resolution.clone();
        self.size = meta.size.clone();
    }

    /// All non-empty file references held by this job.
    pub fn file_ids(&self) -> Vec<&FileId> {
        [
            &self.video_path_id,
            &self.thumbnail_path_id,
            &self.vtt_path_id,
            &self.vtt_sprite_path_id,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Whether the engine should be asked for audio only.
    pub fn wants_audio_only(&self) -> bool {
        self.audio_only || self.format == DownloadFormat::AudioOnly
    }
}

/// Partial update of the user-editable job fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub url: Option<String>,
    pub full_title: Option<String>,
    pub duration_string: Option<String>,
    pub resolution: Option<String>,
    pub size: Option<String>,
    pub download_status: Option<JobStatus>,
    pub format: Option<DownloadFormat>,
    pub audio_only: Option<bool>,
    pub watched: Option<bool>,
    pub downloaded: Option<bool>,
    pub prev_watch_time: Option<i64>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        *self == JobPatch::default()
    }

    /// Apply every field that is present.
    pub fn apply(self, job: &mut Job) {
        if let Some(v) = self.url {
            job.url = v;
        }
        if let Some(v) = self.full_title {
            job.full_title = v;
        }
        if let Some(v) = self.duration_string {
            job.duration_string = v;
        }
        if let Some(v) = self.resolution {
            job.resolution = v;
        }
        if let Some(v) = self.size {
            job.size = v;
        }
        if let Some(v) = self.download_status {
            job.download_status = v;
        }
        if let Some(v) = self.format {
            job.format = v;
        }
        if let Some(v) = self.audio_only {
            job.audio_only = v;
        }
        if let Some(v) = self.watched {
            job.watched = v;
        }
        if let Some(v) = self.downloaded {
            job.downloaded = v;
        }
        if let Some(v) = self.prev_watch_time {
            job.prev_watch_time = v;
        }
    }
}
