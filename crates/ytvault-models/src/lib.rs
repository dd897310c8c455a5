//! Shared data models for the ytvault download manager.
//!
//! This crate provides Serde-serializable types for:
//! - Download jobs, their lifecycle status and requested format
//! - File registry identifiers
//! - Progress snapshots and notifications pushed to subscribers
//! - Scrubbing-preview (sprite + cue file) configuration

pub mod error;
pub mod events;
pub mod file;
pub mod job;
pub mod progress;
pub mod thumbnail;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use events::{Notification, ServerEvent, Severity};
pub use file::{FileEntry, FileId};
pub use job::{DownloadFormat, Job, JobId, JobKind, JobPatch, JobStatus, VideoMetadata};
pub use progress::{ProgressSnapshot, PLACEHOLDER};
pub use thumbnail::ThumbnailVttConfig;
