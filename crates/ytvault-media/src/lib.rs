//! CLI wrappers and pure helpers for media acquisition.
//!
//! This crate provides:
//! - The `DownloadEngine` contract and its yt-dlp implementation
//! - Type-safe FFmpeg command building and fixed-interval frame sampling
//! - Normalization of raw engine telemetry into display-safe progress
//! - Sprite grid layout/composition and WebVTT cue generation
//! - Filesystem helpers for relocating and cleaning up artifacts

pub mod command;
pub mod download;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod progress;
pub mod sprite;
pub mod vtt;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use download::{
    DownloadEngine, EngineOptions, EngineRequest, HookControl, RawInfo, RawTelemetry,
    TelemetryStatus, YtDlpEngine,
};
pub use error::{MediaError, MediaResult};
pub use frames::{list_frames, FfmpegFrameSampler, FrameSampler};
pub use progress::ProgressTranslator;
pub use sprite::{compose_sprite, CellRegion, SpriteLayout};
pub use vtt::{build_cues, format_cue_timestamp, render_cue_file, Cue};
