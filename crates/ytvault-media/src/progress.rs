//! Normalization of raw engine telemetry.

use regex::Regex;
use std::sync::LazyLock;

use ytvault_models::{JobId, ProgressSnapshot, VideoMetadata, PLACEHOLDER};

use crate::download::RawTelemetry;

/// CSI sequences (`ESC [ ... final`) and two-byte `ESC x` sequences.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("ANSI escape pattern is valid")
});

/// Pure translation of engine telemetry into display-safe values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTranslator;

impl ProgressTranslator {
    /// Remove escape sequences and control characters, then trim.
    pub fn strip_control(raw: &str) -> String {
        let without_sequences = ANSI_ESCAPE.replace_all(raw, "");
        without_sequences
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Clean a field, substituting the placeholder when missing or blank.
    pub fn field(raw: Option<&str>) -> String {
        raw.map(Self::strip_control)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    fn text(raw: Option<&str>) -> String {
        raw.map(Self::strip_control).unwrap_or_default()
    }

    /// Build the snapshot pushed to subscribers for one telemetry event.
    pub fn translate(job_id: &JobId, raw: &RawTelemetry) -> ProgressSnapshot {
        ProgressSnapshot {
            id: job_id.clone(),
            video_id: Self::text(raw.info.id.as_deref()),
            percent: Self::field(raw.percent.as_deref()),
            downloaded_size: Self::field(raw.downloaded_bytes.as_deref()),
            total_size: Self::field(raw.total_bytes.as_deref()),
            eta: Self::field(raw.eta.as_deref()),
            speed: Self::field(raw.speed.as_deref()),
        }
    }

    /// Metadata to persist on the job record.
    pub fn metadata(raw: &RawTelemetry) -> VideoMetadata {
        VideoMetadata {
            video_id: Self::text(raw.info.id.as_deref()),
            full_title: Self::text(raw.info.full_title.as_deref()),
            duration_string: Self::text(raw.info.duration_string.as_deref()),
            resolution: Self::text(raw.info.resolution.as_deref()),
            size: Self::field(raw.total_bytes.as_deref()),
        }
    }
}
