//! Ephemeral progress snapshots.

use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// Value used for any telemetry field the engine did not report.
pub const PLACEHOLDER: &str = "0";

/// Display-ready progress for one job.
///
/// Recomputed on every engine callback and pushed to subscribers; never
/// written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Job ID
    pub id: JobId,
    /// Engine-assigned video id
    pub video_id: String,
    pub percent: String,
    pub downloaded_size: String,
    pub total_size: String,
    pub eta: String,
    pub speed: String,
}

impl ProgressSnapshot {
    /// A snapshot with every display field set to the placeholder.
    pub fn empty(id: JobId) -> Self {
        Self {
            id,
            video_id: String::new(),
            percent: PLACEHOLDER.to_string(),
            downloaded_size: PLACEHOLDER.to_string(),
            total_size: PLACEHOLDER.to_string(),
            eta: PLACEHOLDER.to_string(),
            speed: PLACEHOLDER.to_string(),
        }
    }
}
