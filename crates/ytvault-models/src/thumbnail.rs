//! Scrubbing-preview configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::error::{ModelError, ModelResult};

/// How frames are sampled and laid out for a job's sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailVttConfig {
    /// Seconds between sampled frames
    interval: NonZeroU32,
    /// Frames per sprite row
    columns: NonZeroU32,
}

impl ThumbnailVttConfig {
    pub fn new(interval_secs: u32, columns: u32) -> ModelResult<Self> {
        let interval =
            NonZeroU32::new(interval_secs).ok_or(ModelError::NotPositive { field: "interval" })?;
        let columns = NonZeroU32::new(columns).ok_or(ModelError::NotPositive { field: "columns" })?;
        Ok(Self { interval, columns })
    }

    pub fn interval_secs(&self) -> u32 {
        self.interval.get()
    }

    pub fn columns(&self) -> u32 {
        self.columns.get()
    }

    /// FFmpeg `fps` filter producing one frame per interval.
    pub fn fps_filter(&self) -> String {
        format!("fps=1/{}", self.interval)
    }
}

impl Default for ThumbnailVttConfig {
    fn default() -> Self {
        Self {
            interval: NonZeroU32::MIN,
            columns: NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_values() {
        assert_eq!(
            ThumbnailVttConfig::new(0, 10),
            Err(ModelError::NotPositive { field: "interval" })
        );
        assert_eq!(
            ThumbnailVttConfig::new(5, 0),
            Err(ModelError::NotPositive { field: "columns" })
        );
    }

    #[test]
    fn test_defaults_and_filter() {
        let config = ThumbnailVttConfig::default();
        assert_eq!(config.interval_secs(), 1);
        assert_eq!(config.columns(), 10);
        assert_eq!(ThumbnailVttConfig::new(10, 4).unwrap().fps_filter(), "fps=1/10");
    }
}
