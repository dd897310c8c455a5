#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use ytvault_media::{
    DownloadEngine, EngineRequest, HookControl, MediaError, MediaResult, RawInfo, RawTelemetry,
    TelemetryStatus,
};
use ytvault_models::{ServerEvent, ThumbnailVttConfig};
use ytvault_store::Database;
use ytvault_worker::{ChannelTransport, JobManager, JobRegistry, WorkerConfig};

/// Plays back a fixed list of telemetry events, then succeeds or fails.
///
/// `pause` is slept before each event.
#[derive(Default)]
pub struct ScriptedEngine {
    pub script: Vec<RawTelemetry>,
    pub failure: Option<String>,
    pub pause: Duration,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn urls(&self) -> Vec<String> {
        let mut urls = self.calls.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

impl DownloadEngine for ScriptedEngine {
    fn download(
        &self,
        request: &EngineRequest,
        hook: &mut dyn FnMut(RawTelemetry) -> HookControl,
    ) -> MediaResult<()> {
        self.calls.lock().unwrap().push(request.url.clone());
        for telemetry in &self.script {
            std::thread::sleep(self.pause);
            if hook(telemetry.clone()) == HookControl::Abort {
                return Err(MediaError::Cancelled);
            }
        }
        match &self.failure {
            Some(message) => Err(MediaError::download_failed(message.clone())),
            None => Ok(()),
        }
    }
}

/// Emits progress every few milliseconds until told to abort.
pub struct StallingEngine {
    pub filename: PathBuf,
}

impl DownloadEngine for StallingEngine {
    fn download(
        &self,
        _request: &EngineRequest,
        hook: &mut dyn FnMut(RawTelemetry) -> HookControl,
    ) -> MediaResult<()> {
        for i in 0..2000 {
            let telemetry = RawTelemetry {
                percent: Some(format!("{}.0%", i % 100)),
                filename: Some(self.filename.clone()),
                ..Default::default()
            };
            if hook(telemetry) == HookControl::Abort {
                return Err(MediaError::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Err(MediaError::download_failed("stalled"))
    }
}

/// Writes solid frames instead of running FFmpeg.
pub struct SolidFrames(pub usize);

#[async_trait]
impl ytvault_media::FrameSampler for SolidFrames {
    async fn sample(
        &self,
        _video: &Path,
        _config: &ThumbnailVttConfig,
        out_dir: &Path,
    ) -> MediaResult<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let mut frames = Vec::new();
        for i in 0..self.0 {
            let path = out_dir.join(format!("thumb{:04}.jpg", i + 1));
            RgbImage::from_pixel(8, 6, Rgb([0, 128, 255])).save(&path)?;
            frames.push(path);
        }
        Ok(frames)
    }
}

pub fn progress(percent: &str, filename: &Path) -> RawTelemetry {
    RawTelemetry {
        status: TelemetryStatus::Downloading,
        percent: Some(format!("\x1b[0;94m{}\x1b[0m", percent)),
        downloaded_bytes: Some("1.00MiB".to_string()),
        total_bytes: Some("2.00MiB".to_string()),
        eta: Some("00:01".to_string()),
        speed: Some("1.00MiB/s".to_string()),
        filename: Some(filename.to_path_buf()),
        info: info(),
        ..Default::default()
    }
}

pub fn finished(video: &Path, thumbnail: Option<&Path>) -> RawTelemetry {
    RawTelemetry {
        status: TelemetryStatus::Finished,
        percent: Some("100%".to_string()),
        downloaded_bytes: Some("2.00MiB".to_string()),
        total_bytes: Some("2.00MiB".to_string()),
        filename: Some(video.to_path_buf()),
        thumbnail: thumbnail.map(Path::to_path_buf),
        info: info(),
        ..Default::default()
    }
}

fn info() -> RawInfo {
    RawInfo {
        id: Some("abc123".to_string()),
        full_title: Some("Test Clip".to_string()),
        duration_string: Some("0:23".to_string()),
        resolution: Some("1280x720".to_string()),
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub manager: JobManager,
    pub transport: Arc<ChannelTransport>,
}

impl Harness {
    pub async fn new(engine: Arc<dyn DownloadEngine>, dir: TempDir) -> Self {
        let db = Database::new_in_memory().await.unwrap();
        let transport = Arc::new(ChannelTransport::new());
        let config = WorkerConfig::default().with_download_dir(dir.path());
        config.ensure_dirs().await.unwrap();
        let manager = JobManager::new(
            db,
            transport.clone(),
            engine,
            Arc::new(SolidFrames(3)),
            config,
        );
        Self {
            dir,
            manager,
            transport,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Everything currently queued for a subscriber, by event name.
pub fn drain_names(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    names
}

pub async fn wait_until_idle(registry: &JobRegistry) {
    for _ in 0..500 {
        if registry.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("workers still running: {:?}", registry.active_ids());
}
