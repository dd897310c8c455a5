//! Axum API server binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ytvault_api::{create_router, metrics, ApiConfig, AppState};
use ytvault_media::{check_ffmpeg, FfmpegFrameSampler, FfmpegRunner, YtDlpEngine};
use ytvault_store::Database;
use ytvault_worker::{Bootstrapper, ChannelTransport, JobManager, WorkerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting ytvault-api");

    if let Err(e) = run().await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ytvault=info,tower_http=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!(
        "API config: host={}, port={}, downloads={}",
        config.host,
        config.port,
        worker_config.download_dir.display()
    );

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);
    let metrics_handle = if metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Metrics disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    worker_config
        .ensure_dirs()
        .await
        .context("failed to create download directories")?;
    let db = Database::new(&worker_config.database_path)
        .await
        .context("failed to open database")?;

    let engine = YtDlpEngine::new(worker_config.ytdlp_bin.clone());
    match engine.check() {
        Ok(path) => info!("Using yt-dlp at {}", path.display()),
        Err(e) => warn!("{}; downloads will fail until it is installed", e),
    }
    match check_ffmpeg(&worker_config.ffmpeg_bin) {
        Ok(path) => info!("Using ffmpeg at {}", path.display()),
        Err(e) => warn!("{}; previews will be skipped", e),
    }
    let sampler = FfmpegFrameSampler::new(FfmpegRunner::new(worker_config.ffmpeg_bin.clone()));

    let transport = Arc::new(ChannelTransport::new());
    let manager = JobManager::new(
        db,
        transport.clone(),
        Arc::new(engine),
        Arc::new(sampler),
        worker_config,
    );

    let resumed = Bootstrapper::new(manager.clone())
        .resume_interrupted_jobs()
        .await
        .context("failed to resume interrupted jobs")?;
    if resumed > 0 {
        info!("{} interrupted job(s) back in progress", resumed);
    }

    let state = AppState::new(config.clone(), manager, transport);
    let app = create_router(state, metrics_handle);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
