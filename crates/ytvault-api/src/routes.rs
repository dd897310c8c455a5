//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_video, delete_video, get_video, health, list_videos, ready, serve_file, update_video,
};
use crate::metrics::metrics_middleware;
use crate::middleware::cors_layer;
use crate::state::AppState;
use crate::ws::ws_events;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/api/", get(health))
        .route("/api/videos", get(list_videos))
        .route("/api/video", post(create_video))
        .route(
            "/api/video/:id",
            get(get_video).put(update_video).delete(delete_video),
        )
        .route("/api/files/:file_id", get(serve_file));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .merge(api_routes)
        .route("/ws", get(ws_events))
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
