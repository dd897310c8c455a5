//! Job CRUD handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use ytvault_models::{Job, JobId, JobPatch};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteVideoResponse {
    pub id: String,
    pub status: &'static str,
}

pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<Vec<Job>>> {
    Ok(Json(state.manager.list_jobs().await?))
}

pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    Ok(Json(state.manager.get_job(&JobId::from_string(id)).await?))
}

/// Create a job and start downloading it right away.
///
/// The body is a job record; only `url` is required. A client-chosen `id`
/// that already exists is rejected with 400.
pub async fn create_video(
    State(state): State<AppState>,
    Json(job): Json<Job>,
) -> ApiResult<Json<Job>> {
    let job = state.manager.create_job(job).await?;
    Ok(Json(job))
}

pub async fn update_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> ApiResult<Json<Job>> {
    if patch.is_empty() {
        return Err(ApiError::bad_request("No valid fields to update"));
    }
    let job = state
        .manager
        .update_job(&JobId::from_string(id), patch)
        .await?;
    Ok(Json(job))
}

pub async fn delete_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteVideoResponse>> {
    state.manager.delete_job(&JobId::from_string(&id)).await?;
    info!(job_id = %id, "Deleted via API");
    Ok(Json(DeleteVideoResponse {
        id,
        status: "deleted",
    }))
}
