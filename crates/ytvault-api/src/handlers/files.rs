//! File delivery by registry id.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use ytvault_models::FileId;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Stream a registered file as an attachment.
///
/// Range and conditional requests are handled by `ServeFile`. Serving a
/// video marks its job as downloaded.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let path = state.manager.serve_file(&FileId::from_string(file_id)).await?;
    debug!("Serving {}", path.display());

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::internal(format!("failed to serve file: {e}")))?;
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        if let Some(value) = attachment_header(&path) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
        metrics::record_file_served(kind_of(&path));
    }
    Ok(response)
}

/// `attachment; filename="..."` with characters a header cannot carry
/// replaced by `_`.
fn attachment_header(path: &FsPath) -> Option<HeaderValue> {
    let name: String = path
        .file_name()?
        .to_string_lossy()
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")).ok()
}

fn kind_of(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => "vtt",
        Some("jpg" | "jpeg" | "png" | "webp") => "image",
        _ => "media",
    }
}
