//! Upload API endpoint
//!
//! POST /api/uploads - multipart/form-data with one image in the `file`
//! field. Contributor or higher.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};

/// Room for multipart boundaries and headers on top of the file itself
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// POST /api/uploads
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(read_error)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // Reject before buffering the body
        if !state.upload_service.accepts(&content_type) {
            return Err(ApiError::validation_error(format!("Invalid file type: {}", content_type)));
        }

        let data = field.bytes().await.map_err(read_error)?;

        let stored = state.upload_service.store(&content_type, &data).await?;
        tracing::info!(user_id = user.0.id, url = %stored.url, "Image uploaded");
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(ApiError::validation_error("No file provided"))
}

fn read_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new("PAYLOAD_TOO_LARGE", "File too large")
    } else {
        ApiError::validation_error(format!("Failed to read upload: {}", e))
    }
}
