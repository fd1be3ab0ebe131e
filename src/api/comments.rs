//! Comment API endpoints
//!
//! - GET /api/posts/{slug}/comments - Threads of a published post
//! - POST /api/posts/{slug}/comments - Comment as a guest or signed-in user
//! - GET /api/dashboard/comments - Moderation list
//! - PUT /api/dashboard/comments/{id}
//! - DELETE /api/dashboard/comments/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::common::DashboardPaginationQuery;
use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{BlogComment, CommentThread, CommentWithPost, CreateCommentInput, PagedResult, UpdateCommentInput};

/// GET /api/posts/{slug}/comments
pub async fn list_threads(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<CommentThread>>, ApiError> {
    let threads = state
        .comment_service
        .list_threads(&slug)
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch comments"))?;
    Ok(Json(threads))
}

/// POST /api/posts/{slug}/comments
pub async fn create(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(slug): Path<String>,
    Json(body): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .create(&slug, user.0.as_ref(), body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/dashboard/comments
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<DashboardPaginationQuery>,
) -> Result<Json<PagedResult<CommentWithPost>>, ApiError> {
    Ok(Json(state.comment_service.list_all(&query.params()).await?))
}

/// PUT /api/dashboard/comments/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCommentInput>,
) -> Result<Json<BlogComment>, ApiError> {
    Ok(Json(state.comment_service.update(id, body).await?))
}

/// DELETE /api/dashboard/comments/{id}
///
/// Replies go with their parent.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
