//! Like and view endpoints
//!
//! - GET /api/posts/{slug}/like - Like status for the caller
//! - POST /api/posts/{slug}/like - Toggle
//! - PUT /api/posts/{slug}/like - Like (idempotent)
//! - DELETE /api/posts/{slug}/like - Unlike (idempotent)
//! - POST /api/posts/{slug}/view - Record a view
//!
//! Signed-in callers act as themselves; anonymous callers are told apart
//! by a fingerprint of IP and user agent.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::api::middleware::{liker_for, ApiError, AppState, MaybeUser};
use crate::models::{LikeStatus, ViewResult};

pub async fn like_status(
    State(state): State<AppState>,
    user: MaybeUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    let liker = liker_for(&user, &headers)?;
    Ok(Json(state.engagement_service.status(&slug, &liker).await?))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    user: MaybeUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    let liker = liker_for(&user, &headers)?;
    Ok(Json(state.engagement_service.toggle(&slug, &liker).await?))
}

pub async fn like(
    State(state): State<AppState>,
    user: MaybeUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    let liker = liker_for(&user, &headers)?;
    Ok(Json(state.engagement_service.like(&slug, &liker).await?))
}

pub async fn unlike(
    State(state): State<AppState>,
    user: MaybeUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    let liker = liker_for(&user, &headers)?;
    Ok(Json(state.engagement_service.unlike(&slug, &liker).await?))
}

pub async fn record_view(
    State(state): State<AppState>,
    user: MaybeUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<ViewResult>, ApiError> {
    let visitor = liker_for(&user, &headers)?;
    Ok(Json(state.engagement_service.record_view(&slug, &visitor).await?))
}
