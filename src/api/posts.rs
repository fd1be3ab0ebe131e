//! Blog post API endpoints
//!
//! Public:
//! - GET /api/posts - Published posts (`?category=`, `?q=`, pagination)
//! - GET /api/posts/{slug} - One published post
//!
//! Dashboard:
//! - GET /api/dashboard/posts - All posts (`?status=`, `?author=`)
//! - GET /api/dashboard/posts/{id}
//! - POST /api/dashboard/posts
//! - PUT /api/dashboard/posts/{id}
//! - DELETE /api/dashboard/posts/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_page_size, default_per_page, non_empty};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{BlogPost, CreatePostInput, ListParams, PagedResult, PostFilter, PostStatus, UpdatePostInput};

#[derive(Debug, Deserialize)]
pub struct PublicPostQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub per_page: u32,
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardPostQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<String>,
    pub author: Option<i64>,
    pub q: Option<String>,
}

/// GET /api/posts
pub async fn list_published(
    State(state): State<AppState>,
    Query(query): Query<PublicPostQuery>,
) -> Result<Json<PagedResult<BlogPost>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    let posts = state
        .post_service
        .list_published(non_empty(query.category.as_deref()), non_empty(query.q.as_deref()), &params)
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch posts"))?;
    Ok(Json(posts))
}

/// GET /api/posts/{slug}
pub async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    state
        .post_service
        .get_published(&slug)
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch post"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", slug)))
}

/// GET /api/dashboard/posts
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<DashboardPostQuery>,
) -> Result<Json<PagedResult<BlogPost>>, ApiError> {
    let status = non_empty(query.status.as_deref())
        .map(|s| s.parse::<PostStatus>())
        .transpose()
        .map_err(|e| ApiError::validation_error(e.to_string()))?;

    let filter = PostFilter {
        status,
        author_id: query.author,
        search: non_empty(query.q.as_deref()).map(str::to_string),
        ..PostFilter::default()
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.post_service.list_all(&filter, &params).await?))
}

/// GET /api/dashboard/posts/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BlogPost>, ApiError> {
    state
        .post_service
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Post {} not found", id)))
}

/// POST /api/dashboard/posts
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/dashboard/posts/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<BlogPost>, ApiError> {
    Ok(Json(state.post_service.update(&user.0, id, body).await?))
}

/// DELETE /api/dashboard/posts/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
