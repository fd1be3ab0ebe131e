//! Dashboard overview and user management endpoints
//!
//! - GET /api/dashboard/stats - Headline numbers
//! - GET /api/dashboard/activity - Recent activity (`?kind=`, `?limit=`)
//! - GET|POST /api/dashboard/users - Admin only
//! - PUT /api/dashboard/users/{id}/role - Admin only
//! - DELETE /api/dashboard/users/{id} - Admin only

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::auth::UserResponse;
use crate::api::common::{non_empty, DashboardPaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateUserInput, PagedResult, UserRole};
use crate::services::activity_feed::{group_by_day, DEFAULT_FEED_LIMIT};
use crate::services::{DashboardStats, FeedGroup, FeedItem, FeedKind};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

/// Recent activity, flat and grouped by day
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub items: Vec<FeedItem>,
    pub groups: Vec<FeedGroup>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

/// GET /api/dashboard/stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    state
        .activity_service
        .stats()
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(e, "Failed to fetch stats"))
}

/// GET /api/dashboard/activity
pub async fn activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let kind = non_empty(query.kind.as_deref())
        .filter(|k| *k != "all")
        .map(|k| k.parse::<FeedKind>())
        .transpose()
        .map_err(|e| ApiError::validation_error(e.to_string()))?;

    let items = state
        .activity_service
        .feed(kind, query.limit.unwrap_or(DEFAULT_FEED_LIMIT))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch activity"))?;

    Ok(Json(ActivityResponse {
        groups: group_by_day(items.clone(), Utc::now()),
        items,
    }))
}

/// GET /api/dashboard/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<DashboardPaginationQuery>,
) -> Result<Json<PagedResult<UserResponse>>, ApiError> {
    let users = state.user_service.list_users(&query.params()).await?;
    Ok(Json(users.map(UserResponse::from)))
}

/// POST /api/dashboard/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.create_user(body).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// PUT /api/dashboard/users/{id}/role
pub async fn change_role(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.change_role(&actor.0, id, body.role).await?;
    Ok(Json(user.into()))
}

/// DELETE /api/dashboard/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete_user(&actor.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
