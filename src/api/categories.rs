//! Category API endpoints
//!
//! - GET /api/categories - Categories with published post counts
//! - POST /api/dashboard/categories
//! - PUT|DELETE /api/dashboard/categories/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};

/// GET /api/categories
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    let categories = state
        .category_service
        .list_with_counts()
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch categories"))?;
    Ok(Json(categories))
}

/// POST /api/dashboard/categories
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.category_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/dashboard/categories/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, body).await?))
}

/// DELETE /api/dashboard/categories/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
