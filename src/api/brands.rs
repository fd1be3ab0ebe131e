//! Brand division API endpoints
//!
//! Public:
//! - GET /api/brands
//! - GET /api/brands/{slug} - Division with its palette and activities
//!
//! Dashboard:
//! - POST /api/dashboard/brands
//! - PUT|DELETE /api/dashboard/brands/{id}
//! - GET|POST /api/dashboard/brands/{id}/activities
//! - PUT|DELETE /api/dashboard/activities/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    BrandActivity, BrandDivision, CreateActivityInput, CreateDivisionInput, UpdateActivityInput,
    UpdateDivisionInput,
};
use crate::services::BrandPalette;

/// A division page's data
#[derive(Debug, Serialize)]
pub struct BrandDetail {
    #[serde(flatten)]
    pub division: BrandDivision,
    pub palette: BrandPalette,
    pub activities: Vec<BrandActivity>,
}

/// GET /api/brands
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<BrandDivision>>, ApiError> {
    let divisions = state
        .brand_service
        .list_divisions()
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch brands"))?;
    Ok(Json(divisions))
}

/// GET /api/brands/{slug}
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BrandDetail>, ApiError> {
    let division = state
        .brand_service
        .get_by_slug(&slug)
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch brand"))?
        .ok_or_else(|| ApiError::not_found(format!("Brand not found: {}", slug)))?;

    let activities = state
        .brand_service
        .list_activities(division.id)
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch brand"))?;

    Ok(Json(BrandDetail {
        palette: BrandPalette::for_division(&division),
        division,
        activities,
    }))
}

/// POST /api/dashboard/brands
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateDivisionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let division = state.brand_service.create_division(body).await?;
    Ok((StatusCode::CREATED, Json(division)))
}

/// PUT /api/dashboard/brands/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateDivisionInput>,
) -> Result<Json<BrandDivision>, ApiError> {
    Ok(Json(state.brand_service.update_division(id, body).await?))
}

/// DELETE /api/dashboard/brands/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.brand_service.delete_division(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/dashboard/brands/{id}/activities
pub async fn list_activities(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<BrandActivity>>, ApiError> {
    state.brand_service.get_division(id).await?;
    Ok(Json(state.brand_service.list_activities(id).await?))
}

/// POST /api/dashboard/brands/{id}/activities
pub async fn create_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CreateActivityInput>,
) -> Result<impl IntoResponse, ApiError> {
    let activity = state.brand_service.create_activity(id, body).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// PUT /api/dashboard/activities/{id}
pub async fn update_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateActivityInput>,
) -> Result<Json<BrandActivity>, ApiError> {
    Ok(Json(state.brand_service.update_activity(id, body).await?))
}

/// DELETE /api/dashboard/activities/{id}
pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.brand_service.delete_activity(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
