//! Team and department API endpoints
//!
//! Public:
//! - GET /api/team - Directory grouped by department
//! - GET /api/departments
//!
//! Dashboard:
//! - GET|POST /api/dashboard/team
//! - PUT|DELETE /api/dashboard/team/{id}
//! - POST /api/dashboard/departments
//! - PUT|DELETE /api/dashboard/departments/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    CreateDepartmentInput, CreateTeamMemberInput, Department, DepartmentGroup, TeamMember,
    UpdateDepartmentInput, UpdateTeamMemberInput,
};

/// GET /api/team
pub async fn directory(State(state): State<AppState>) -> Result<Json<Vec<DepartmentGroup>>, ApiError> {
    let groups = state
        .team_service
        .directory()
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch team"))?;
    Ok(Json(groups))
}

/// GET /api/departments
pub async fn list_departments(State(state): State<AppState>) -> Result<Json<Vec<Department>>, ApiError> {
    let departments = state
        .team_service
        .list_departments()
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch departments"))?;
    Ok(Json(departments))
}

/// GET /api/dashboard/team
pub async fn list_members(State(state): State<AppState>) -> Result<Json<Vec<TeamMember>>, ApiError> {
    Ok(Json(state.team_service.list_members().await?))
}

/// POST /api/dashboard/team
pub async fn create_member(
    State(state): State<AppState>,
    Json(body): Json<CreateTeamMemberInput>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.team_service.create_member(body).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// PUT /api/dashboard/team/{id}
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTeamMemberInput>,
) -> Result<Json<TeamMember>, ApiError> {
    Ok(Json(state.team_service.update_member(id, body).await?))
}

/// DELETE /api/dashboard/team/{id}
pub async fn delete_member(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.team_service.delete_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/dashboard/departments
pub async fn create_department(
    State(state): State<AppState>,
    Json(body): Json<CreateDepartmentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let department = state.team_service.create_department(body).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

/// PUT /api/dashboard/departments/{id}
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateDepartmentInput>,
) -> Result<Json<Department>, ApiError> {
    Ok(Json(state.team_service.update_department(id, body).await?))
}

/// DELETE /api/dashboard/departments/{id}
///
/// Members of the department become unassigned.
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.team_service.delete_department(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
