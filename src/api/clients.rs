//! Client API endpoints
//!
//! - GET /api/clients
//! - POST /api/dashboard/clients
//! - PUT|DELETE /api/dashboard/clients/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Client, CreateClientInput, UpdateClientInput};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = state
        .client_service
        .list()
        .await
        .map_err(|e| ApiError::from(e).or_message("Failed to fetch clients"))?;
    Ok(Json(clients))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateClientInput>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state.client_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateClientInput>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.client_service.update(id, body).await?))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.client_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
