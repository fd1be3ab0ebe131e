//! Public site information
//!
//! - GET /api/site - Site metadata from the configuration
//! - GET /api/health - Liveness plus a database round-trip

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::config::SiteConfig;

#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: &'static str,
    #[serde(flatten)]
    pub site: SiteConfig,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// GET /api/site
pub async fn info(State(state): State<AppState>) -> Json<SiteInfoResponse> {
    Json(SiteInfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        site: state.site.as_ref().clone(),
    })
}

/// GET /api/health
///
/// Answers 503 while the database is unreachable so load balancers can
/// take the instance out of rotation.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match state.pool.ping().await {
        Ok(()) => ("ok", StatusCode::OK, "up"),
        Err(e) => {
            tracing::warn!("Health check failed: {:#}", e);
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
