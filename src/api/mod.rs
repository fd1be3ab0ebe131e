//! API layer - HTTP handlers and routing
//!
//! JSON endpoints live under `/api`. Public routes resolve the caller when a
//! session is present; dashboard routes require a session and, depending on
//! the resource, a minimum role:
//! - contributor: own posts and uploads
//! - editor: every post, comments, brands, team, clients and categories
//! - admin: user management

pub mod auth;
pub mod brands;
pub mod categories;
pub mod clients;
pub mod comments;
pub mod common;
pub mod dashboard;
pub mod engagement;
pub mod middleware;
pub mod posts;
pub mod site;
pub mod static_files;
pub mod team;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::pages;
use crate::services::upload::UPLOAD_URL_PREFIX;

pub use middleware::{ApiError, AppState};

/// Build the `/api` routes
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let require_auth = || axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth);

    // Any signed-in user
    let member_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route("/api/dashboard/activity", get(dashboard::activity))
        .route("/api/dashboard/posts", get(posts::list_all))
        .route("/api/dashboard/posts/{id}", get(posts::get_by_id))
        .route_layer(require_auth());

    let upload_limit = state.upload_service.max_file_size() + upload::MULTIPART_OVERHEAD;
    let contributor_routes = Router::new()
        .route("/api/dashboard/posts", post(posts::create))
        .route("/api/dashboard/posts/{id}", put(posts::update).delete(posts::delete))
        .route(
            "/api/uploads",
            post(upload::upload_image).layer(DefaultBodyLimit::max(upload_limit as usize)),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_contributor))
        .route_layer(require_auth());

    let editor_routes = Router::new()
        .route("/api/dashboard/comments", get(comments::list_all))
        .route("/api/dashboard/comments/{id}", put(comments::update).delete(comments::delete))
        .route("/api/dashboard/brands", post(brands::create))
        .route("/api/dashboard/brands/{id}", put(brands::update).delete(brands::delete))
        .route(
            "/api/dashboard/brands/{id}/activities",
            get(brands::list_activities).post(brands::create_activity),
        )
        .route(
            "/api/dashboard/activities/{id}",
            put(brands::update_activity).delete(brands::delete_activity),
        )
        .route("/api/dashboard/team", get(team::list_members).post(team::create_member))
        .route("/api/dashboard/team/{id}", put(team::update_member).delete(team::delete_member))
        .route("/api/dashboard/departments", post(team::create_department))
        .route(
            "/api/dashboard/departments/{id}",
            put(team::update_department).delete(team::delete_department),
        )
        .route("/api/dashboard/clients", post(clients::create))
        .route("/api/dashboard/clients/{id}", put(clients::update).delete(clients::delete))
        .route("/api/dashboard/categories", post(categories::create))
        .route(
            "/api/dashboard/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_editor))
        .route_layer(require_auth());

    let admin_routes = Router::new()
        .route("/api/dashboard/users", get(dashboard::list_users).post(dashboard::create_user))
        .route("/api/dashboard/users/{id}", axum::routing::delete(dashboard::delete_user))
        .route("/api/dashboard/users/{id}/role", put(dashboard::change_role))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(require_auth());

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/posts", get(posts::list_published))
        .route("/api/posts/{slug}", get(posts::get_published))
        .route(
            "/api/posts/{slug}/comments",
            get(comments::list_threads).post(comments::create),
        )
        .route(
            "/api/posts/{slug}/like",
            get(engagement::like_status)
                .post(engagement::toggle_like)
                .put(engagement::like)
                .delete(engagement::unlike),
        )
        .route("/api/posts/{slug}/view", post(engagement::record_view))
        .route("/api/categories", get(categories::list))
        .route("/api/brands", get(brands::list))
        .route("/api/brands/{slug}", get(brands::get_by_slug))
        .route("/api/team", get(team::directory))
        .route("/api/departments", get(team::list_departments))
        .route("/api/clients", get(clients::list))
        .route("/api/site", get(site::info))
        .route("/api/health", get(site::health))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .merge(member_routes)
        .merge(contributor_routes)
        .merge(editor_routes)
        .merge(admin_routes)
}

/// Build the complete application: API, pages, uploads and assets
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let uploads = Router::new()
        .nest_service(UPLOAD_URL_PREFIX, ServeDir::new(state.upload_service.upload_dir()))
        .layer(axum_middleware::from_fn(middleware::upload_headers));

    Router::new()
        .merge(build_api_router(state.clone()))
        .merge(pages::router())
        .merge(uploads)
        .fallback(static_files::serve_static)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(cors_origin)),
        )
        .with_state(state)
}

/// CORS for a dashboard hosted on another origin, with cookie credentials
fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid CORS origin");
            cors
        }
    }
}
