//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - The JSON error type and its mapping from service errors
//! - Authentication (session token from bearer header or cookie)
//! - Role gates for dashboard routes
//! - Response headers for user uploads

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

use crate::cache::create_cache;
use crate::config::{AuthConfig, Config, SiteConfig};
use crate::db::repositories::{
    SqlxBrandRepository, SqlxCategoryRepository, SqlxClientRepository, SqlxCommentRepository,
    SqlxEngagementRepository, SqlxPostRepository, SqlxSessionRepository, SqlxTeamRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Liker, User, UserRole};
use crate::pages::Templates;
use crate::services::{
    generate_fingerprint, ActivityFeedService, BrandService, BrandServiceError, CategoryService,
    CategoryServiceError, ClientService, ClientServiceError, CommentService, CommentServiceError,
    EngagementError, EngagementService, LoginRateLimiter, PostService, PostServiceError, TeamService,
    TeamServiceError, UploadError, UploadService, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub auth: Arc<AuthConfig>,
    pub site: Arc<SiteConfig>,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub engagement_service: Arc<EngagementService>,
    pub brand_service: Arc<BrandService>,
    pub team_service: Arc<TeamService>,
    pub client_service: Arc<ClientService>,
    pub category_service: Arc<CategoryService>,
    pub activity_service: Arc<ActivityFeedService>,
    pub upload_service: Arc<UploadService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Wire repositories, the cache and services on top of a migrated pool
    pub fn new(config: &Config, pool: DynDatabasePool) -> anyhow::Result<Self> {
        let cache = create_cache(&config.cache);

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let brand_repo = SqlxBrandRepository::boxed(pool.clone());
        let team_repo = SqlxTeamRepository::boxed(pool.clone());
        let client_repo = SqlxClientRepository::boxed(pool.clone());

        Ok(Self {
            auth: Arc::new(config.auth.clone()),
            site: Arc::new(config.site.clone()),
            user_service: Arc::new(UserService::with_session_expiration(
                user_repo.clone(),
                session_repo,
                config.auth.session_days,
            )),
            post_service: Arc::new(PostService::new(post_repo.clone(), category_repo.clone(), cache.clone())),
            comment_service: Arc::new(CommentService::new(comment_repo.clone(), post_repo.clone(), cache.clone())),
            engagement_service: Arc::new(EngagementService::new(
                SqlxEngagementRepository::boxed(pool.clone()),
                post_repo.clone(),
                cache.clone(),
            )),
            brand_service: Arc::new(BrandService::new(brand_repo.clone(), cache.clone())),
            team_service: Arc::new(TeamService::new(team_repo.clone(), cache.clone())),
            client_service: Arc::new(ClientService::new(client_repo.clone(), cache.clone())),
            category_service: Arc::new(CategoryService::new(category_repo, cache)),
            activity_service: Arc::new(ActivityFeedService::new(
                post_repo,
                comment_repo,
                brand_repo,
                team_repo,
                user_repo,
                client_repo,
            )),
            upload_service: Arc::new(UploadService::new(config.upload.clone())),
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            templates: Arc::new(Templates::load()?),
            pool,
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The signed-in user, if any. Filled in by [`optional_auth`].
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log an unexpected error and hide its details from the client
    pub fn internal(err: impl std::fmt::Display, message: impl Into<String>) -> Self {
        tracing::error!("{}", err);
        Self::internal_error(message)
    }

    /// Replace the message of an internal error with a friendlier one
    pub fn or_message(mut self, message: &str) -> Self {
        if self.error.code == "INTERNAL_ERROR" {
            self.error.message = message.to_string();
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(format!("User already exists: {}", msg)),
            UserServiceError::NotFound(id) => ApiError::not_found(format!("User {} not found", id)),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(msg) => ApiError::not_found(format!("Post not found: {}", msg)),
            PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PostServiceError::DuplicateSlug(slug) => ApiError::conflict(format!("Slug already exists: {}", slug)),
            PostServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            PostServiceError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(msg) => ApiError::not_found(format!("Not found: {}", msg)),
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<EngagementError> for ApiError {
    fn from(e: EngagementError) -> Self {
        match e {
            EngagementError::NotFound(slug) => ApiError::not_found(format!("Post not found: {}", slug)),
            EngagementError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<BrandServiceError> for ApiError {
    fn from(e: BrandServiceError) -> Self {
        match e {
            BrandServiceError::NotFound(msg) => ApiError::not_found(format!("Not found: {}", msg)),
            BrandServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            BrandServiceError::DuplicateSlug(slug) => ApiError::conflict(format!("Slug already exists: {}", slug)),
            BrandServiceError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<TeamServiceError> for ApiError {
    fn from(e: TeamServiceError) -> Self {
        match e {
            TeamServiceError::NotFound(msg) => ApiError::not_found(format!("Not found: {}", msg)),
            TeamServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TeamServiceError::DuplicateSlug(slug) => ApiError::conflict(format!("Slug already exists: {}", slug)),
            TeamServiceError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<ClientServiceError> for ApiError {
    fn from(e: ClientServiceError) -> Self {
        match e {
            ClientServiceError::NotFound(id) => ApiError::not_found(format!("Client {} not found", id)),
            ClientServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ClientServiceError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(msg) => ApiError::not_found(format!("Category not found: {}", msg)),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::DuplicateSlug(slug) => ApiError::conflict(format!("Slug already exists: {}", slug)),
            CategoryServiceError::InternalError(e) => ApiError::internal(e, INTERNAL_MESSAGE),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::InvalidType(mime) => ApiError::validation_error(format!("Invalid file type: {}", mime)),
            UploadError::TooLarge { max } => ApiError::new(
                "PAYLOAD_TOO_LARGE",
                format!("File too large. Maximum size: {} MB", max / 1024 / 1024),
            ),
            UploadError::Empty => ApiError::validation_error("No file provided"),
            UploadError::InternalError(e) => ApiError::internal(e, "Failed to save file"),
        }
    }
}

/// Extract session token from the `Authorization: Bearer` header or the
/// session cookie
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    let prefix = format!("{}=", cookie_name);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|c| c.trim().strip_prefix(prefix.as_str()))
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers(), &state.auth.cookie_name)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers(), &state.auth.cookie_name) {
        if let Ok(Some(user)) = state.user_service.validate_session(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}

fn check_role(request: &Request, required: UserRole) -> Result<(), ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.role.at_least(required) {
        return Err(ApiError::forbidden(format!("{} privileges required", required)));
    }
    Ok(())
}

/// Contributor authorization middleware
pub async fn require_contributor(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, UserRole::Contributor)?;
    Ok(next.run(request).await)
}

/// Editor authorization middleware
pub async fn require_editor(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, UserRole::Editor)?;
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, UserRole::Admin)?;
    Ok(next.run(request).await)
}

pub const UPLOAD_CSP: &str = "default-src 'none'; img-src 'self'; style-src 'unsafe-inline'; sandbox";

/// Uploaded files are served as inert content: the browser may not sniff a
/// different type, and anything opened directly runs in a sandbox with no
/// script or same-origin access.
pub async fn upload_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(UPLOAD_CSP));
    response
}

/// Client IP as reported by a reverse proxy
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().map(str::trim).filter(|s| !s.is_empty()) {
            return Some(ip.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn client_ip_addr(headers: &HeaderMap) -> Option<IpAddr> {
    client_ip(headers).and_then(|ip| ip.parse().ok())
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Who is liking or viewing: the signed-in user, else a fingerprint of the
/// visitor's IP and user agent
pub fn liker_for(user: &MaybeUser, headers: &HeaderMap) -> Result<Liker, ApiError> {
    if let Some(user) = &user.0 {
        return Ok(Liker::User(user.id));
    }
    generate_fingerprint(client_ip(headers).as_deref(), user_agent(headers).as_deref())
        .map(Liker::Visitor)
        .ok_or_else(|| ApiError::validation_error("Cannot identify visitor"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_token_from_bearer_or_cookie() {
        let bearer = headers(&[("authorization", "Bearer abc")]);
        assert_eq!(extract_session_token(&bearer, "session").as_deref(), Some("abc"));

        let cookie = headers(&[("cookie", "theme=dark; session=xyz; other=1")]);
        assert_eq!(extract_session_token(&cookie, "session").as_deref(), Some("xyz"));
        assert_eq!(extract_session_token(&cookie, "sid"), None);

        let both = headers(&[("authorization", "Bearer abc"), ("cookie", "session=xyz")]);
        assert_eq!(extract_session_token(&both, "session").as_deref(), Some("abc"));

        let empty = headers(&[("authorization", "Bearer "), ("cookie", "session=")]);
        assert_eq!(extract_session_token(&empty, "session"), None);
    }

    #[test]
    fn test_client_ip() {
        let proxied = headers(&[("x-forwarded-for", "10.0.0.1, 172.16.0.1"), ("x-real-ip", "1.1.1.1")]);
        assert_eq!(client_ip(&proxied).as_deref(), Some("10.0.0.1"));
        assert_eq!(client_ip(&headers(&[("x-real-ip", "1.1.1.1")])).as_deref(), Some("1.1.1.1"));
        assert!(client_ip_addr(&headers(&[("x-real-ip", "nope")])).is_none());
    }

    #[test]
    fn test_liker_prefers_user() {
        let user = User::new("A".into(), "a@example.com".into(), "h".into(), UserRole::Reader);
        let h = headers(&[("user-agent", "Firefox")]);
        assert_eq!(liker_for(&MaybeUser(Some(user)), &h).unwrap(), Liker::User(0));
        assert!(matches!(liker_for(&MaybeUser(None), &h).unwrap(), Liker::Visitor(_)));
        assert!(liker_for(&MaybeUser(None), &HeaderMap::new()).is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::new("RATE_LIMIT", "x").status(), StatusCode::TOO_MANY_REQUESTS);
        let e: ApiError = UploadError::TooLarge { max: 10 * 1024 * 1024 }.into();
        assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let e: ApiError = UserServiceError::Forbidden("no".into()).into();
        assert_eq!(e.status(), StatusCode::FORBIDDEN);
        let e = ApiError::internal_error("boom").or_message("Failed to fetch brands");
        assert_eq!(e.error.message, "Failed to fetch brands");
    }
}
