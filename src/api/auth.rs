//! Authentication API endpoints
//!
//! - POST /api/auth/register - Create an account (the first one becomes admin)
//! - POST /api/auth/login - Sign in
//! - POST /api/auth/logout - Sign out
//! - GET /api/auth/me - Current user
//! - PUT /api/auth/password - Change own password

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{client_ip_addr, extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::User;
use crate::services::user::{LoginInput, RegisterInput, UserServiceError};

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for changing password
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

fn cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(cookie).map_err(|e| ApiError::internal(e, "Failed to set cookie"))?,
    );
    Ok(headers)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state
        .user_service
        .register(RegisterInput::new(body.name, body.email, body.password))
        .await?;

    let (session, user) = state
        .user_service
        .login(LoginInput::new(user.email, password))
        .await?;

    Ok((
        StatusCode::CREATED,
        cookie_headers(&state.auth.session_cookie(&session.id))?,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/auth/login
///
/// Limited to 10 requests per minute per IP and 5 failures per 15 minutes
/// per account.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = client_ip_addr(&headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!(%ip, "Login rate limit exceeded for IP");
            return Err(ApiError::with_details(
                "RATE_LIMIT",
                "Too many requests, please try again later",
                serde_json::json!({ "retry_after": 60 }),
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    let account = body.email.trim().to_lowercase();
    if state.rate_limiter.is_account_limited(&account).await {
        tracing::warn!("Login rate limit exceeded for account");
        return Err(ApiError::with_details(
            "RATE_LIMIT",
            "Too many failed attempts, please try again in 15 minutes",
            serde_json::json!({ "retry_after": 900 }),
        ));
    }

    let (session, user) = match state
        .user_service
        .login(LoginInput::new(body.email, body.password))
        .await
    {
        Ok(ok) => ok,
        Err(UserServiceError::AuthenticationError(msg)) => {
            state.rate_limiter.record_failed_attempt(&account).await;
            return Err(ApiError::unauthorized(msg));
        }
        Err(e) => return Err(e.into()),
    };

    state.rate_limiter.clear_account(&account).await;
    tracing::info!(user_id = user.id, "User signed in");

    Ok((
        cookie_headers(&state.auth.session_cookie(&session.id))?,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers, &state.auth.cookie_name)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    Ok((StatusCode::NO_CONTENT, cookie_headers(&state.auth.clear_cookie())?))
}

/// GET /api/auth/me
pub async fn me(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// PUT /api/auth/password
///
/// Every other session is closed; the response carries the new token.
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .user_service
        .change_password(user.0.id, &body.current_password, &body.new_password)
        .await
        .map_err(|e| match e {
            // A wrong current password is a bad request, not a lost session
            UserServiceError::AuthenticationError(msg) => ApiError::validation_error(msg),
            other => other.into(),
        })?;

    Ok((
        cookie_headers(&state.auth.session_cookie(&session.id))?,
        Json(AuthResponse {
            user: user.0.into(),
            token: session.id,
        }),
    ))
}
