//! User service
//!
//! Registration, login/logout, session validation and the admin-side user
//! management rules:
//! - the first account to register becomes admin, later ones are readers
//! - an admin cannot change their own role or delete themselves
//! - the last remaining admin can be neither demoted nor deleted

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, ListParams, PagedResult, Session, User, UserRole};
use crate::services::password::{hash_password, verify_dummy, verify_password, MIN_PASSWORD_LEN};
use anyhow::Context;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    /// The action would break an account-safety rule
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for self-registration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for login
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new account.
    ///
    /// The very first account becomes admin; everybody after that starts as
    /// a reader until an admin promotes them. Registrations racing on an
    /// empty table all see themselves as first, so only the oldest of them
    /// keeps the admin role.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let is_first = self.is_first_user().await?;
        let role = if is_first { UserRole::Admin } else { UserRole::Reader };

        let mut user = self
            .create_account(CreateUserInput {
                name: input.name,
                email: input.email,
                password: input.password,
                role: Some(role),
            })
            .await?;

        if is_first {
            let first_id = self.user_repo.first_id().await.context("Failed to get first user id")?;
            if first_id != Some(user.id) {
                tracing::warn!(user_id = user.id, "Lost first-user race, registering as reader");
                user.role = UserRole::Reader;
                user = self.user_repo.update(&user).await.context("Failed to update user role")?;
            }
        }

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Create an account with an explicit role (admin action)
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let user = self.create_account(input).await?;
        tracing::info!(user_id = user.id, role = %user.role, "User created by admin");
        Ok(user)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let email = normalize_email(&input.email);
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = match self.user_repo.get_by_email(&email).await? {
            Some(user) => user,
            None => {
                verify_dummy(&input.password);
                return Err(invalid());
            }
        };

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        Ok((session, user))
    }

    /// Invalidate a session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user; expired sessions are removed
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Change a user's own password.
    ///
    /// All existing sessions are closed; the returned session replaces them.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<Session, UserServiceError> {
        let mut user = self.require_user(user_id).await?;

        if !verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?
        {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(new_password)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo.update(&user).await?;
        self.session_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to close sessions")?;

        self.create_session(user_id).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await?)
    }

    pub async fn list_users(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self.user_repo.list(params).await?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Change another user's role
    pub async fn change_role(
        &self,
        actor: &User,
        target_id: i64,
        role: UserRole,
    ) -> Result<User, UserServiceError> {
        if actor.id == target_id {
            return Err(UserServiceError::Forbidden(
                "You cannot change your own role".to_string(),
            ));
        }

        let mut target = self.require_user(target_id).await?;
        if target.role == role {
            return Ok(target);
        }
        if target.role == UserRole::Admin {
            self.ensure_not_last_admin().await?;
        }

        target.role = role;
        let updated = self.user_repo.update(&target).await?;
        tracing::info!(actor = actor.id, target = target_id, role = %role, "User role changed");
        Ok(updated)
    }

    /// Delete another user and their sessions
    pub async fn delete_user(&self, actor: &User, target_id: i64) -> Result<(), UserServiceError> {
        if actor.id == target_id {
            return Err(UserServiceError::Forbidden(
                "You cannot delete your own account".to_string(),
            ));
        }

        let target = self.require_user(target_id).await?;
        if target.role == UserRole::Admin {
            self.ensure_not_last_admin().await?;
        }

        self.user_repo.delete(target_id).await?;
        tracing::info!(actor = actor.id, target = target_id, "User deleted");
        Ok(())
    }

    /// Check if no users exist yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn create_account(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let name = input.name.trim().to_string();
        let email = normalize_email(&input.email);
        validate_name(&name)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(name, email, password_hash, input.role.unwrap_or_default());

        Ok(self.user_repo.create(&user).await.context("Failed to create user")?)
    }

    async fn require_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound(id))
    }

    async fn ensure_not_last_admin(&self) -> Result<(), UserServiceError> {
        if self.user_repo.count_by_role(UserRole::Admin).await? <= 1 {
            return Err(UserServiceError::Forbidden(
                "The last administrator cannot be removed or demoted".to_string(),
            ));
        }
        Ok(())
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, self.session_expiration_days);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_name(name: &str) -> Result<(), UserServiceError> {
    if name.is_empty() {
        return Err(UserServiceError::ValidationError("Name cannot be empty".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(UserServiceError::ValidationError(
            "Name must be at most 100 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(UserServiceError::ValidationError("Invalid email format".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    async fn register(service: &UserService, name: &str, email: &str) -> User {
        service
            .register(RegisterInput::new(name, email, "password123"))
            .await
            .expect("Failed to register")
    }

    #[tokio::test]
    async fn test_first_user_is_admin_then_readers() {
        let service = setup_test_service().await;

        let first = register(&service, "Admin", "admin@example.com").await;
        let second = register(&service, "Reader", "reader@example.com").await;

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::Reader);
    }

    #[tokio::test]
    async fn test_concurrent_first_registrations_yield_one_admin() {
        let service = setup_test_service().await;

        let (a, b, c) = tokio::join!(
            service.register(RegisterInput::new("A", "a@example.com", "password123")),
            service.register(RegisterInput::new("B", "b@example.com", "password123")),
            service.register(RegisterInput::new("C", "c@example.com", "password123")),
        );
        let users = [a.unwrap(), b.unwrap(), c.unwrap()];

        let admins: Vec<&User> = users.iter().filter(|u| u.role == UserRole::Admin).collect();
        assert_eq!(admins.len(), 1);
        let oldest = users.iter().map(|u| u.id).min().unwrap();
        assert_eq!(admins[0].id, oldest);

        // Stored roles agree with what register returned
        for user in &users {
            let stored = service.user_repo.get_by_id(user.id).await.unwrap().unwrap();
            assert_eq!(stored.role, user.role);
        }
        assert_eq!(service.user_repo.count_by_role(UserRole::Admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_normalizes_and_rejects_duplicate_email() {
        let service = setup_test_service().await;
        let user = register(&service, "Ada", "  Ada@Example.COM ").await;
        assert_eq!(user.email, "ada@example.com");

        let result = service
            .register(RegisterInput::new("Other", "ada@example.com", "password123"))
            .await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = setup_test_service().await;

        for input in [
            RegisterInput::new("", "a@example.com", "password123"),
            RegisterInput::new("A", "not-an-email", "password123"),
            RegisterInput::new("A", "a@localhost", "password123"),
            RegisterInput::new("A", "a@example.com", "short"),
        ] {
            let result = service.register(input).await;
            assert!(matches!(result, Err(UserServiceError::ValidationError(_))));
        }
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let service = setup_test_service().await;
        let user = register(&service, "Ada", "ada@example.com").await;

        let (session, logged_in) = service
            .login(LoginInput::new("ADA@example.com", "password123"))
            .await
            .expect("Login failed");
        assert_eq!(logged_in.id, user.id);

        let resolved = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = setup_test_service().await;
        register(&service, "Ada", "ada@example.com").await;

        let wrong_password = service.login(LoginInput::new("ada@example.com", "wrong-password")).await;
        assert!(matches!(wrong_password, Err(UserServiceError::AuthenticationError(_))));

        let unknown = service.login(LoginInput::new("nobody@example.com", "password123")).await;
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_change_password_rotates_sessions() {
        let service = setup_test_service().await;
        let user = register(&service, "Ada", "ada@example.com").await;
        let (old_session, _) = service
            .login(LoginInput::new("ada@example.com", "password123"))
            .await
            .unwrap();

        let bad = service.change_password(user.id, "nope-nope", "newpassword1").await;
        assert!(matches!(bad, Err(UserServiceError::AuthenticationError(_))));

        let new_session = service
            .change_password(user.id, "password123", "newpassword1")
            .await
            .unwrap();

        assert!(service.validate_session(&old_session.id).await.unwrap().is_none());
        assert!(service.validate_session(&new_session.id).await.unwrap().is_some());
        assert!(service.login(LoginInput::new("ada@example.com", "newpassword1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_cannot_change_own_role_or_delete_self() {
        let service = setup_test_service().await;
        let admin = register(&service, "Admin", "admin@example.com").await;

        let demote = service.change_role(&admin, admin.id, UserRole::Editor).await;
        assert!(matches!(demote, Err(UserServiceError::Forbidden(_))));

        let delete = service.delete_user(&admin, admin.id).await;
        assert!(matches!(delete, Err(UserServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_last_admin_protected() {
        let service = setup_test_service().await;
        let admin = register(&service, "Admin", "admin@example.com").await;
        let other = register(&service, "Other", "other@example.com").await;

        // Promote, then the new admin demotes the original: allowed while two admins exist
        let other = service.change_role(&admin, other.id, UserRole::Admin).await.unwrap();
        service.change_role(&other, admin.id, UserRole::Editor).await.unwrap();

        // Now `other` is the only admin; nobody may demote or delete them
        let editor = service.get_by_id(admin.id).await.unwrap().unwrap();
        let result = service.change_role(&editor, other.id, UserRole::Reader).await;
        assert!(matches!(result, Err(UserServiceError::Forbidden(_))));
        let result = service.delete_user(&editor, other.id).await;
        assert!(matches!(result, Err(UserServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_user_and_missing_target() {
        let service = setup_test_service().await;
        let admin = register(&service, "Admin", "admin@example.com").await;
        let reader = register(&service, "Reader", "reader@example.com").await;

        service.delete_user(&admin, reader.id).await.unwrap();
        assert!(service.get_by_id(reader.id).await.unwrap().is_none());

        let missing = service.delete_user(&admin, 4242).await;
        assert!(matches!(missing, Err(UserServiceError::NotFound(4242))));
    }

    #[tokio::test]
    async fn test_create_user_with_role_and_list() {
        let service = setup_test_service().await;
        register(&service, "Admin", "admin@example.com").await;

        let editor = service
            .create_user(CreateUserInput {
                name: "Ed".into(),
                email: "ed@example.com".into(),
                password: "password123".into(),
                role: Some(UserRole::Editor),
            })
            .await
            .unwrap();
        assert_eq!(editor.role, UserRole::Editor);

        let page = service.list_users(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions_noop() {
        let service = setup_test_service().await;
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }
}
