//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{on_pool, DynDatabasePool, InsertedId};
use crate::models::{ListParams, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email (exact match, emails are stored lowercased)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update name, email, password hash and role
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all users
    async fn count(&self) -> Result<i64>;

    /// Count users holding a role
    async fn count_by_role(&self, role: UserRole) -> Result<i64>;

    /// Id of the oldest account, if any
    async fn first_id(&self) -> Result<Option<i64>>;

    /// List users, newest first
    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)>;

    /// Most recently registered users
    async fn recent(&self, limit: i64) -> Result<Vec<User>>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO users (name, email, password_hash, role, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create user")?;

        Ok(User { id, ..user.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, UserRow>(&sql).bind(id).fetch_optional(conn).await
        })
        .context("Failed to get user by ID")?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, UserRow>(&sql).bind(email).fetch_optional(conn).await
        })
        .context("Failed to get user by email")?;

        row.map(User::try_from).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE users
                SET name = ?, email = ?, password_hash = ?, role = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(now)
            .bind(user.id)
            .execute(conn)
            .await
            .map(|_| ())
        })
        .context("Failed to update user")?;

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM users WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete user")?;

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(conn).await
        })
        .context("Failed to count users")?;

        Ok(count)
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
                .bind(role.as_str())
                .fetch_one(conn)
                .await
        })
        .context("Failed to count users by role")?;

        Ok(count)
    }

    async fn first_id(&self) -> Result<Option<i64>> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, Option<i64>>("SELECT MIN(id) FROM users").fetch_one(conn).await
        })
        .context("Failed to get first user id")?;

        Ok(id)
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)> {
        let total = self.count().await?;
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
        })
        .context("Failed to list users")?;

        let users = rows.into_iter().map(User::try_from).collect::<Result<Vec<_>>>()?;
        Ok((users, total))
    }

    async fn recent(&self, limit: i64) -> Result<Vec<User>> {
        let (users, _) = self.list(&ListParams::new(1, limit.clamp(1, 100) as u32)).await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn test_user(name: &str, email: &str, role: UserRole) -> User {
        User::new(name.to_string(), email.to_string(), "hash".to_string(), role)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&test_user("Ada", "ada@example.com", UserRole::Editor))
            .await
            .expect("Failed to create user");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Ada");
        assert_eq!(by_id.role, UserRole::Editor);

        let by_email = repo.get_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_fails() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("A", "dup@example.com", UserRole::Reader)).await.unwrap();
        assert!(repo
            .create(&test_user("B", "dup@example.com", UserRole::Reader))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let repo = setup_test_repo().await;
        let mut user = repo
            .create(&test_user("Ada", "ada@example.com", UserRole::Reader))
            .await
            .unwrap();

        user.role = UserRole::Admin;
        user.name = "Ada L.".to_string();
        repo.update(&user).await.unwrap();

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.role, UserRole::Admin);
        assert_eq!(fetched.name, "Ada L.");
        assert_eq!(repo.count_by_role(UserRole::Admin).await.unwrap(), 1);

        repo.delete(user.id).await.unwrap();
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_first_id() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.first_id().await.unwrap(), None);

        let first = repo.create(&test_user("Ada", "ada@example.com", UserRole::Admin)).await.unwrap();
        repo.create(&test_user("Bo", "bo@example.com", UserRole::Reader)).await.unwrap();
        assert_eq!(repo.first_id().await.unwrap(), Some(first.id));
    }

    #[tokio::test]
    async fn test_list_users_paginates() {
        let repo = setup_test_repo().await;
        for i in 0..5 {
            repo.create(&test_user(&format!("U{i}"), &format!("u{i}@example.com"), UserRole::Reader))
                .await
                .unwrap();
        }

        let (page, total) = repo.list(&ListParams::new(2, 2)).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);

        let recent = repo.recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
    }
}
