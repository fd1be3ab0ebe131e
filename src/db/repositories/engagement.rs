//! Likes and views repository

use crate::db::{on_pool, DynDatabasePool};
use crate::models::Liker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn has_liked(&self, post_id: i64, liker: &Liker) -> Result<bool>;

    /// Insert a like; `false` if it already existed
    async fn add_like(&self, post_id: i64, liker: &Liker) -> Result<bool>;

    /// Remove a like; `false` if there was none
    async fn remove_like(&self, post_id: i64, liker: &Liker) -> Result<bool>;

    /// Whether `visitor` viewed the post at or after `since`
    async fn viewed_since(&self, post_id: i64, visitor: &str, since: DateTime<Utc>) -> Result<bool>;

    async fn add_view(&self, post_id: i64, visitor: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Column and value identifying a liker
fn liker_column(liker: &Liker) -> (&'static str, LikerValue<'_>) {
    match liker {
        Liker::User(id) => ("user_id", LikerValue::User(*id)),
        Liker::Visitor(fingerprint) => ("fingerprint", LikerValue::Visitor(fingerprint)),
    }
}

enum LikerValue<'a> {
    User(i64),
    Visitor(&'a str),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct SqlxEngagementRepository {
    pool: DynDatabasePool,
}

impl SqlxEngagementRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EngagementRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EngagementRepository for SqlxEngagementRepository {
    async fn has_liked(&self, post_id: i64, liker: &Liker) -> Result<bool> {
        let (column, value) = liker_column(liker);
        let sql = format!("SELECT COUNT(*) FROM blog_likes WHERE post_id = ? AND {} = ?", column);
        let count = on_pool!(self.pool, conn => {
            let query = sqlx::query_scalar::<_, i64>(&sql).bind(post_id);
            let query = match value {
                LikerValue::User(id) => query.bind(id),
                LikerValue::Visitor(fp) => query.bind(fp),
            };
            query.fetch_one(conn).await
        })
        .context("Failed to check like")?;

        Ok(count > 0)
    }

    async fn add_like(&self, post_id: i64, liker: &Liker) -> Result<bool> {
        if self.has_liked(post_id, liker).await? {
            return Ok(false);
        }

        let (column, value) = liker_column(liker);
        let sql = format!(
            "INSERT INTO blog_likes (post_id, {}, created_at) VALUES (?, ?, ?)",
            column
        );
        let result = on_pool!(self.pool, conn => {
            let query = sqlx::query(&sql).bind(post_id);
            let query = match value {
                LikerValue::User(id) => query.bind(id),
                LikerValue::Visitor(fp) => query.bind(fp),
            };
            query.bind(Utc::now()).execute(conn).await.map(|_| ())
        });

        match result {
            Ok(()) => Ok(true),
            // A concurrent request inserted the same like first
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e).context("Failed to add like"),
        }
    }

    async fn remove_like(&self, post_id: i64, liker: &Liker) -> Result<bool> {
        let (column, value) = liker_column(liker);
        let sql = format!("DELETE FROM blog_likes WHERE post_id = ? AND {} = ?", column);
        let removed = on_pool!(self.pool, conn => {
            let query = sqlx::query(&sql).bind(post_id);
            let query = match value {
                LikerValue::User(id) => query.bind(id),
                LikerValue::Visitor(fp) => query.bind(fp),
            };
            query.execute(conn).await.map(|r| r.rows_affected())
        })
        .context("Failed to remove like")?;

        Ok(removed > 0)
    }

    async fn viewed_since(&self, post_id: i64, visitor: &str, since: DateTime<Utc>) -> Result<bool> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM blog_views WHERE post_id = ? AND visitor = ? AND viewed_at >= ?",
            )
            .bind(post_id)
            .bind(visitor)
            .bind(since)
            .fetch_one(conn)
            .await
        })
        .context("Failed to check recent views")?;

        Ok(count > 0)
    }

    async fn add_view(&self, post_id: i64, visitor: &str, at: DateTime<Utc>) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("INSERT INTO blog_views (post_id, visitor, viewed_at) VALUES (?, ?, ?)")
                .bind(post_id)
                .bind(visitor)
                .bind(at)
                .execute(conn)
                .await
                .map(|_| ())
        })
        .context("Failed to record view")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> SqlxEngagementRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.sqlite().unwrap();
        sqlx::query("INSERT INTO blog_posts (title, slug, excerpt, content) VALUES ('Post', 'post', '', '')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (name, email, password_hash) VALUES ('U', 'u@example.com', 'h')")
            .execute(sqlite)
            .await
            .unwrap();
        SqlxEngagementRepository::new(pool)
    }

    #[tokio::test]
    async fn test_add_like_is_idempotent() {
        let repo = setup().await;
        let visitor = Liker::Visitor("fp".into());

        assert!(repo.add_like(1, &visitor).await.unwrap());
        assert!(!repo.add_like(1, &visitor).await.unwrap());
        assert!(repo.has_liked(1, &visitor).await.unwrap());

        assert!(repo.remove_like(1, &visitor).await.unwrap());
        assert!(!repo.remove_like(1, &visitor).await.unwrap());
        assert!(!repo.has_liked(1, &visitor).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_and_visitor_likes_are_separate() {
        let repo = setup().await;
        assert!(repo.add_like(1, &Liker::User(1)).await.unwrap());
        assert!(repo.add_like(1, &Liker::Visitor("fp".into())).await.unwrap());
        assert!(repo.has_liked(1, &Liker::User(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_viewed_since() {
        let repo = setup().await;
        let now = Utc::now();
        repo.add_view(1, "anon:x", now - Duration::hours(30)).await.unwrap();

        assert!(!repo.viewed_since(1, "anon:x", now - Duration::hours(24)).await.unwrap());
        assert!(repo.viewed_since(1, "anon:x", now - Duration::hours(48)).await.unwrap());
    }
}
