//! Blog comment repository

use crate::db::{on_pool, DynDatabasePool, InsertedId};
use crate::models::{BlogComment, CommentWithPost, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &BlogComment) -> Result<BlogComment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogComment>>;

    /// All comments of a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<BlogComment>>;

    /// All comments with their post, newest first
    async fn list_all(&self, params: &ListParams) -> Result<(Vec<CommentWithPost>, i64)>;

    async fn update_content(&self, id: i64, content: &str) -> Result<()>;

    /// Delete a comment; replies go with it
    async fn delete(&self, id: i64) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    parent_id: Option<i64>,
    user_id: Option<i64>,
    author_name: String,
    author_email: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for BlogComment {
    fn from(row: CommentRow) -> Self {
        BlogComment {
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            user_id: row.user_id,
            author_name: row.author_name,
            author_email: row.author_email,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentWithPostRow {
    #[sqlx(flatten)]
    comment: CommentRow,
    post_title: String,
    post_slug: String,
}

const COMMENT_COLUMNS: &str =
    "c.id, c.post_id, c.parent_id, c.user_id, c.author_name, c.author_email, c.content, c.created_at, c.updated_at";

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &BlogComment) -> Result<BlogComment> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO blog_comments (post_id, parent_id, user_id, author_name, author_email,
                    content, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(comment.post_id)
            .bind(comment.parent_id)
            .bind(comment.user_id)
            .bind(&comment.author_name)
            .bind(&comment.author_email)
            .bind(&comment.content)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create comment")?;

        Ok(BlogComment { id, ..comment.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogComment>> {
        let sql = format!("SELECT {} FROM blog_comments c WHERE c.id = ?", COMMENT_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CommentRow>(&sql).bind(id).fetch_optional(conn).await
        })
        .context("Failed to get comment")?;

        Ok(row.map(BlogComment::from))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<BlogComment>> {
        let sql = format!(
            "SELECT {} FROM blog_comments c WHERE c.post_id = ? ORDER BY c.created_at, c.id",
            COMMENT_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CommentRow>(&sql).bind(post_id).fetch_all(conn).await
        })
        .context("Failed to list comments for post")?;

        Ok(rows.into_iter().map(BlogComment::from).collect())
    }

    async fn list_all(&self, params: &ListParams) -> Result<(Vec<CommentWithPost>, i64)> {
        let total = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_comments")
                .fetch_one(conn)
                .await
        })
        .context("Failed to count comments")?;

        let sql = format!(
            r#"
            SELECT {}, p.title AS post_title, p.slug AS post_slug
            FROM blog_comments c
            JOIN blog_posts p ON p.id = c.post_id
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ? OFFSET ?
            "#,
            COMMENT_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CommentWithPostRow>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
        })
        .context("Failed to list comments")?;

        let comments = rows
            .into_iter()
            .map(|row| CommentWithPost {
                comment: row.comment.into(),
                post_title: row.post_title,
                post_slug: row.post_slug,
            })
            .collect();

        Ok((comments, total))
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE blog_comments SET content = ?, updated_at = ? WHERE id = ?")
                .bind(content)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .map(|_| ())
        })
        .context("Failed to update comment")?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM blog_comments WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete comment")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxCommentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        sqlx::query("INSERT INTO blog_posts (title, slug, excerpt, content) VALUES ('Post', 'post', '', '')")
            .execute(pool.sqlite().unwrap())
            .await
            .unwrap();
        SqlxCommentRepository::new(pool)
    }

    fn comment(parent_id: Option<i64>, content: &str) -> BlogComment {
        let now = Utc::now();
        BlogComment {
            id: 0,
            post_id: 1,
            parent_id,
            user_id: None,
            author_name: "Guest".into(),
            author_email: None,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_by_post() {
        let repo = setup().await;
        let root = repo.create(&comment(None, "first")).await.unwrap();
        repo.create(&comment(Some(root.id), "reply")).await.unwrap();

        let comments = repo.list_by_post(1).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "first");
        assert_eq!(comments[1].parent_id, Some(root.id));
    }

    #[tokio::test]
    async fn test_delete_cascades_replies() {
        let repo = setup().await;
        let root = repo.create(&comment(None, "first")).await.unwrap();
        repo.create(&comment(Some(root.id), "reply")).await.unwrap();

        repo.delete(root.id).await.unwrap();
        assert!(repo.list_by_post(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_includes_post() {
        let repo = setup().await;
        let c = repo.create(&comment(None, "hello")).await.unwrap();
        repo.update_content(c.id, "edited").await.unwrap();

        let (all, total) = repo.list_all(&ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(all[0].post_slug, "post");
        assert_eq!(all[0].comment.content, "edited");
    }
}
