//! Blog post repository
//!
//! Posts, their category links and the denormalised counters
//! (`view_count`, `like_count`, `comment_count`) kept on each row.

use crate::db::{on_pool, DynDatabasePool, InsertedId};
use crate::models::{BlogPost, Category, ListParams, PostFilter, PostStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Aggregate numbers for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostStats {
    pub total: i64,
    pub published: i64,
    pub drafts: i64,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

/// Current counter values of one post
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct PostCounters {
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    /// Persist title, slug, content, excerpt, cover, status and publish time
    async fn update(&self, post: &BlogPost) -> Result<BlogPost>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Whether `slug` is taken by a post other than `exclude_id`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Filtered listing, newest first
    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<BlogPost>, i64)>;

    /// Replace the category links of a post
    async fn set_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<()>;

    async fn get_categories(&self, post_id: i64) -> Result<Vec<Category>>;

    /// Recompute counters from the likes, views and comments tables
    async fn refresh_counters(&self, post_id: i64) -> Result<PostCounters>;

    async fn stats(&self) -> Result<PostStats>;

    /// Most recently created posts, any status
    async fn recent(&self, limit: i64) -> Result<Vec<BlogPost>>;
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    slug: String,
    excerpt: String,
    content: String,
    cover_image: Option<String>,
    author_id: Option<i64>,
    author_name: Option<String>,
    status: String,
    published_at: Option<DateTime<Utc>>,
    view_count: i64,
    like_count: i64,
    comment_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for BlogPost {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(BlogPost {
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            cover_image: row.cover_image,
            author_id: row.author_id,
            author_name: row.author_name,
            status: row.status.parse()?,
            published_at: row.published_at,
            view_count: row.view_count,
            like_count: row.like_count,
            comment_count: row.comment_count,
            categories: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.excerpt, p.content, p.cover_image, p.author_id,
           u.name AS author_name, p.status, p.published_at, p.view_count, p.like_count,
           p.comment_count, p.created_at, p.updated_at
    FROM blog_posts p
    LEFT JOIN users u ON u.id = p.author_id
"#;

// Every filter is optional; a NULL bind disables its clause.
const POST_FILTER: &str = r#"
    WHERE (? IS NULL OR p.status = ?)
      AND (? IS NULL OR p.author_id = ?)
      AND (? IS NULL OR EXISTS (
            SELECT 1 FROM blog_post_categories pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.post_id = p.id AND c.slug = ?))
      AND (? IS NULL OR LOWER(p.title) LIKE ? ESCAPE '!' OR LOWER(p.excerpt) LIKE ? ESCAPE '!')
"#;

/// Build a `LIKE` pattern matching `term` anywhere, escaping wildcards with `!`
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, clause: &str, value: BindValue<'_>) -> Result<Option<BlogPost>> {
        let sql = format!("{} WHERE {}", POST_SELECT, clause);
        let row = on_pool!(self.pool, conn => {
            let query = sqlx::query_as::<_, PostRow>(&sql);
            let query = match value {
                BindValue::Int(v) => query.bind(v),
                BindValue::Text(v) => query.bind(v),
            };
            query.fetch_optional(conn).await
        })
        .context("Failed to get post")?;

        match row {
            Some(row) => {
                let mut post = BlogPost::try_from(row)?;
                post.categories = self.get_categories(post.id).await?;
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    async fn count_where(&self, sql: &str) -> Result<i64> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>(sql).fetch_one(conn).await
        })
        .with_context(|| format!("Failed to count: {}", sql))?;

        Ok(count)
    }
}

enum BindValue<'a> {
    Int(i64),
    Text(&'a str),
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO blog_posts (title, slug, excerpt, content, cover_image, author_id,
                    status, published_at, view_count, like_count, comment_count, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?)
                "#,
            )
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.cover_image)
            .bind(post.author_id)
            .bind(post.status.as_str())
            .bind(post.published_at)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create post")?;

        Ok(BlogPost {
            id,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            ..post.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>> {
        self.fetch_one_where("p.id = ?", BindValue::Int(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        self.fetch_one_where("p.slug = ?", BindValue::Text(slug)).await
    }

    async fn update(&self, post: &BlogPost) -> Result<BlogPost> {
        let now = Utc::now();
        on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE blog_posts
                SET title = ?, slug = ?, excerpt = ?, content = ?, cover_image = ?,
                    status = ?, published_at = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.cover_image)
            .bind(post.status.as_str())
            .bind(post.published_at)
            .bind(now)
            .bind(post.id)
            .execute(conn)
            .await
            .map(|_| ())
        })
        .context("Failed to update post")?;

        Ok(BlogPost {
            updated_at: now,
            ..post.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM blog_posts WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete post")?;

        Ok(())
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_posts WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(conn)
                .await
        })
        .context("Failed to check post slug")?;

        Ok(count > 0)
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<BlogPost>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let category = filter.category.as_deref();
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let count_sql = format!("SELECT COUNT(*) FROM blog_posts p {}", POST_FILTER);
        let list_sql = format!(
            "{} {} ORDER BY COALESCE(p.published_at, p.created_at) DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_SELECT, POST_FILTER
        );

        let total = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(status)
                .bind(status)
                .bind(filter.author_id)
                .bind(filter.author_id)
                .bind(category)
                .bind(category)
                .bind(search.as_deref())
                .bind(search.as_deref())
                .bind(search.as_deref())
                .fetch_one(conn)
                .await
        })
        .context("Failed to count posts")?;

        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, PostRow>(&list_sql)
                .bind(status)
                .bind(status)
                .bind(filter.author_id)
                .bind(filter.author_id)
                .bind(category)
                .bind(category)
                .bind(search.as_deref())
                .bind(search.as_deref())
                .bind(search.as_deref())
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
        })
        .context("Failed to list posts")?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            let mut post = BlogPost::try_from(row)?;
            post.categories = self.get_categories(post.id).await?;
            posts.push(post);
        }

        Ok((posts, total))
    }

    async fn set_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM blog_post_categories WHERE post_id = ?")
                .bind(post_id)
                .execute(conn)
                .await
                .map(|_| ())
        })
        .context("Failed to clear post categories")?;

        let mut seen = Vec::with_capacity(category_ids.len());
        for &category_id in category_ids {
            if seen.contains(&category_id) {
                continue;
            }
            seen.push(category_id);
            on_pool!(self.pool, conn => {
                sqlx::query("INSERT INTO blog_post_categories (post_id, category_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(category_id)
                    .execute(conn)
                    .await
                    .map(|_| ())
            })
            .with_context(|| format!("Failed to link category {} to post {}", category_id, post_id))?;
        }

        Ok(())
    }

    async fn get_categories(&self, post_id: i64) -> Result<Vec<Category>> {
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CategoryRow>(
                r#"
                SELECT c.id, c.name, c.slug, c.description, c.created_at
                FROM categories c
                JOIN blog_post_categories pc ON pc.category_id = c.id
                WHERE pc.post_id = ?
                ORDER BY c.name
                "#,
            )
            .bind(post_id)
            .fetch_all(conn)
            .await
        })
        .context("Failed to get post categories")?;

        Ok(rows
            .into_iter()
            .map(|r| Category {
                id: r.id,
                name: r.name,
                slug: r.slug,
                description: r.description,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn refresh_counters(&self, post_id: i64) -> Result<PostCounters> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE blog_posts SET
                    view_count = (SELECT COUNT(*) FROM blog_views WHERE post_id = ?),
                    like_count = (SELECT COUNT(*) FROM blog_likes WHERE post_id = ?),
                    comment_count = (SELECT COUNT(*) FROM blog_comments WHERE post_id = ?)
                WHERE id = ?
                "#,
            )
            .bind(post_id)
            .bind(post_id)
            .bind(post_id)
            .bind(post_id)
            .execute(conn)
            .await
            .map(|_| ())
        })
        .context("Failed to refresh post counters")?;

        let counters = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, PostCounters>(
                "SELECT view_count, like_count, comment_count FROM blog_posts WHERE id = ?",
            )
            .bind(post_id)
            .fetch_optional(conn)
            .await
        })
        .context("Failed to read post counters")?;

        counters.ok_or_else(|| anyhow::anyhow!("Post {} not found", post_id))
    }

    async fn stats(&self) -> Result<PostStats> {
        Ok(PostStats {
            total: self.count_where("SELECT COUNT(*) FROM blog_posts").await?,
            published: self
                .count_where("SELECT COUNT(*) FROM blog_posts WHERE status = 'published'")
                .await?,
            drafts: self
                .count_where("SELECT COUNT(*) FROM blog_posts WHERE status = 'draft'")
                .await?,
            views: self.count_where("SELECT COUNT(*) FROM blog_views").await?,
            likes: self.count_where("SELECT COUNT(*) FROM blog_likes").await?,
            comments: self.count_where("SELECT COUNT(*) FROM blog_comments").await?,
        })
    }

    async fn recent(&self, limit: i64) -> Result<Vec<BlogPost>> {
        let sql = format!("{} ORDER BY p.created_at DESC, p.id DESC LIMIT ?", POST_SELECT);
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, PostRow>(&sql).bind(limit).fetch_all(conn).await
        })
        .context("Failed to get recent posts")?;

        rows.into_iter().map(BlogPost::try_from).collect()
    }
}
