//! Category repository

use crate::db::{on_pool, DynDatabasePool, InsertedId};
use crate::models::{Category, CategoryWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// All categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// All categories with their published post counts
    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>>;

    async fn update(&self, category: &Category) -> Result<Category>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Whether `slug` is taken by a category other than `exclude_id`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryCountRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    post_count: i64,
}

pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO categories (name, slug, description, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.created_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create category")?;

        Ok(Category { id, ..category.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CategoryRow>(
                "SELECT id, name, slug, description, created_at FROM categories WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(conn)
            .await
        })
        .context("Failed to get category by ID")?;

        Ok(row.map(Category::from))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CategoryRow>(
                "SELECT id, name, slug, description, created_at FROM categories WHERE slug = ?",
            )
            .bind(slug)
            .fetch_optional(conn)
            .await
        })
        .context("Failed to get category by slug")?;

        Ok(row.map(Category::from))
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CategoryRow>(
                "SELECT id, name, slug, description, created_at FROM categories ORDER BY name",
            )
            .fetch_all(conn)
            .await
        })
        .context("Failed to list categories")?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>> {
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, CategoryCountRow>(
                r#"
                SELECT c.id, c.name, c.slug, c.description, c.created_at,
                       (SELECT COUNT(*) FROM blog_post_categories pc
                        JOIN blog_posts p ON p.id = pc.post_id
                        WHERE pc.category_id = c.id AND p.status = 'published') AS post_count
                FROM categories c
                ORDER BY c.name
                "#,
            )
            .fetch_all(conn)
            .await
        })
        .context("Failed to list categories with counts")?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryWithCount {
                category: row.category.into(),
                post_count: row.post_count,
            })
            .collect())
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE categories SET name = ?, slug = ?, description = ? WHERE id = ?")
                .bind(&category.name)
                .bind(&category.slug)
                .bind(&category.description)
                .bind(category.id)
                .execute(conn)
                .await
                .map(|_| ())
        })
        .context("Failed to update category")?;

        Ok(category.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM categories WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete category")?;

        Ok(())
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(conn)
                .await
        })
        .context("Failed to check category slug")?;

        Ok(count > 0)
    }
}
