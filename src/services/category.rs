//! Category service
//!
//! Categories are flat. Names and slugs are unique; deleting a category
//! only removes its post associations.

use crate::cache::{self, Cache};
use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
use crate::services::slug::{generate_slug, is_valid_slug};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

const CACHE_KEY_CATEGORY_LIST: &str = "categories:list";
const CACHE_KEY_CATEGORY_COUNTS: &str = "categories:counts";
const CACHE_PATTERN_CATEGORIES: &str = "categories:*";
// Post pages embed category names
const CACHE_PATTERN_POSTS: &str = "posts:*";

const MAX_NAME_LEN: usize = 100;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(cache::cached(&self.cache, CACHE_KEY_CATEGORY_LIST, || self.repo.list()).await?)
    }

    /// Categories with their published post counts, for the blog sidebar
    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>, CategoryServiceError> {
        Ok(cache::cached(&self.cache, CACHE_KEY_CATEGORY_COUNTS, || self.repo.list_with_counts()).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, CategoryServiceError> {
        Ok(self.repo.get_by_slug(slug).await?)
    }

    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;
        let slug = resolve_slug(input.slug.as_deref(), &name)?;
        if self.repo.slug_exists(&slug, None).await? {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let category = Category {
            id: 0,
            name,
            slug,
            description: non_empty(input.description),
            created_at: Utc::now(),
        };
        let created = self.repo.create(&category).await.context("Failed to create category")?;
        self.invalidate().await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateCategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self.get_by_id(id).await?;

        if let Some(name) = input.name {
            category.name = validate_name(&name)?;
        }
        if let Some(slug) = input.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            let slug = resolve_slug(Some(slug), &category.name)?;
            if slug != category.slug && self.repo.slug_exists(&slug, Some(id)).await? {
                return Err(CategoryServiceError::DuplicateSlug(slug));
            }
            category.slug = slug;
        }
        if let Some(description) = input.description {
            category.description = non_empty(Some(description));
        }

        let updated = self.repo.update(&category).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        self.get_by_id(id).await?;
        self.repo.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    async fn invalidate(&self) {
        cache::invalidate(&self.cache, CACHE_PATTERN_CATEGORIES).await;
        cache::invalidate(&self.cache, CACHE_PATTERN_POSTS).await;
    }
}

fn validate_name(name: &str) -> Result<String, CategoryServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError("Category name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category name is longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn resolve_slug(given: Option<&str>, name: &str) -> Result<String, CategoryServiceError> {
    let source = given.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(name);
    let slug = generate_slug(source);
    if !is_valid_slug(&slug) {
        return Err(CategoryServiceError::ValidationError(format!(
            "Cannot build a slug from '{}'",
            source
        )));
    }
    Ok(slug)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
