//! Blog post service
//!
//! Post lifecycle and who may do what:
//! - contributors create drafts and may edit or delete their own drafts
//! - editors and admins publish and may edit or delete any post
//! - public reads only ever see published posts
//!
//! Editor HTML is sanitised before storage. Excerpts are derived from the
//! body unless one is given, and `published_at` is stamped on first publish.

use crate::cache::{self, Cache};
use crate::db::repositories::{CategoryRepository, PostRepository, PostStats};
use crate::models::{
    BlogPost, CreatePostInput, ListParams, PagedResult, PostFilter, PostStatus, UpdatePostInput,
    User, UserRole,
};
use crate::services::sanitize::{excerpt, sanitize_html, EXCERPT_LEN};
use crate::services::slug::{generate_slug, is_valid_slug, unique_slug};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

const MAX_TITLE_LEN: usize = 200;

/// Cache keys
const CACHE_KEY_POST_BY_SLUG: &str = "posts:slug:";
const CACHE_KEY_POST_LIST: &str = "posts:list:";
const CACHE_PATTERN_POSTS: &str = "posts:*";

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    /// The user's role or ownership does not allow the action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            cache,
        }
    }

    /// Create a post authored by `author`
    pub async fn create(&self, author: &User, input: CreatePostInput) -> Result<BlogPost, PostServiceError> {
        if !author.role.at_least(UserRole::Contributor) {
            return Err(PostServiceError::Forbidden(
                "Only contributors and above can write posts".to_string(),
            ));
        }
        ensure_may_set_status(author, input.status)?;

        let title = validate_title(&input.title)?;
        let content = validate_content(&input.content)?;

        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) => {
                let slug = normalize_slug(requested)?;
                if self.repo.slug_exists(&slug, None).await? {
                    return Err(PostServiceError::DuplicateSlug(slug));
                }
                slug
            }
            None => self.free_slug(&title).await?,
        };

        self.ensure_categories_exist(&input.category_ids).await?;

        let now = Utc::now();
        let post = BlogPost {
            id: 0,
            excerpt: pick_excerpt(input.excerpt.as_deref(), &content),
            title,
            slug,
            content,
            cover_image: non_empty(input.cover_image),
            author_id: Some(author.id),
            author_name: Some(author.name.clone()),
            status: input.status,
            published_at: (input.status == PostStatus::Published).then_some(now),
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            categories: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&post).await.context("Failed to create post")?;
        // Category links are written after the post row; a failure here
        // leaves an uncategorised post rather than no post.
        if !input.category_ids.is_empty() {
            self.repo.set_categories(created.id, &input.category_ids).await?;
        }

        self.invalidate().await;
        tracing::info!(post_id = created.id, author = author.id, status = %created.status, "Post created");

        self.require(created.id).await
    }

    /// Update a post. Omitted fields are left unchanged.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<BlogPost, PostServiceError> {
        let existing = self.require(id).await?;
        ensure_can_modify(actor, &existing)?;
        if let Some(status) = input.status {
            ensure_may_set_status(actor, status)?;
        }

        let mut post = existing.clone();

        if let Some(title) = input.title {
            post.title = validate_title(&title)?;
        }
        if let Some(slug) = input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let slug = normalize_slug(slug)?;
            if slug != existing.slug && self.repo.slug_exists(&slug, Some(id)).await? {
                return Err(PostServiceError::DuplicateSlug(slug));
            }
            post.slug = slug;
        }
        if let Some(content) = input.content {
            post.content = validate_content(&content)?;
        }

        post.excerpt = match input.excerpt {
            Some(given) => pick_excerpt(Some(given.as_str()), &post.content),
            // Keep a hand-written excerpt; refresh one that was derived
            None if existing.excerpt == excerpt(&existing.content, EXCERPT_LEN) => {
                excerpt(&post.content, EXCERPT_LEN)
            }
            None => existing.excerpt.clone(),
        };

        if let Some(cover) = input.cover_image {
            post.cover_image = non_empty(Some(cover));
        }

        if let Some(status) = input.status {
            post.status = status;
            if status == PostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
        }

        if let Some(ref category_ids) = input.category_ids {
            self.ensure_categories_exist(category_ids).await?;
        }

        self.repo.update(&post).await.context("Failed to update post")?;
        if let Some(category_ids) = input.category_ids {
            self.repo.set_categories(id, &category_ids).await?;
        }

        self.invalidate().await;
        tracing::info!(post_id = id, actor = actor.id, "Post updated");

        self.require(id).await
    }

    /// Delete a post with its comments, likes, views and category links
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), PostServiceError> {
        let existing = self.require(id).await?;
        ensure_can_modify(actor, &existing)?;

        self.repo.delete(id).await.context("Failed to delete post")?;
        self.invalidate().await;
        tracing::info!(post_id = id, actor = actor.id, "Post deleted");
        Ok(())
    }

    /// Published post by slug, for public pages
    pub async fn get_published(&self, slug: &str) -> Result<Option<BlogPost>, PostServiceError> {
        let key = format!("{}{}", CACHE_KEY_POST_BY_SLUG, slug);
        let post: Option<BlogPost> = cache::cached(&self.cache, &key, || async {
            self.repo.get_by_slug(slug).await
        })
        .await?;

        Ok(post.filter(BlogPost::is_published))
    }

    /// Any post by id, for the dashboard
    pub async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>, PostServiceError> {
        Ok(self.repo.get_by_id(id).await?)
    }

    /// Any post by slug, bypassing the cache
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, PostServiceError> {
        Ok(self.repo.get_by_slug(slug).await?)
    }

    /// Public listing: published posts only, newest first
    pub async fn list_published(
        &self,
        category: Option<&str>,
        search: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<BlogPost>, PostServiceError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let filter = PostFilter {
            category: category.map(str::to_string),
            search: search.map(str::to_string),
            ..PostFilter::published()
        };

        // Search results are not cached; their key space is unbounded
        if search.is_some() {
            return self.list(&filter, params).await;
        }

        let key = format!(
            "{}{}:{}:{}",
            CACHE_KEY_POST_LIST,
            category.unwrap_or(""),
            params.page,
            params.per_page
        );
        cache::cached(&self.cache, &key, || self.list(&filter, params)).await
    }

    /// Dashboard listing across all statuses
    pub async fn list_all(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<BlogPost>, PostServiceError> {
        self.list(filter, params).await
    }

    pub async fn stats(&self) -> Result<PostStats, PostServiceError> {
        Ok(self.repo.stats().await?)
    }

    /// Drop cached public reads of posts and listings
    pub async fn invalidate(&self) {
        cache::invalidate(&self.cache, CACHE_PATTERN_POSTS).await;
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<BlogPost>, PostServiceError> {
        let (posts, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(posts, total, params))
    }

    async fn require(&self, id: i64) -> Result<BlogPost, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(id.to_string()))
    }

    async fn free_slug(&self, title: &str) -> Result<String, PostServiceError> {
        let base = match generate_slug(title) {
            s if s.is_empty() => "post".to_string(),
            s => s,
        };
        let repo = &self.repo;
        Ok(unique_slug(&base, |candidate| async move {
            repo.slug_exists(&candidate, None).await
        })
        .await?)
    }

    async fn ensure_categories_exist(&self, ids: &[i64]) -> Result<(), PostServiceError> {
        for &id in ids {
            if self.category_repo.get_by_id(id).await?.is_none() {
                return Err(PostServiceError::ValidationError(format!("Unknown category: {}", id)));
            }
        }
        Ok(())
    }
}

/// Editors may touch any post; contributors only their own drafts
fn ensure_can_modify(actor: &User, post: &BlogPost) -> Result<(), PostServiceError> {
    if actor.role.at_least(UserRole::Editor) {
        return Ok(());
    }
    if actor.role == UserRole::Contributor && post.author_id == Some(actor.id) && !post.is_published() {
        return Ok(());
    }
    Err(PostServiceError::Forbidden(
        "You can only change your own drafts".to_string(),
    ))
}

fn ensure_may_set_status(actor: &User, status: PostStatus) -> Result<(), PostServiceError> {
    if status == PostStatus::Published && !actor.role.at_least(UserRole::Editor) {
        return Err(PostServiceError::Forbidden(
            "Only editors can publish posts".to_string(),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<String, PostServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PostServiceError::ValidationError("Title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

/// Sanitised body; rejects bodies that are empty once active content is gone
fn validate_content(content: &str) -> Result<String, PostServiceError> {
    let clean = sanitize_html(content.trim());
    if clean.trim().is_empty() {
        return Err(PostServiceError::ValidationError("Content cannot be empty".to_string()));
    }
    Ok(clean)
}

fn normalize_slug(slug: &str) -> Result<String, PostServiceError> {
    let normalized = generate_slug(slug);
    if !is_valid_slug(&normalized) {
        return Err(PostServiceError::ValidationError(format!("Invalid slug: {}", slug)));
    }
    Ok(normalized)
}

fn pick_excerpt(given: Option<&str>, content: &str) -> String {
    match given.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => excerpt(text, EXCERPT_LEN),
        None => excerpt(content, EXCERPT_LEN),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
