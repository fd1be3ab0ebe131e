//! Comment service
//!
//! Comments hang off published posts and nest one level deep: a reply
//! must point at a top-level comment of the same post. Every write
//! recomputes the post's `comment_count`.

use crate::cache::{self, Cache};
use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{
    BlogComment, BlogPost, CommentThread, CommentWithPost, CreateCommentInput, ListParams,
    PagedResult, UpdateCommentInput, User,
};
use anyhow::Context;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

const MAX_COMMENT_LEN: usize = 5000;
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            cache,
        }
    }

    /// Add a comment to the published post `post_slug`.
    ///
    /// Signed-in users comment under their account name; guests must give
    /// a name and may leave an email.
    pub async fn create(
        &self,
        post_slug: &str,
        author: Option<&User>,
        input: CreateCommentInput,
    ) -> Result<BlogComment, CommentServiceError> {
        let post = self.published_post(post_slug).await?;
        let content = validate_content(&input.content)?;

        let (user_id, author_name, author_email) = match author {
            Some(user) => (Some(user.id), user.name.clone(), Some(user.email.clone())),
            None => {
                let name = input.author_name.as_deref().map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    return Err(CommentServiceError::ValidationError("Name is required".to_string()));
                }
                if name.chars().count() > MAX_NAME_LEN {
                    return Err(CommentServiceError::ValidationError(format!(
                        "Name must be at most {} characters",
                        MAX_NAME_LEN
                    )));
                }
                let email = input
                    .author_email
                    .as_deref()
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty());
                if let Some(ref email) = email {
                    if !email.contains('@') {
                        return Err(CommentServiceError::ValidationError("Invalid email format".to_string()));
                    }
                }
                (None, name.to_string(), email)
            }
        };

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .repo
                .get_by_id(parent_id)
                .await?
                .filter(|p| p.post_id == post.id)
                .ok_or_else(|| {
                    CommentServiceError::ValidationError(format!("Unknown parent comment: {}", parent_id))
                })?;
            if parent.parent_id.is_some() {
                return Err(CommentServiceError::ValidationError(
                    "Replies can only be made to top-level comments".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let comment = BlogComment {
            id: 0,
            post_id: post.id,
            parent_id: input.parent_id,
            user_id,
            author_name,
            author_email,
            content,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&comment).await.context("Failed to create comment")?;
        self.refresh_post(post.id).await?;
        tracing::info!(comment_id = created.id, post_id = post.id, "Comment created");

        Ok(created)
    }

    /// Threads of a published post, oldest first
    pub async fn list_threads(&self, post_slug: &str) -> Result<Vec<CommentThread>, CommentServiceError> {
        let post = self.published_post(post_slug).await?;
        let comments = self.repo.list_by_post(post.id).await?;
        Ok(build_threads(comments))
    }

    /// Moderation list across all posts, newest first
    pub async fn list_all(&self, params: &ListParams) -> Result<PagedResult<CommentWithPost>, CommentServiceError> {
        let (items, total) = self.repo.list_all(params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn update(&self, id: i64, input: UpdateCommentInput) -> Result<BlogComment, CommentServiceError> {
        let mut comment = self.require(id).await?;
        comment.content = validate_content(&input.content)?;

        self.repo
            .update_content(id, &comment.content)
            .await
            .context("Failed to update comment")?;
        cache::invalidate(&self.cache, "posts:*").await;

        self.require(id).await
    }

    /// Delete a comment and its replies
    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        let comment = self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete comment")?;
        self.refresh_post(comment.post_id).await?;
        tracing::info!(comment_id = id, post_id = comment.post_id, "Comment deleted");
        Ok(())
    }

    async fn published_post(&self, slug: &str) -> Result<BlogPost, CommentServiceError> {
        self.post_repo
            .get_by_slug(slug)
            .await?
            .filter(BlogPost::is_published)
            .ok_or_else(|| CommentServiceError::NotFound(format!("Post '{}'", slug)))
    }

    async fn require(&self, id: i64) -> Result<BlogComment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| CommentServiceError::NotFound(format!("Comment {}", id)))
    }

    async fn refresh_post(&self, post_id: i64) -> Result<(), CommentServiceError> {
        self.post_repo.refresh_counters(post_id).await?;
        cache::invalidate(&self.cache, "posts:*").await;
        Ok(())
    }
}

/// Group a post's comments (oldest first) into top-level threads
pub fn build_threads(comments: Vec<BlogComment>) -> Vec<CommentThread> {
    let (roots, replies): (Vec<_>, Vec<_>) = comments.into_iter().partition(|c| c.parent_id.is_none());

    let mut by_parent: HashMap<i64, Vec<BlogComment>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    roots
        .into_iter()
        .map(|comment| CommentThread {
            replies: by_parent.remove(&comment.id).unwrap_or_default(),
            comment,
        })
        .collect()
}

fn validate_content(content: &str) -> Result<String, CommentServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CommentServiceError::ValidationError("Comment cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(CommentServiceError::ValidationError(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(content.to_string())
}
