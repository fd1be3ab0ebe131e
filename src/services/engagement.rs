//! Likes and views
//!
//! A liker is either a signed-in user or an anonymous visitor identified by
//! a fingerprint of their IP and user agent. Liking and unliking are
//! idempotent. Views count once per visitor per 24 hours. After every
//! change the post's counters are recomputed from the source tables.

use crate::cache::{self, Cache};
use crate::db::repositories::{EngagementRepository, PostRepository};
use crate::models::{BlogPost, LikeStatus, Liker, ViewResult};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Window in which repeat views from one visitor are not counted
const VIEW_DEDUP_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct EngagementService {
    repo: Arc<dyn EngagementRepository>,
    post_repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
}

impl EngagementService {
    pub fn new(
        repo: Arc<dyn EngagementRepository>,
        post_repo: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            cache,
        }
    }

    pub async fn status(&self, slug: &str, liker: &Liker) -> Result<LikeStatus, EngagementError> {
        let post = self.published_post(slug).await?;
        Ok(LikeStatus {
            liked: self.repo.has_liked(post.id, liker).await?,
            like_count: post.like_count,
        })
    }

    /// Like a post; liking twice is a no-op
    pub async fn like(&self, slug: &str, liker: &Liker) -> Result<LikeStatus, EngagementError> {
        let post = self.published_post(slug).await?;
        let added = self.repo.add_like(post.id, liker).await?;
        self.finish_like(&post, true, added).await
    }

    /// Remove a like; unliking a post that is not liked is a no-op
    pub async fn unlike(&self, slug: &str, liker: &Liker) -> Result<LikeStatus, EngagementError> {
        let post = self.published_post(slug).await?;
        let removed = self.repo.remove_like(post.id, liker).await?;
        self.finish_like(&post, false, removed).await
    }

    /// Flip the like state
    pub async fn toggle(&self, slug: &str, liker: &Liker) -> Result<LikeStatus, EngagementError> {
        let post = self.published_post(slug).await?;
        if self.repo.has_liked(post.id, liker).await? {
            let removed = self.repo.remove_like(post.id, liker).await?;
            self.finish_like(&post, false, removed).await
        } else {
            let added = self.repo.add_like(post.id, liker).await?;
            self.finish_like(&post, true, added).await
        }
    }

    /// Count a view unless this visitor was already counted in the last day
    pub async fn record_view(&self, slug: &str, visitor: &Liker) -> Result<ViewResult, EngagementError> {
        let post = self.published_post(slug).await?;
        let key = visitor.visitor_key();
        let now = Utc::now();

        if self
            .repo
            .viewed_since(post.id, &key, now - Duration::hours(VIEW_DEDUP_HOURS))
            .await?
        {
            return Ok(ViewResult {
                counted: false,
                view_count: post.view_count,
            });
        }

        self.repo.add_view(post.id, &key, now).await?;
        let counters = self.post_repo.refresh_counters(post.id).await?;
        self.invalidate(&post.slug).await;

        Ok(ViewResult {
            counted: true,
            view_count: counters.view_count,
        })
    }

    async fn finish_like(&self, post: &BlogPost, liked: bool, changed: bool) -> Result<LikeStatus, EngagementError> {
        let like_count = if changed {
            let counters = self.post_repo.refresh_counters(post.id).await?;
            self.invalidate(&post.slug).await;
            tracing::debug!(post_id = post.id, liked, "Like state changed");
            counters.like_count
        } else {
            post.like_count
        };

        Ok(LikeStatus { liked, like_count })
    }

    async fn published_post(&self, slug: &str) -> Result<BlogPost, EngagementError> {
        self.post_repo
            .get_by_slug(slug)
            .await?
            .filter(BlogPost::is_published)
            .ok_or_else(|| EngagementError::NotFound(slug.to_string()))
    }

    async fn invalidate(&self, slug: &str) {
        cache::invalidate(&self.cache, &format!("posts:slug:{}", slug)).await;
        cache::invalidate(&self.cache, "posts:list:*").await;
    }
}

/// Anonymous visitor fingerprint: md5 of `ip:user_agent`.
///
/// Falls back to the user agent alone when the IP is unknown; with neither
/// there is nothing to tell visitors apart and `None` is returned.
pub fn generate_fingerprint(ip: Option<&str>, user_agent: Option<&str>) -> Option<String> {
    let ip = ip.map(str::trim).filter(|s| !s.is_empty());
    let ua = user_agent.map(str::trim).filter(|s| !s.is_empty());

    let data = match (ip, ua) {
        (Some(ip), ua) => format!("{}:{}", ip, ua.unwrap_or_default()),
        (None, Some(ua)) => format!("ua:{}", ua),
        (None, None) => return None,
    };
    Some(format!("{:x}", md5::compute(data)))
}
