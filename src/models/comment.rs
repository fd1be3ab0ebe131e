//! Blog comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment on a blog post. Replies point at a top-level comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogComment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    /// Set when the author was signed in
    pub user_id: Option<i64>,
    pub author_name: String,
    #[serde(skip_serializing)]
    pub author_email: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A top-level comment with its replies, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: BlogComment,
    pub replies: Vec<BlogComment>,
}

/// Comment joined with the post it belongs to, for moderation lists
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithPost {
    #[serde(flatten)]
    pub comment: BlogComment,
    pub post_title: String,
    pub post_slug: String,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub content: String,
    /// Required for guests, ignored for signed-in users
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Input for editing a comment
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentInput {
    pub content: String,
}
