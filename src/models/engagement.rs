//! Likes and views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is liking a post: a signed-in user or an anonymous visitor
/// identified by a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liker {
    User(i64),
    Visitor(String),
}

impl Liker {
    /// Stable key used to de-duplicate views
    pub fn visitor_key(&self) -> String {
        match self {
            Liker::User(id) => format!("user:{}", id),
            Liker::Visitor(fingerprint) => format!("anon:{}", fingerprint),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogLike {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Option<i64>,
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogView {
    pub id: i64,
    pub post_id: i64,
    pub visitor: String,
    pub viewed_at: DateTime<Utc>,
}

/// Like state of a post as seen by one liker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

/// Outcome of recording a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewResult {
    /// False when the visitor was already counted in the last 24 hours
    pub counted: bool,
    pub view_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_key_distinguishes_users_and_visitors() {
        assert_eq!(Liker::User(5).visitor_key(), "user:5");
        assert_eq!(Liker::Visitor("5".into()).visitor_key(), "anon:5");
        assert_ne!(
            Liker::User(5).visitor_key(),
            Liker::Visitor("5".into()).visitor_key()
        );
    }
}
