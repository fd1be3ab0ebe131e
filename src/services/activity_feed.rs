//! Dashboard activity feed and stats
//!
//! The feed merges the newest posts, comments, brand activities, team
//! additions and sign-ups into one timeline, optionally filtered to one
//! kind, and groups it into day buckets for display.

use crate::db::repositories::{
    BrandRepository, ClientRepository, CommentRepository, PostRepository, PostStats,
    TeamRepository, UserRepository,
};
use crate::models::ListParams;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default and maximum number of feed items
pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Post,
    Comment,
    Activity,
    Team,
    User,
}

impl FeedKind {
    pub const ALL: [FeedKind; 5] = [
        FeedKind::Post,
        FeedKind::Comment,
        FeedKind::Activity,
        FeedKind::Team,
        FeedKind::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Post => "post",
            FeedKind::Comment => "comment",
            FeedKind::Activity => "activity",
            FeedKind::Team => "team",
            FeedKind::User => "user",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Invalid feed kind: {}", s))
    }
}

/// One entry of the dashboard timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub kind: FeedKind,
    pub title: String,
    pub summary: String,
    /// Public page the item points at, if any
    pub link: Option<String>,
    pub actor: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Day bucket for grouped display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedBucket {
    Today,
    Yesterday,
    #[serde(rename = "This week")]
    ThisWeek,
    Earlier,
}

impl FeedBucket {
    pub fn label(&self) -> &'static str {
        match self {
            FeedBucket::Today => "Today",
            FeedBucket::Yesterday => "Yesterday",
            FeedBucket::ThisWeek => "This week",
            FeedBucket::Earlier => "Earlier",
        }
    }

    /// Bucket of `at` relative to `now`, by calendar day (UTC)
    pub fn of(at: DateTime<Utc>, now: DateTime<Utc>) -> FeedBucket {
        let days = (now.date_naive() - at.date_naive()).num_days();
        match days {
            d if d <= 0 => FeedBucket::Today,
            1 => FeedBucket::Yesterday,
            d if d < 7 => FeedBucket::ThisWeek,
            _ => FeedBucket::Earlier,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedGroup {
    pub label: &'static str,
    pub items: Vec<FeedItem>,
}

/// Split newest-first items into day groups, skipping empty groups
pub fn group_by_day(items: Vec<FeedItem>, now: DateTime<Utc>) -> Vec<FeedGroup> {
    let mut groups: Vec<(FeedBucket, Vec<FeedItem>)> = Vec::new();
    for item in items {
        let bucket = FeedBucket::of(item.occurred_at, now);
        match groups.iter_mut().find(|(b, _)| *b == bucket) {
            Some((_, list)) => list.push(item),
            None => groups.push((bucket, vec![item])),
        }
    }

    let order = [
        FeedBucket::Today,
        FeedBucket::Yesterday,
        FeedBucket::ThisWeek,
        FeedBucket::Earlier,
    ];
    groups.sort_by_key(|(b, _)| order.iter().position(|o| o == b));
    groups
        .into_iter()
        .map(|(bucket, items)| FeedGroup {
            label: bucket.label(),
            items,
        })
        .collect()
}

/// Headline numbers for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub posts: PostStats,
    pub users: i64,
    pub divisions: i64,
    pub team_members: i64,
    pub clients: i64,
}

pub struct ActivityFeedService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    brands: Arc<dyn BrandRepository>,
    team: Arc<dyn TeamRepository>,
    users: Arc<dyn UserRepository>,
    clients: Arc<dyn ClientRepository>,
}

impl ActivityFeedService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        brands: Arc<dyn BrandRepository>,
        team: Arc<dyn TeamRepository>,
        users: Arc<dyn UserRepository>,
        clients: Arc<dyn ClientRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            brands,
            team,
            users,
            clients,
        }
    }

    /// Newest `limit` items, optionally of one kind only
    pub async fn feed(&self, kind: Option<FeedKind>, limit: usize) -> Result<Vec<FeedItem>> {
        let limit = limit.clamp(1, MAX_FEED_LIMIT);
        let wanted = |k: FeedKind| kind.map_or(true, |only| only == k);
        let fetch = limit as i64;
        let mut items = Vec::new();

        if wanted(FeedKind::Post) {
            items.extend(self.posts.recent(fetch).await?.into_iter().map(|p| FeedItem {
                kind: FeedKind::Post,
                summary: format!("{} post", p.status),
                link: p.is_published().then(|| format!("/blog/{}", p.slug)),
                title: p.title,
                actor: p.author_name,
                occurred_at: p.created_at,
            }));
        }

        if wanted(FeedKind::Comment) {
            let (comments, _) = self.comments.list_all(&ListParams::new(1, limit as u32)).await?;
            items.extend(comments.into_iter().map(|c| FeedItem {
                kind: FeedKind::Comment,
                title: format!("Comment on {}", c.post_title),
                summary: truncate(&c.comment.content, 120),
                link: Some(format!("/blog/{}#comment-{}", c.post_slug, c.comment.id)),
                actor: Some(c.comment.author_name),
                occurred_at: c.comment.created_at,
            }));
        }

        if wanted(FeedKind::Activity) {
            items.extend(self.brands.recent_activities(fetch).await?.into_iter().map(|a| FeedItem {
                kind: FeedKind::Activity,
                title: a.activity.title,
                summary: truncate(&a.activity.description, 120),
                link: Some(format!("/brands/{}", a.division_slug)),
                actor: Some(a.division_name),
                occurred_at: a.activity.occurred_at,
            }));
        }

        if wanted(FeedKind::Team) {
            items.extend(self.team.recent_members(fetch).await?.into_iter().map(|m| FeedItem {
                kind: FeedKind::Team,
                title: format!("{} joined the team", m.name),
                summary: m.title,
                link: Some("/about".to_string()),
                actor: None,
                occurred_at: m.created_at,
            }));
        }

        if wanted(FeedKind::User) {
            items.extend(self.users.recent(fetch).await?.into_iter().map(|u| FeedItem {
                kind: FeedKind::User,
                title: format!("{} signed up", u.name),
                summary: format!("Role: {}", u.role),
                link: None,
                actor: None,
                occurred_at: u.created_at,
            }));
        }

        Ok(merge_newest(items, limit))
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats {
            posts: self.posts.stats().await?,
            users: self.users.count().await?,
            divisions: self.brands.count().await?,
            team_members: self.team.count().await?,
            clients: self.clients.count().await?,
        })
    }
}

/// Newest first, at most `limit`
fn merge_newest(mut items: Vec<FeedItem>, limit: usize) -> Vec<FeedItem> {
    items.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    items.truncate(limit);
    items
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxBrandRepository, SqlxClientRepository, SqlxCommentRepository, SqlxPostRepository,
        SqlxTeamRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{BrandActivity, BrandDivision, Client, TeamMember, TeamRole, User, UserRole};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn item(kind: FeedKind, at: DateTime<Utc>) -> FeedItem {
        FeedItem {
            kind,
            title: "t".into(),
            summary: String::new(),
            link: None,
            actor: None,
            occurred_at: at,
        }
    }

    #[test]
    fn test_feed_kind_parse() {
        assert_eq!("post".parse::<FeedKind>().unwrap(), FeedKind::Post);
        assert_eq!("TEAM".parse::<FeedKind>().unwrap(), FeedKind::Team);
        assert!("likes".parse::<FeedKind>().is_err());
    }

    #[test]
    fn test_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        let at = |d, h| Utc.with_ymd_and_hms(2024, 6, d, h, 0, 0).unwrap();

        assert_eq!(FeedBucket::of(at(15, 0), now), FeedBucket::Today);
        assert_eq!(FeedBucket::of(at(15, 23), now), FeedBucket::Today);
        assert_eq!(FeedBucket::of(at(14, 23), now), FeedBucket::Yesterday);
        assert_eq!(FeedBucket::of(at(9, 12), now), FeedBucket::ThisWeek);
        assert_eq!(FeedBucket::of(at(8, 12), now), FeedBucket::Earlier);
    }

    #[test]
    fn test_group_by_day_skips_empty_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        let items = vec![
            item(FeedKind::Post, now),
            item(FeedKind::User, now - Duration::days(1)),
            item(FeedKind::Comment, now - Duration::days(30)),
        ];

        let groups = group_by_day(items, now);
        let labels: Vec<_> = groups.iter().map(|g| g.label).collect();
        assert_eq!(labels, vec!["Today", "Yesterday", "Earlier"]);
    }

    #[tokio::test]
    async fn test_feed_merges_and_filters() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let users = SqlxUserRepository::boxed(pool.clone());
        let team = SqlxTeamRepository::boxed(pool.clone());

        users
            .create(&User::new("Ada".into(), "ada@example.com".into(), "h".into(), UserRole::Reader))
            .await
            .unwrap();
        let now = Utc::now();
        team.create_member(&TeamMember {
            id: 0,
            name: "Bo".into(),
            title: "Designer".into(),
            department_id: None,
            role: TeamRole::Member,
            bio: None,
            photo_url: None,
            achievements: vec![],
            sort_order: 0,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

        let service = ActivityFeedService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxBrandRepository::boxed(pool.clone()),
            team,
            users,
            SqlxClientRepository::boxed(pool),
        );

        let all = service.feed(None, 10).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_team = service.feed(Some(FeedKind::Team), 10).await.unwrap();
        assert_eq!(only_team.len(), 1);
        assert_eq!(only_team[0].title, "Bo joined the team");

        let capped = service.feed(None, 1).await.unwrap();
        assert_eq!(capped.len(), 1);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.team_members, 1);
        assert_eq!(stats.posts.total, 0);
    }

    #[tokio::test]
    async fn test_activity_items_use_occurrence_date() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let brands = SqlxBrandRepository::boxed(pool.clone());
        let clients = SqlxClientRepository::boxed(pool.clone());

        let now = Utc::now();
        let division = brands
            .create_division(&BrandDivision {
                id: 0,
                name: "Kiny Media".into(),
                slug: "kiny-media".into(),
                tagline: String::new(),
                description: String::new(),
                logo_url: None,
                hero_image: None,
                primary_color: "#1e40af".into(),
                secondary_color: "#f59e0b".into(),
                website_url: None,
                stats: vec![],
                services: vec![],
                team: vec![],
                sort_order: 0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        // Entered today, happened months ago
        let occurred = now - Duration::days(90);
        brands
            .create_activity(&BrandActivity {
                id: 0,
                division_id: division.id,
                title: "Studio opened".into(),
                description: String::new(),
                image_url: None,
                occurred_at: occurred,
                created_at: now,
            })
            .await
            .unwrap();
        clients
            .create(&Client {
                id: 0,
                name: "Acme".into(),
                logo_url: None,
                website_url: None,
                description: None,
                sort_order: 0,
                created_at: now,
            })
            .await
            .unwrap();

        let service = ActivityFeedService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            brands,
            SqlxTeamRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool),
            clients,
        );

        let items = service.feed(Some(FeedKind::Activity), 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].occurred_at.timestamp(), occurred.timestamp());

        let groups = group_by_day(items, now);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "Earlier");

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.divisions, 1);
        assert_eq!(stats.clients, 1);
        assert_eq!(stats.team_members, 0);
    }

    proptest! {
        #[test]
        fn prop_merge_is_sorted_and_capped(offsets in proptest::collection::vec(0i64..100_000, 0..40), limit in 1usize..30) {
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let items: Vec<_> = offsets.iter().map(|o| item(FeedKind::Post, base + Duration::minutes(*o))).collect();
            let merged = merge_newest(items, limit);
            prop_assert!(merged.len() <= limit);
            prop_assert!(merged.windows(2).all(|w| w[0].occurred_at >= w[1].occurred_at));
        }

        #[test]
        fn prop_grouping_keeps_every_item(offsets in proptest::collection::vec(0i64..60, 0..30)) {
            let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
            let items: Vec<_> = offsets.iter().map(|d| item(FeedKind::User, now - Duration::hours(*d * 6))).collect();
            let total = items.len();
            let groups = group_by_day(items, now);
            prop_assert_eq!(groups.iter().map(|g| g.items.len()).sum::<usize>(), total);
            prop_assert!(groups.iter().all(|g| !g.items.is_empty()));
        }
    }
}
