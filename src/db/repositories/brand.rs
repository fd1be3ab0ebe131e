//! Brand division repository
//!
//! Divisions keep their stats, services and team lists as JSON documents in
//! TEXT columns. Activities are child rows removed with their division.

use crate::db::{on_pool, DynDatabasePool, InsertedId};
use crate::models::{BrandActivity, BrandDivision, DivisionActivity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait BrandRepository: Send + Sync {
    async fn create_division(&self, division: &BrandDivision) -> Result<BrandDivision>;

    async fn get_division(&self, id: i64) -> Result<Option<BrandDivision>>;

    async fn get_division_by_slug(&self, slug: &str) -> Result<Option<BrandDivision>>;

    /// All divisions by `sort_order`, then name
    async fn list_divisions(&self) -> Result<Vec<BrandDivision>>;

    /// Number of divisions
    async fn count(&self) -> Result<i64>;

    async fn update_division(&self, division: &BrandDivision) -> Result<BrandDivision>;

    async fn delete_division(&self, id: i64) -> Result<()>;

    /// Whether `slug` is taken by a division other than `exclude_id`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    async fn create_activity(&self, activity: &BrandActivity) -> Result<BrandActivity>;

    async fn get_activity(&self, id: i64) -> Result<Option<BrandActivity>>;

    /// Activities of one division, most recent first
    async fn list_activities(&self, division_id: i64) -> Result<Vec<BrandActivity>>;

    async fn update_activity(&self, activity: &BrandActivity) -> Result<BrandActivity>;

    async fn delete_activity(&self, id: i64) -> Result<()>;

    /// Latest activities across all divisions, by when they happened
    async fn recent_activities(&self, limit: i64) -> Result<Vec<DivisionActivity>>;
}

#[derive(sqlx::FromRow)]
struct DivisionRow {
    id: i64,
    name: String,
    slug: String,
    tagline: String,
    description: String,
    logo_url: Option<String>,
    hero_image: Option<String>,
    primary_color: String,
    secondary_color: String,
    website_url: Option<String>,
    stats: String,
    services: String,
    team: String,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DivisionRow> for BrandDivision {
    type Error = anyhow::Error;

    fn try_from(row: DivisionRow) -> Result<Self> {
        Ok(BrandDivision {
            stats: serde_json::from_str(&row.stats)
                .with_context(|| format!("Invalid stats JSON for division {}", row.id))?,
            services: serde_json::from_str(&row.services)
                .with_context(|| format!("Invalid services JSON for division {}", row.id))?,
            team: serde_json::from_str(&row.team)
                .with_context(|| format!("Invalid team JSON for division {}", row.id))?,
            id: row.id,
            name: row.name,
            slug: row.slug,
            tagline: row.tagline,
            description: row.description,
            logo_url: row.logo_url,
            hero_image: row.hero_image,
            primary_color: row.primary_color,
            secondary_color: row.secondary_color,
            website_url: row.website_url,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: i64,
    division_id: i64,
    title: String,
    description: String,
    image_url: Option<String>,
    occurred_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ActivityRow> for BrandActivity {
    fn from(row: ActivityRow) -> Self {
        BrandActivity {
            id: row.id,
            division_id: row.division_id,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            occurred_at: row.occurred_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DivisionActivityRow {
    #[sqlx(flatten)]
    activity: ActivityRow,
    division_name: String,
    division_slug: String,
}

const DIVISION_COLUMNS: &str = "id, name, slug, tagline, description, logo_url, hero_image, \
    primary_color, secondary_color, website_url, stats, services, team, sort_order, created_at, updated_at";

const ACTIVITY_COLUMNS: &str =
    "a.id, a.division_id, a.title, a.description, a.image_url, a.occurred_at, a.created_at";

/// Serialised JSON columns of a division
struct DivisionJson {
    stats: String,
    services: String,
    team: String,
}

impl DivisionJson {
    fn encode(division: &BrandDivision) -> Result<Self> {
        Ok(Self {
            stats: serde_json::to_string(&division.stats)?,
            services: serde_json::to_string(&division.services)?,
            team: serde_json::to_string(&division.team)?,
        })
    }
}

pub struct SqlxBrandRepository {
    pool: DynDatabasePool,
}

impl SqlxBrandRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BrandRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BrandRepository for SqlxBrandRepository {
    async fn create_division(&self, division: &BrandDivision) -> Result<BrandDivision> {
        let json = DivisionJson::encode(division)?;
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO brand_divisions (name, slug, tagline, description, logo_url, hero_image,
                    primary_color, secondary_color, website_url, stats, services, team, sort_order,
                    created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&division.name)
            .bind(&division.slug)
            .bind(&division.tagline)
            .bind(&division.description)
            .bind(&division.logo_url)
            .bind(&division.hero_image)
            .bind(&division.primary_color)
            .bind(&division.secondary_color)
            .bind(&division.website_url)
            .bind(&json.stats)
            .bind(&json.services)
            .bind(&json.team)
            .bind(division.sort_order)
            .bind(division.created_at)
            .bind(division.updated_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create brand division")?;

        Ok(BrandDivision { id, ..division.clone() })
    }

    async fn get_division(&self, id: i64) -> Result<Option<BrandDivision>> {
        let sql = format!("SELECT {} FROM brand_divisions WHERE id = ?", DIVISION_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, DivisionRow>(&sql).bind(id).fetch_optional(conn).await
        })
        .context("Failed to get brand division")?;

        row.map(BrandDivision::try_from).transpose()
    }

    async fn get_division_by_slug(&self, slug: &str) -> Result<Option<BrandDivision>> {
        let sql = format!("SELECT {} FROM brand_divisions WHERE slug = ?", DIVISION_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, DivisionRow>(&sql).bind(slug).fetch_optional(conn).await
        })
        .context("Failed to get brand division by slug")?;

        row.map(BrandDivision::try_from).transpose()
    }

    async fn list_divisions(&self) -> Result<Vec<BrandDivision>> {
        let sql = format!(
            "SELECT {} FROM brand_divisions ORDER BY sort_order, name",
            DIVISION_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, DivisionRow>(&sql).fetch_all(conn).await
        })
        .context("Failed to list brand divisions")?;

        rows.into_iter().map(BrandDivision::try_from).collect()
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM brand_divisions").fetch_one(conn).await
        })
        .context("Failed to count brand divisions")?;

        Ok(count)
    }

    async fn update_division(&self, division: &BrandDivision) -> Result<BrandDivision> {
        let json = DivisionJson::encode(division)?;
        let now = Utc::now();
        on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE brand_divisions
                SET name = ?, slug = ?, tagline = ?, description = ?, logo_url = ?, hero_image = ?,
                    primary_color = ?, secondary_color = ?, website_url = ?, stats = ?, services = ?,
                    team = ?, sort_order = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&division.name)
            .bind(&division.slug)
            .bind(&division.tagline)
            .bind(&division.description)
            .bind(&division.logo_url)
            .bind(&division.hero_image)
            .bind(&division.primary_color)
            .bind(&division.secondary_color)
            .bind(&division.website_url)
            .bind(&json.stats)
            .bind(&json.services)
            .bind(&json.team)
            .bind(division.sort_order)
            .bind(now)
            .bind(division.id)
            .execute(conn)
            .await
            .map(|_| ())
        })
        .context("Failed to update brand division")?;

        Ok(BrandDivision {
            updated_at: now,
            ..division.clone()
        })
    }

    async fn delete_division(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM brand_divisions WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete brand division")?;

        Ok(())
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM brand_divisions WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(conn)
                .await
        })
        .context("Failed to check division slug")?;

        Ok(count > 0)
    }

    async fn create_activity(&self, activity: &BrandActivity) -> Result<BrandActivity> {
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO brand_activities (division_id, title, description, image_url, occurred_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(activity.division_id)
            .bind(&activity.title)
            .bind(&activity.description)
            .bind(&activity.image_url)
            .bind(activity.occurred_at)
            .bind(activity.created_at)
            .execute(conn)
            .await
            .map(|r| r.inserted_id())
        })
        .context("Failed to create brand activity")?;

        Ok(BrandActivity { id, ..activity.clone() })
    }

    async fn get_activity(&self, id: i64) -> Result<Option<BrandActivity>> {
        let sql = format!("SELECT {} FROM brand_activities a WHERE a.id = ?", ACTIVITY_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, ActivityRow>(&sql).bind(id).fetch_optional(conn).await
        })
        .context("Failed to get brand activity")?;

        Ok(row.map(BrandActivity::from))
    }

    async fn list_activities(&self, division_id: i64) -> Result<Vec<BrandActivity>> {
        let sql = format!(
            "SELECT {} FROM brand_activities a WHERE a.division_id = ? ORDER BY a.occurred_at DESC, a.id DESC",
            ACTIVITY_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, ActivityRow>(&sql).bind(division_id).fetch_all(conn).await
        })
        .context("Failed to list brand activities")?;

        Ok(rows.into_iter().map(BrandActivity::from).collect())
    }

    async fn update_activity(&self, activity: &BrandActivity) -> Result<BrandActivity> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE brand_activities SET title = ?, description = ?, image_url = ?, occurred_at = ? WHERE id = ?",
            )
            .bind(&activity.title)
            .bind(&activity.description)
            .bind(&activity.image_url)
            .bind(activity.occurred_at)
            .bind(activity.id)
            .execute(conn)
            .await
            .map(|_| ())
        })
        .context("Failed to update brand activity")?;

        Ok(activity.clone())
    }

    async fn delete_activity(&self, id: i64) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM brand_activities WHERE id = ?").bind(id).execute(conn).await.map(|_| ())
        })
        .context("Failed to delete brand activity")?;

        Ok(())
    }

    async fn recent_activities(&self, limit: i64) -> Result<Vec<DivisionActivity>> {
        let sql = format!(
            r#"
            SELECT {}, d.name AS division_name, d.slug AS division_slug
            FROM brand_activities a
            JOIN brand_divisions d ON d.id = a.division_id
            ORDER BY a.occurred_at DESC, a.id DESC
            LIMIT ?
            "#,
            ACTIVITY_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, DivisionActivityRow>(&sql).bind(limit).fetch_all(conn).await
        })
        .context("Failed to get recent brand activities")?;

        Ok(rows
            .into_iter()
            .map(|row| DivisionActivity {
                activity: row.activity.into(),
                division_name: row.division_name,
                division_slug: row.division_slug,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{BrandStat, BrandTeamEntry};

    async fn setup() -> SqlxBrandRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxBrandRepository::new(pool)
    }

    fn division(name: &str, slug: &str, sort_order: i64) -> BrandDivision {
        let now = Utc::now();
        BrandDivision {
            id: 0,
            name: name.into(),
            slug: slug.into(),
            tagline: "Tagline".into(),
            description: "Description".into(),
            logo_url: None,
            hero_image: None,
            primary_color: "#1e40af".into(),
            secondary_color: "#f59e0b".into(),
            website_url: None,
            stats: vec![BrandStat { label: "Countries".into(), value: "12".into() }],
            services: vec!["Safaris".into()],
            team: vec![BrandTeamEntry { name: "Jo".into(), role: "Lead".into(), photo_url: None }],
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn activity(division_id: i64, title: &str) -> BrandActivity {
        let now = Utc::now();
        BrandActivity {
            id: 0,
            division_id,
            title: title.into(),
            description: String::new(),
            image_url: None,
            occurred_at: now,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_division_roundtrips_json_columns() {
        let repo = setup().await;
        let created = repo.create_division(&division("Kiny Tours", "kiny-tours", 0)).await.unwrap();

        let fetched = repo.get_division_by_slug("kiny-tours").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.stats[0].value, "12");
        assert_eq!(fetched.services, vec!["Safaris".to_string()]);
        assert_eq!(fetched.team[0].name, "Jo");
    }

    #[tokio::test]
    async fn test_list_divisions_sorted() {
        let repo = setup().await;
        repo.create_division(&division("Zeta", "zeta", 0)).await.unwrap();
        repo.create_division(&division("Alpha", "alpha", 5)).await.unwrap();
        repo.create_division(&division("Beta", "beta", 0)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 3);

        let names: Vec<String> = repo
            .list_divisions()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Beta", "Zeta", "Alpha"]);
    }

    #[tokio::test]
    async fn test_update_division_and_slug_check() {
        let repo = setup().await;
        let mut d = repo.create_division(&division("Media", "media", 0)).await.unwrap();
        d.services.push("Podcasts".into());
        repo.update_division(&d).await.unwrap();

        let fetched = repo.get_division(d.id).await.unwrap().unwrap();
        assert_eq!(fetched.services.len(), 2);
        assert!(repo.slug_exists("media", None).await.unwrap());
        assert!(!repo.slug_exists("media", Some(d.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_activities_cascade_with_division() {
        let repo = setup().await;
        let d = repo.create_division(&division("Media", "media", 0)).await.unwrap();
        let a = repo.create_activity(&activity(d.id, "Launch")).await.unwrap();

        let recent = repo.recent_activities(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].division_slug, "media");

        repo.delete_division(d.id).await.unwrap();
        assert!(repo.get_activity(a.id).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recent_activities_by_occurrence() {
        let repo = setup().await;
        let d = repo.create_division(&division("Media", "media", 0)).await.unwrap();

        repo.create_activity(&activity(d.id, "Launch")).await.unwrap();
        // Recorded last, happened first
        let mut founded = activity(d.id, "Founded");
        founded.occurred_at = Utc::now() - chrono::Duration::days(400);
        founded.created_at = Utc::now() + chrono::Duration::seconds(1);
        repo.create_activity(&founded).await.unwrap();

        let titles: Vec<String> = repo
            .recent_activities(10)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.activity.title)
            .collect();
        assert_eq!(titles, vec!["Launch", "Founded"]);
    }
}
