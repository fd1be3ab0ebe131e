//! Brand divisions and their activities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A headline figure shown on a division page ("Countries", "12")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandStat {
    pub label: String,
    pub value: String,
}

/// A person listed on a division page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandTeamEntry {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// One of the group's sub-brands, with its own themed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandDivision {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub tagline: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub hero_image: Option<String>,
    /// `#rrggbb`
    pub primary_color: String,
    /// `#rrggbb`
    pub secondary_color: String,
    pub website_url: Option<String>,
    pub stats: Vec<BrandStat>,
    pub services: Vec<String>,
    pub team: Vec<BrandTeamEntry>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Something a division did: an event, launch or milestone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandActivity {
    pub id: i64,
    pub division_id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Activity together with the division it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct DivisionActivity {
    #[serde(flatten)]
    pub activity: BrandActivity,
    pub division_name: String,
    pub division_slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDivisionInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub tagline: String,
    pub description: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub hero_image: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub stats: Vec<BrandStat>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub team: Vec<BrandTeamEntry>,
    #[serde(default)]
    pub sort_order: i64,
}

/// Omitted fields are left unchanged; an empty string clears optional URLs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDivisionInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub hero_image: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub stats: Option<Vec<BrandStat>>,
    #[serde(default)]
    pub services: Option<Vec<String>>,
    #[serde(default)]
    pub team: Option<Vec<BrandTeamEntry>>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivityInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Defaults to now
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateActivityInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}
