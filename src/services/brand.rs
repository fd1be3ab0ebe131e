//! Brand divisions, their activities and theme palettes
//!
//! Each division carries two theme colours. Division pages derive the rest
//! of their palette (light and dark variants, a readable text colour for
//! the primary background, a hero gradient) from those two.

use crate::cache::{self, Cache};
use crate::db::repositories::BrandRepository;
use crate::models::{
    BrandActivity, BrandDivision, CreateActivityInput, CreateDivisionInput, DivisionActivity,
    UpdateActivityInput, UpdateDivisionInput,
};
use crate::services::slug::{generate_slug, is_valid_slug};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

const CACHE_KEY_BRAND_LIST: &str = "brands:list";
const CACHE_KEY_BRAND_BY_SLUG: &str = "brands:slug:";
const CACHE_PATTERN_BRANDS: &str = "brands:*";

#[derive(Debug, thiserror::Error)]
pub enum BrandServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Division slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// An sRGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    /// Dark text used on light backgrounds
    pub const INK: Rgb = Rgb { r: 17, g: 24, b: 39 };

    /// Parse `#rrggbb` (case-insensitive)
    pub fn parse_hex(s: &str) -> Option<Rgb> {
        let hex = s.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear blend towards `other`; `t` is clamped to `0.0..=1.0`
    pub fn mix(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let blend = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb {
            r: blend(self.r, other.r),
            g: blend(self.g, other.g),
            b: blend(self.b, other.b),
        }
    }

    pub fn lighten(self, amount: f64) -> Rgb {
        self.mix(Rgb::WHITE, amount)
    }

    pub fn darken(self, amount: f64) -> Rgb {
        self.mix(Rgb::BLACK, amount)
    }

    /// WCAG relative luminance
    pub fn luminance(self) -> f64 {
        let lin = |c: u8| {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * lin(self.r) + 0.7152 * lin(self.g) + 0.0722 * lin(self.b)
    }

    /// WCAG contrast ratio, from 1.0 to 21.0
    pub fn contrast(self, other: Rgb) -> f64 {
        let (a, b) = (self.luminance(), other.luminance());
        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        (hi + 0.05) / (lo + 0.05)
    }

    /// White or ink, whichever reads better on this background
    pub fn readable_text(self) -> Rgb {
        if self.contrast(Rgb::WHITE) >= self.contrast(Rgb::INK) {
            Rgb::WHITE
        } else {
            Rgb::INK
        }
    }
}

/// Theme colours for a division page, as CSS hex strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandPalette {
    pub primary: String,
    pub primary_light: String,
    pub primary_dark: String,
    pub secondary: String,
    pub secondary_light: String,
    /// Text colour for content placed on `primary`
    pub on_primary: String,
    /// Text colour for content placed on `secondary`
    pub on_secondary: String,
    pub gradient: String,
}

impl BrandPalette {
    /// Derive a palette from two `#rrggbb` colours. Unparseable input
    /// falls back to neutral grey so a bad row never breaks a page.
    pub fn derive(primary: &str, secondary: &str) -> Self {
        let fallback = Rgb { r: 107, g: 114, b: 128 };
        let p = Rgb::parse_hex(primary).unwrap_or(fallback);
        let s = Rgb::parse_hex(secondary).unwrap_or(fallback);

        Self {
            primary: p.to_hex(),
            primary_light: p.lighten(0.85).to_hex(),
            primary_dark: p.darken(0.25).to_hex(),
            secondary: s.to_hex(),
            secondary_light: s.lighten(0.85).to_hex(),
            on_primary: p.readable_text().to_hex(),
            on_secondary: s.readable_text().to_hex(),
            gradient: format!("linear-gradient(135deg, {} 0%, {} 100%)", p.to_hex(), s.to_hex()),
        }
    }

    pub fn for_division(division: &BrandDivision) -> Self {
        Self::derive(&division.primary_color, &division.secondary_color)
    }
}

pub struct BrandService {
    repo: Arc<dyn BrandRepository>,
    cache: Arc<Cache>,
}

impl BrandService {
    pub fn new(repo: Arc<dyn BrandRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// All divisions in display order
    pub async fn list_divisions(&self) -> Result<Vec<BrandDivision>, BrandServiceError> {
        Ok(cache::cached(&self.cache, CACHE_KEY_BRAND_LIST, || self.repo.list_divisions()).await?)
    }

    pub async fn get_division(&self, id: i64) -> Result<BrandDivision, BrandServiceError> {
        self.repo
            .get_division(id)
            .await?
            .ok_or_else(|| BrandServiceError::NotFound(format!("Division {}", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<BrandDivision>, BrandServiceError> {
        let key = format!("{}{}", CACHE_KEY_BRAND_BY_SLUG, slug);
        Ok(cache::cached(&self.cache, &key, || self.repo.get_division_by_slug(slug)).await?)
    }

    pub async fn create_division(&self, input: CreateDivisionInput) -> Result<BrandDivision, BrandServiceError> {
        let name = require_text("Name", &input.name)?;
        let description = require_text("Description", &input.description)?;
        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => normalize_slug(slug)?,
            None => normalize_slug(&name)?,
        };
        if self.repo.slug_exists(&slug, None).await? {
            return Err(BrandServiceError::DuplicateSlug(slug));
        }

        let now = Utc::now();
        let division = BrandDivision {
            id: 0,
            name,
            slug,
            tagline: input.tagline.trim().to_string(),
            description,
            logo_url: non_empty(input.logo_url),
            hero_image: non_empty(input.hero_image),
            primary_color: validate_color("primary_color", &input.primary_color)?,
            secondary_color: validate_color("secondary_color", &input.secondary_color)?,
            website_url: non_empty(input.website_url),
            stats: input.stats,
            services: input.services,
            team: input.team,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create_division(&division)
            .await
            .context("Failed to create division")?;
        self.invalidate().await;
        tracing::info!(division_id = created.id, slug = %created.slug, "Division created");
        Ok(created)
    }

    pub async fn update_division(
        &self,
        id: i64,
        input: UpdateDivisionInput,
    ) -> Result<BrandDivision, BrandServiceError> {
        let mut division = self.get_division(id).await?;

        if let Some(name) = input.name {
            division.name = require_text("Name", &name)?;
        }
        if let Some(slug) = input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let slug = normalize_slug(slug)?;
            if slug != division.slug && self.repo.slug_exists(&slug, Some(id)).await? {
                return Err(BrandServiceError::DuplicateSlug(slug));
            }
            division.slug = slug;
        }
        if let Some(tagline) = input.tagline {
            division.tagline = tagline.trim().to_string();
        }
        if let Some(description) = input.description {
            division.description = require_text("Description", &description)?;
        }
        if let Some(logo) = input.logo_url {
            division.logo_url = non_empty(Some(logo));
        }
        if let Some(hero) = input.hero_image {
            division.hero_image = non_empty(Some(hero));
        }
        if let Some(color) = input.primary_color {
            division.primary_color = validate_color("primary_color", &color)?;
        }
        if let Some(color) = input.secondary_color {
            division.secondary_color = validate_color("secondary_color", &color)?;
        }
        if let Some(url) = input.website_url {
            division.website_url = non_empty(Some(url));
        }
        if let Some(stats) = input.stats {
            division.stats = stats;
        }
        if let Some(services) = input.services {
            division.services = services;
        }
        if let Some(team) = input.team {
            division.team = team;
        }
        if let Some(order) = input.sort_order {
            division.sort_order = order;
        }

        let updated = self
            .repo
            .update_division(&division)
            .await
            .context("Failed to update division")?;
        self.invalidate().await;
        Ok(updated)
    }

    /// Delete a division and its activities
    pub async fn delete_division(&self, id: i64) -> Result<(), BrandServiceError> {
        self.get_division(id).await?;
        self.repo.delete_division(id).await?;
        self.invalidate().await;
        tracing::info!(division_id = id, "Division deleted");
        Ok(())
    }

    /// Activities of a division, most recent first
    pub async fn list_activities(&self, division_id: i64) -> Result<Vec<BrandActivity>, BrandServiceError> {
        Ok(self.repo.list_activities(division_id).await?)
    }

    pub async fn recent_activities(&self, limit: i64) -> Result<Vec<DivisionActivity>, BrandServiceError> {
        Ok(self.repo.recent_activities(limit).await?)
    }

    pub async fn create_activity(
        &self,
        division_id: i64,
        input: CreateActivityInput,
    ) -> Result<BrandActivity, BrandServiceError> {
        self.get_division(division_id).await?;
        let now = Utc::now();
        let activity = BrandActivity {
            id: 0,
            division_id,
            title: require_text("Title", &input.title)?,
            description: input.description.trim().to_string(),
            image_url: non_empty(input.image_url),
            occurred_at: input.occurred_at.unwrap_or(now),
            created_at: now,
        };

        let created = self
            .repo
            .create_activity(&activity)
            .await
            .context("Failed to create activity")?;
        self.invalidate().await;
        Ok(created)
    }

    pub async fn update_activity(
        &self,
        id: i64,
        input: UpdateActivityInput,
    ) -> Result<BrandActivity, BrandServiceError> {
        let mut activity = self
            .repo
            .get_activity(id)
            .await?
            .ok_or_else(|| BrandServiceError::NotFound(format!("Activity {}", id)))?;

        if let Some(title) = input.title {
            activity.title = require_text("Title", &title)?;
        }
        if let Some(description) = input.description {
            activity.description = description.trim().to_string();
        }
        if let Some(image) = input.image_url {
            activity.image_url = non_empty(Some(image));
        }
        if let Some(at) = input.occurred_at {
            activity.occurred_at = at;
        }

        let updated = self.repo.update_activity(&activity).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete_activity(&self, id: i64) -> Result<(), BrandServiceError> {
        if self.repo.get_activity(id).await?.is_none() {
            return Err(BrandServiceError::NotFound(format!("Activity {}", id)));
        }
        self.repo.delete_activity(id).await?;
        self.invalidate().await;
        Ok(())
    }

    async fn invalidate(&self) {
        cache::invalidate(&self.cache, CACHE_PATTERN_BRANDS).await;
    }
}

/// Lowercased `#rrggbb`, or a validation error naming the field
pub fn validate_color(field: &str, value: &str) -> Result<String, BrandServiceError> {
    Rgb::parse_hex(value)
        .map(Rgb::to_hex)
        .ok_or_else(|| BrandServiceError::ValidationError(format!("{} must be a #rrggbb colour", field)))
}

fn require_text(field: &str, value: &str) -> Result<String, BrandServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BrandServiceError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(value.to_string())
}

fn normalize_slug(value: &str) -> Result<String, BrandServiceError> {
    let slug = generate_slug(value);
    if !is_valid_slug(&slug) {
        return Err(BrandServiceError::ValidationError(format!("Invalid slug: {}", value)));
    }
    Ok(slug)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
