//! Server-rendered public pages
//!
//! Templates are embedded at build time and rendered with Tera. Every page
//! extends `base.html`, which receives the site metadata and the current
//! path for navigation.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{Datelike, Utc};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use tera::{Context as TeraContext, Tera};

use crate::api::AppState;
use crate::models::{BrandDivision, ListParams};
use crate::services::{BrandPalette, Carousel, SlideLayout};

/// Latest posts shown on the home page
const HOME_POST_COUNT: u32 = 3;
/// Posts per blog page
const BLOG_PAGE_SIZE: u32 = 9;
/// Brand activities listed in the home page news strip
const HOME_ACTIVITY_COUNT: i64 = 4;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct TemplateFiles;

/// The compiled page templates
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Compile the embedded templates
    pub fn load() -> anyhow::Result<Self> {
        let mut templates = Vec::new();
        for name in TemplateFiles::iter() {
            let file = TemplateFiles::get(&name)
                .ok_or_else(|| anyhow::anyhow!("Missing embedded template {}", name))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|e| anyhow::anyhow!("Template {} is not UTF-8: {}", name, e))?;
            templates.push((name.to_string(), content));
        }

        let mut tera = Tera::default();
        // Builds the inheritance chains once every template is known
        tera.add_raw_templates(templates)
            .map_err(|e| anyhow::anyhow!("Failed to compile templates: {}", describe(&e)))?;
        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> anyhow::Result<String> {
        self.tera
            .render(template, context)
            .map_err(|e| anyhow::anyhow!("Failed to render '{}': {}", template, describe(&e)))
    }

    pub fn has(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|n| n == template)
    }
}

/// Tera errors carry the useful part in their source chain
fn describe(e: &tera::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        msg.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    msg
}

/// Page rendering failure
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Page not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn internal<E>(e: E) -> PageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    PageError::Internal(e.into())
}

/// A page response; errors render the not-found page or a plain 500
pub struct PageResponse {
    status: StatusCode,
    body: String,
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        (self.status, Html(self.body)).into_response()
    }
}

fn base_context(state: &AppState, path: &str) -> TeraContext {
    let mut ctx = TeraContext::new();
    ctx.insert("site", state.site.as_ref());
    ctx.insert("current_path", path);
    ctx.insert("year", &Utc::now().year());
    ctx
}

fn render(state: &AppState, template: &str, ctx: &TeraContext) -> Result<String, PageError> {
    Ok(state.templates.render(template, ctx)?)
}

/// Turn a handler result into a response, rendering errors as pages
fn respond(state: &AppState, path: &str, result: Result<String, PageError>) -> PageResponse {
    match result {
        Ok(body) => PageResponse {
            status: StatusCode::OK,
            body,
        },
        Err(PageError::NotFound) => not_found_page(state, path),
        Err(PageError::Internal(e)) => {
            tracing::error!(path, "Page failed: {:#}", e);
            PageResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "<!doctype html><h1>Something went wrong</h1>".to_string(),
            }
        }
    }
}

/// The 404 page
pub fn not_found_page(state: &AppState, path: &str) -> PageResponse {
    let ctx = base_context(state, path);
    let body = state.templates.render("not_found.html", &ctx).unwrap_or_else(|e| {
        tracing::error!("Failed to render 404 page: {:#}", e);
        "<!doctype html><h1>404 Not Found</h1>".to_string()
    });
    PageResponse {
        status: StatusCode::NOT_FOUND,
        body,
    }
}

/// One carousel slide on the home page
#[derive(Debug, Serialize)]
struct Slide<'a> {
    division: &'a BrandDivision,
    palette: BrandPalette,
    layout: SlideLayout,
    style: String,
}

fn slides(divisions: &[BrandDivision]) -> Vec<Slide<'_>> {
    let carousel = Carousel::new(divisions.len());
    divisions
        .iter()
        .zip(carousel.layout())
        .map(|(division, layout)| Slide {
            division,
            palette: BrandPalette::for_division(division),
            style: layout.style(),
            layout,
        })
        .collect()
}

/// Build the page router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/brands", get(brands))
        .route("/brands/{slug}", get(brand))
        .route("/blog", get(blog))
        .route("/blog/{slug}", get(post))
}

/// GET / - brand carousel, latest posts and division news
async fn home(State(state): State<AppState>) -> PageResponse {
    let result = async {
        let divisions = state.brand_service.list_divisions().await.map_err(internal)?;
        let posts = state
            .post_service
            .list_published(None, None, &ListParams::new(1, HOME_POST_COUNT))
            .await
            .map_err(internal)?;
        let activities = state
            .brand_service
            .recent_activities(HOME_ACTIVITY_COUNT)
            .await
            .map_err(internal)?;
        let clients = state.client_service.list().await.map_err(internal)?;

        let mut ctx = base_context(&state, "/");
        ctx.insert("slides", &slides(&divisions));
        ctx.insert("posts", &posts.items);
        ctx.insert("activities", &activities);
        ctx.insert("clients", &clients);
        render(&state, "home.html", &ctx)
    }
    .await;
    respond(&state, "/", result)
}

/// GET /about - group story, departments and team
async fn about(State(state): State<AppState>) -> PageResponse {
    let result = async {
        let groups = state.team_service.directory().await.map_err(internal)?;
        let divisions = state.brand_service.list_divisions().await.map_err(internal)?;

        let mut ctx = base_context(&state, "/about");
        ctx.insert("groups", &groups);
        ctx.insert("divisions", &divisions);
        render(&state, "about.html", &ctx)
    }
    .await;
    respond(&state, "/about", result)
}

/// GET /brands
async fn brands(State(state): State<AppState>) -> PageResponse {
    let result = async {
        let divisions = state.brand_service.list_divisions().await.map_err(internal)?;
        let cards: Vec<_> = divisions
            .iter()
            .map(|d| serde_json::json!({ "division": d, "palette": BrandPalette::for_division(d) }))
            .collect();

        let mut ctx = base_context(&state, "/brands");
        ctx.insert("brands", &cards);
        render(&state, "brands.html", &ctx)
    }
    .await;
    respond(&state, "/brands", result)
}

/// GET /brands/{slug} - themed with the division's palette
async fn brand(State(state): State<AppState>, Path(slug): Path<String>) -> PageResponse {
    let path = format!("/brands/{}", slug);
    let result = async {
        let division = state
            .brand_service
            .get_by_slug(&slug)
            .await
            .map_err(internal)?
            .ok_or(PageError::NotFound)?;
        let activities = state
            .brand_service
            .list_activities(division.id)
            .await
            .map_err(internal)?;

        let mut ctx = base_context(&state, "/brands");
        ctx.insert("palette", &BrandPalette::for_division(&division));
        ctx.insert("division", &division);
        ctx.insert("activities", &activities);
        render(&state, "brand.html", &ctx)
    }
    .await;
    respond(&state, &path, result)
}

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /blog - paginated listing, optionally within one category
async fn blog(State(state): State<AppState>, Query(query): Query<BlogQuery>) -> PageResponse {
    let result = async {
        let category = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let params = ListParams::new(query.page.unwrap_or(1), BLOG_PAGE_SIZE);
        let posts = state
            .post_service
            .list_published(category, None, &params)
            .await
            .map_err(internal)?;
        if params.page > 1 && posts.items.is_empty() {
            return Err(PageError::NotFound);
        }
        let categories = state
            .category_service
            .list_with_counts()
            .await
            .map_err(internal)?;

        let mut ctx = base_context(&state, "/blog");
        ctx.insert("has_prev", &posts.has_prev());
        ctx.insert("has_next", &posts.has_next());
        ctx.insert("posts", &posts);
        ctx.insert("categories", &categories);
        ctx.insert("active_category", &category);
        render(&state, "blog.html", &ctx)
    }
    .await;
    respond(&state, "/blog", result)
}

/// GET /blog/{slug} - one post with its comment threads
async fn post(State(state): State<AppState>, Path(slug): Path<String>) -> PageResponse {
    let path = format!("/blog/{}", slug);
    let result = async {
        let post = state
            .post_service
            .get_published(&slug)
            .await
            .map_err(internal)?
            .ok_or(PageError::NotFound)?;
        let threads = state
            .comment_service
            .list_threads(&slug)
            .await
            .map_err(internal)?;

        let mut ctx = base_context(&state, "/blog");
        ctx.insert("post", &post);
        ctx.insert("threads", &threads);
        render(&state, "post.html", &ctx)
    }
    .await;
    respond(&state, &path, result)
}

/// Fallback for unknown paths
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> PageResponse {
    not_found_page(&state, uri.path())
}
