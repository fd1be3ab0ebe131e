//! Static file serving
//!
//! `/assets/*` comes from the stylesheets and scripts embedded at build
//! time. Uploads are served straight from disk by `ServeDir` (see
//! [`build_router`](crate::api::build_router)). Anything else that no route
//! matched gets the 404 page.

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

use crate::api::middleware::AppState;
use crate::pages;

/// Embedded site stylesheets and scripts
#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// Fallback handler for everything the routers did not match
pub async fn serve_static(State(state): State<AppState>, uri: Uri) -> Response {
    let raw = uri.path();
    let decoded = urlencoding::decode(raw).unwrap_or_else(|_| raw.into());

    if let Some(asset) = decoded.strip_prefix("/assets/") {
        if let Some(content) = Assets::get(asset) {
            return file_response(asset, content.data.into_owned());
        }
    }

    pages::not_found_page(&state, raw).into_response()
}

fn file_response(path: &str, data: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, get_content_type(path)),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    )
        .into_response()
}

/// Get content type from file extension
fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("").to_ascii_lowercase().as_str() {
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
