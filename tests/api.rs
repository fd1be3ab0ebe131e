//! End-to-end tests through the full router

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use kinyweb::api::{build_router, AppState};
use kinyweb::config::Config;
use kinyweb::db::{create_test_pool, migrations};

struct TestApp {
    server: TestServer,
    _uploads: TempDir,
}

async fn app() -> TestApp {
    let uploads = TempDir::new().unwrap();
    let mut config = Config::default();
    config.upload.path = uploads.path().to_path_buf();
    config.upload.max_file_size = 1024;

    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    let state = AppState::new(&config, pool).unwrap();

    TestApp {
        server: TestServer::new(build_router(state, &config.server.cors_origin)).unwrap(),
        _uploads: uploads,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

async fn register(server: &TestServer, name: &str, email: &str) -> (Value, String) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({ "name": name, "email": email, "password": "correct horse" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let token = body["token"].as_str().unwrap().to_string();
    (body["user"].clone(), token)
}

async fn publish(server: &TestServer, token: &str, title: &str) -> Value {
    let response = server
        .post("/api/dashboard/posts")
        .add_header(header::AUTHORIZATION, bearer(token))
        .json(&json!({ "title": title, "content": "<p>Hello <b>world</b></p>", "status": "published" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

fn visitor(ua: &str) -> (HeaderName, HeaderValue) {
    (header::USER_AGENT, HeaderValue::from_str(ua).unwrap())
}

#[tokio::test]
async fn test_first_user_is_admin_and_sets_cookie() {
    let app = app().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "Ada", "email": "ada@example.com", "password": "correct horse" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let cookie = response.header(header::SET_COOKIE);
    assert!(cookie.to_str().unwrap().starts_with("session="));
    assert_eq!(response.json::<Value>()["user"]["role"], "admin");

    let (second, _) = register(&app.server, "Bob", "bob@example.com").await;
    assert_eq!(second["role"], "reader");
}

#[tokio::test]
async fn test_login_me_and_logout() {
    let app = app().await;
    register(&app.server, "Ada", "ada@example.com").await;

    let wrong = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": "nope nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let login = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ADA@example.com", "password": "correct horse" }))
        .await;
    login.assert_status_ok();
    let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

    let me = app
        .server
        .get("/api/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["email"], "ada@example.com");

    app.server
        .post("/api/auth/logout")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get("/api/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = app().await;
    let (_, token) = register(&app.server, "Ada", "ada@example.com").await;

    let me = app
        .server
        .get("/api/auth/me")
        .add_header(
            header::COOKIE,
            HeaderValue::from_str(&format!("session={}", token)).unwrap(),
        )
        .await;
    me.assert_status_ok();
}

#[tokio::test]
async fn test_dashboard_requires_role() {
    let app = app().await;
    register(&app.server, "Ada", "ada@example.com").await;
    let (_, reader) = register(&app.server, "Bob", "bob@example.com").await;

    app.server
        .get("/api/dashboard/stats")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/dashboard/posts")
        .add_header(header::AUTHORIZATION, bearer(&reader))
        .json(&json!({ "title": "Nope", "content": "x" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"]["code"], "FORBIDDEN");

    app.server
        .get("/api/dashboard/users")
        .add_header(header::AUTHORIZATION, bearer(&reader))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_publish_and_read_post() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;

    let post = publish(&app.server, &admin, "Hello World").await;
    assert_eq!(post["slug"], "hello-world");

    let list = app.server.get("/api/posts").await;
    list.assert_status_ok();
    let list: Value = list.json();
    assert_eq!(list["total"], 1);
    assert_eq!(list["items"][0]["title"], "Hello World");

    let single = app.server.get("/api/posts/hello-world").await;
    single.assert_status_ok();
    assert!(single.json::<Value>()["content"].as_str().unwrap().contains("<b>world</b>"));

    // Same title again gets a suffixed slug
    let again = publish(&app.server, &admin, "Hello World").await;
    assert_eq!(again["slug"], "hello-world-2");

    app.server
        .get("/api/posts/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_drafts_stay_private() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;

    app.server
        .post("/api/dashboard/posts")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "title": "Secret", "content": "Soon" }))
        .await
        .assert_status(StatusCode::CREATED);

    assert_eq!(app.server.get("/api/posts").await.json::<Value>()["total"], 0);
    app.server
        .get("/api/posts/secret")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let dashboard = app
        .server
        .get("/api/dashboard/posts")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(dashboard.json::<Value>()["total"], 1);
}

#[tokio::test]
async fn test_guest_comment_and_reply() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;
    publish(&app.server, &admin, "Talk").await;

    let missing_name = app
        .server
        .post("/api/posts/talk/comments")
        .json(&json!({ "content": "Hi" }))
        .await;
    missing_name.assert_status(StatusCode::BAD_REQUEST);

    let first = app
        .server
        .post("/api/posts/talk/comments")
        .json(&json!({ "content": "Hi", "author_name": "Guest" }))
        .await;
    first.assert_status(StatusCode::CREATED);
    let first_id = first.json::<Value>()["id"].as_i64().unwrap();

    app.server
        .post("/api/posts/talk/comments")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "content": "Welcome", "parent_id": first_id }))
        .await
        .assert_status(StatusCode::CREATED);

    let threads: Value = app.server.get("/api/posts/talk/comments").await.json();
    assert_eq!(threads.as_array().unwrap().len(), 1);
    assert_eq!(threads[0]["author_name"], "Guest");
    assert_eq!(threads[0]["replies"][0]["author_name"], "Ada");

    let post: Value = app.server.get("/api/posts/talk").await.json();
    assert_eq!(post["comment_count"], 2);
}

#[tokio::test]
async fn test_likes_are_idempotent_per_visitor() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;
    publish(&app.server, &admin, "Likeable").await;

    let (name, value) = visitor("browser-a");
    for _ in 0..2 {
        let liked: Value = app
            .server
            .put("/api/posts/likeable/like")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(liked, json!({ "liked": true, "like_count": 1 }));
    }

    let (other_name, other_value) = visitor("browser-b");
    let toggled: Value = app
        .server
        .post("/api/posts/likeable/like")
        .add_header(other_name, other_value)
        .await
        .json();
    assert_eq!(toggled, json!({ "liked": true, "like_count": 2 }));

    let unliked: Value = app
        .server
        .delete("/api/posts/likeable/like")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(unliked, json!({ "liked": false, "like_count": 1 }));

    // No IP and no user agent: nothing to tell visitors apart by
    app.server
        .post("/api/posts/likeable/like")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_views_count_once_per_visitor() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;
    publish(&app.server, &admin, "Viewed").await;

    let (name, value) = visitor("browser-a");
    let first: Value = app
        .server
        .post("/api/posts/viewed/view")
        .add_header(name.clone(), value.clone())
        .await
        .json();
    assert_eq!(first, json!({ "counted": true, "view_count": 1 }));

    let second: Value = app
        .server
        .post("/api/posts/viewed/view")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(second, json!({ "counted": false, "view_count": 1 }));
}

#[tokio::test]
async fn test_upload_checks_type_and_serves_file() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;

    let pdf = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"%PDF-1.4".to_vec())
            .file_name("doc.pdf")
            .mime_type("application/pdf"),
    );
    let rejected = app
        .server
        .post("/api/uploads")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .multipart(pdf)
        .await;
    rejected.assert_status(StatusCode::BAD_REQUEST);

    let png = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"\x89PNG image".to_vec())
            .file_name("pic.exe")
            .mime_type("image/png"),
    );
    let stored = app
        .server
        .post("/api/uploads")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .multipart(png)
        .await;
    stored.assert_status(StatusCode::CREATED);
    let url = stored.json::<Value>()["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let served = app.server.get(&url).await;
    served.assert_status_ok();
    assert_eq!(served.as_bytes().as_ref(), b"\x89PNG image");
    assert_eq!(served.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    assert!(served
        .header(header::CONTENT_SECURITY_POLICY)
        .to_str()
        .unwrap()
        .contains("sandbox"));
}

#[tokio::test]
async fn test_upload_rejects_svg() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;

    let svg = MultipartForm::new().add_part(
        "file",
        Part::bytes(br#"<svg xmlns="http://www.w3.org/2000/svg"><script>fetch('/api/dashboard/users')</script></svg>"#.to_vec())
            .file_name("logo.svg")
            .mime_type("image/svg+xml"),
    );
    let response = app
        .server
        .post("/api/uploads")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .multipart(svg)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;

    let big = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; 2048]).file_name("big.png").mime_type("image/png"),
    );
    let response = app
        .server
        .post("/api/uploads")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .multipart(big)
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_brand_page_uses_palette() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;

    app.server
        .post("/api/dashboard/brands")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "name": "Kiny Travel",
            "tagline": "Go further",
            "description": "Trips",
            "primary_color": "#0f766e",
            "secondary_color": "#f59e0b"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let api: Value = app.server.get("/api/brands/kiny-travel").await.json();
    assert_eq!(api["palette"]["primary"], "#0f766e");

    let page = app.server.get("/brands/kiny-travel").await;
    page.assert_status_ok();
    let html = page.text();
    assert!(html.contains("--brand-primary: #0f766e"));
    assert!(html.contains("Go further"));

    let home = app.server.get("/").await;
    home.assert_status_ok();
    assert!(home.text().contains("carousel-slide"));
}

#[tokio::test]
async fn test_public_pages_render() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;
    publish(&app.server, &admin, "Page Post").await;

    for path in ["/", "/about", "/brands", "/blog", "/blog/page-post"] {
        app.server.get(path).await.assert_status_ok();
    }
    let post = app.server.get("/blog/page-post").await.text();
    assert!(post.contains("<b>world</b>"));
}

#[tokio::test]
async fn test_post_page_strips_active_content() {
    let app = app().await;
    let (_, admin) = register(&app.server, "Ada", "ada@example.com").await;

    let content = concat!(
        "<p>Safe</p>",
        "<img/src=x/onerror=alert(document.cookie)>",
        "<img src=y onerror=alert(1)>",
        r#"<a href="&#106;avascript:alert(1)">click</a>"#,
        "<a href=\"java\tscript:alert(1)\">tab</a>",
        r#"<meta http-equiv="refresh" content="0;url=https://evil.example">"#,
    );
    app.server
        .post("/api/dashboard/posts")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "title": "Tricky", "content": content, "status": "published" }))
        .await
        .assert_status(StatusCode::CREATED);

    let stored: Value = app.server.get("/api/posts/tricky").await.json();
    let stored = stored["content"].as_str().unwrap();
    assert!(stored.starts_with("<p>Safe</p>"));
    assert!(!stored.contains(" onerror="));
    assert!(!stored.contains("href"));
    assert!(!stored.contains("<meta"));

    let page = app.server.get("/blog/tricky").await;
    page.assert_status_ok();
    let html = page.text();
    assert!(html.contains("<p>Safe</p>"));
    assert!(!html.contains(" onerror="));
    assert!(!html.contains("javascript:"));
    assert!(!html.contains("http-equiv"));
}

#[tokio::test]
async fn test_unknown_paths_get_404_page() {
    let app = app().await;

    for path in ["/nowhere", "/blog/missing", "/brands/missing", "/blog?page=5"] {
        let response = app.server.get(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().contains("404"));
    }
}

#[tokio::test]
async fn test_assets_and_health() {
    let app = app().await;

    let css = app.server.get("/assets/css/site.css").await;
    css.assert_status_ok();
    assert_eq!(css.header(header::CONTENT_TYPE), "text/css; charset=utf-8");

    let health: Value = app.server.get("/api/health").await.json();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["database"], "up");
}
