use std::path::Path;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use menugen_generator::handlers::{router, AppState};
use menugen_generator::themes::{ThemeMap, ThemeRegistry};
use menugen_generator::Config;
use serde_json::Value;
use tower::ServiceExt;

fn app(pages_dir: &Path) -> Router {
    let pages_dir = pages_dir.to_string_lossy().to_string();
    let config = Config::from_lookup(move |key| match key {
        "BASE_URL" => Some("https://menu.example".to_string()),
        "THEMES_BASE_URL" => Some("https://themes.example".to_string()),
        "PAGES_DIR" => Some(pages_dir.clone()),
        _ => None,
    })
    .unwrap();
    router(AppState::new(config, ThemeRegistry::new(ThemeMap::builtin())))
}

/// Raw JSON so the category key order reaches the service untouched.
fn payload(org_id: i32, theme: &str) -> String {
    titled_payload(org_id, theme, "Pizzeria")
}

fn titled_payload(org_id: i32, theme: &str, title: &str) -> String {
    format!(
        r#"{{
            "org_id": {org_id},
            "page_name": "pizzeria_1767225600000",
            "title": "{title}",
            "theme": "{theme}",
            "content": {{
                "Pizza": [
                    {{"name": "Margherita", "price": "12.50", "description": "Tomato & basil"}},
                    {{"name": "Diavola", "price": "14.00"}}
                ],
                "Drinks": [{{"name": "Cola", "price": "2.00"}}],
                "Antipasti": [{{"name": "Bruschetta", "price": "6.00"}}]
            }},
            "organization": {{"title": "{title}", "footer_text": "© {title}"}}
        }}"#
    )
}

fn post_generate(body: &str) -> Request<Body> {
    Request::post("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_generate_publishes_page() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(post_generate(&payload(7, "dark")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "generated");
    assert_eq!(body["url"], "https://menu.example/pages/7/dark/index.html");

    let html = std::fs::read_to_string(dir.path().join("7/dark/index.html")).unwrap();
    assert!(html.contains("12.50"));
    assert!(html.contains("Tomato &amp; basil"));
    assert!(html.contains("https://themes.example/dark.css"));
    let pizza = html.find("Pizza<").unwrap();
    let drinks = html.find("Drinks").unwrap();
    let antipasti = html.find("Antipasti").unwrap();
    assert!(pizza < drinks && drinks < antipasti);
}

#[tokio::test]
async fn test_second_generation_returns_same_url_without_rewriting() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let first = json_body(app.clone().oneshot(post_generate(&payload(7, "light"))).await.unwrap()).await;
    let path = dir.path().join("7/light/index.html");
    let original = std::fs::read_to_string(&path).unwrap();

    let changed = titled_payload(7, "light", "Renamed");
    let second = json_body(app.oneshot(post_generate(&changed)).await.unwrap()).await;

    assert_eq!(first["url"], second["url"]);
    assert_eq!(second["status"], "exists");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_unknown_theme_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(post_generate(&payload(7, "vintage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "theme not found: vintage");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_organization_id() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(post_generate(&payload(0, "dark")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_generation_yields_one_complete_page() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { app.oneshot(post_generate(&payload(9, "dark"))).await })
        })
        .collect();

    let mut generated = 0;
    let mut urls = Vec::new();
    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        if body["status"] == "generated" {
            generated += 1;
        }
        urls.push(body["url"].as_str().unwrap().to_string());
    }
    urls.dedup();

    assert_eq!(generated, 1);
    assert_eq!(urls.len(), 1);
    let page_dir = dir.path().join("9/dark");
    assert_eq!(std::fs::read_dir(&page_dir).unwrap().count(), 1);
    let html = std::fs::read_to_string(page_dir.join("index.html")).unwrap();
    assert!(html.trim_end().ends_with("</html>"));
}

#[tokio::test]
async fn test_published_pages_are_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    app.clone()
        .oneshot(post_generate(&payload(4, "dark")))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::get("/pages/4/dark/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("Margherita"));
}

#[tokio::test]
async fn test_list_themes_sorted_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(Request::get("/themes").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let ids: Vec<_> = body["themes"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(ids, vec!["dark", "light"]);
}

#[tokio::test]
async fn test_reload_without_source_keeps_themes() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let response = app
        .clone()
        .oneshot(
            Request::post("/admin/themes/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let themes = json_body(
        app.oneshot(Request::get("/themes").body(Body::empty()).unwrap())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(themes["themes"]["light"], "Light");
}

#[tokio::test]
async fn test_published_lookup_never_renders() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(dir.path());
    let lookup = || Request::get("/published/7/dark").body(Body::empty()).unwrap();

    let response = router.clone().oneshot(lookup()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "page not published: 7/dark");
    assert!(!dir.path().join("7").exists());

    let response = router
        .clone()
        .oneshot(post_generate(&payload(7, "dark")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(lookup()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "exists");
    assert_eq!(body["url"], "https://menu.example/pages/7/dark/index.html");
}

#[tokio::test]
async fn test_published_lookup_of_unknown_theme() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(Request::get("/published/7/neon").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "theme not found: neon");
}
