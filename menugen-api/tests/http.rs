//! HTTP surface checks that need no database: requests are rejected before a
//! connection is requested, or the pool points at an unreachable server.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use menugen_api::db::build_pool_lazy;
use menugen_api::generation::GeneratorClient;
use menugen_api::handlers::{router, AppState};
use menugen_api::Config;
use menugen_common::RetryPolicy;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "menugen-test-boundary";

fn app(generator_url: &str, upload_dir: &std::path::Path) -> Router {
    let upload_dir = upload_dir.to_string_lossy().to_string();
    let generator_url = generator_url.to_string();
    let config = Config::from_lookup(move |key| match key {
        "DATABASE_URL" => Some("postgres://menugen@127.0.0.1:1/unreachable".to_string()),
        "DB_POOL_TIMEOUT_SECS" => Some("1".to_string()),
        "GENERATOR_URL" => Some(generator_url.clone()),
        "UPLOAD_DIR" => Some(upload_dir.clone()),
        "MAX_UPLOAD_SIZE" => Some("1024".to_string()),
        _ => None,
    })
    .unwrap();
    let pool = build_pool_lazy(&config);
    let generator = GeneratorClient::new(&config.generator_url, Duration::from_secs(2))
        .unwrap()
        .with_retry(RetryPolicy::no_delay(1));
    router(AppState::new(config, pool, generator))
}

fn multipart(field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    multipart_to("/organizations/1/menu", field, file_name, content)
}

fn multipart_to(uri: &str, field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_menu_upload_rejects_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(multipart("file", "menu.pdf", b"%PDF-1.4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("menu.pdf"));
}

#[tokio::test]
async fn test_menu_upload_rejects_malformed_file_before_storage() {
    let dir = tempfile::tempdir().unwrap();
    let csv = b"name,price,category\nMargherita,12.50,Pizza\nCola,free,Drinks\n";
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(multipart("file", "menu.csv", csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "row 3: invalid price \"free\"");
}

#[tokio::test]
async fn test_menu_upload_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = b"name,price,category\n".to_vec();
    csv.extend(std::iter::repeat(b'a').take(2048));
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(multipart("file", "menu.csv", &csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("maximum upload size"));
}

#[tokio::test]
async fn test_unknown_background_slot() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(multipart_to(
            "/organizations/1/backgrounds/sidebar",
            "file",
            "bg.jpg",
            b"jpeg",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_pagination() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(
            Request::get("/organizations?limit=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unreachable_database_reports_busy() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(Request::get("/organizations/1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Service busy, try again later");
}

#[tokio::test]
async fn test_themes_are_proxied_from_generator() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/themes")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"themes":{"dark":"Dark","light":"Light"}}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let response = app(&server.url(), dir.path())
        .oneshot(Request::get("/themes").body(Body::empty()).unwrap())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["themes"]["dark"], "Dark");
}

#[tokio::test]
async fn test_themes_report_unavailable_generator() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/themes")
        .with_status(500)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let response = app(&server.url(), dir.path())
        .oneshot(Request::get("/themes").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_uploaded_files_are_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("5")).unwrap();
    std::fs::write(dir.path().join("5/logo.jpg"), b"jpeg-bytes").unwrap();

    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(Request::get("/files/5/logo.jpg").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"jpeg-bytes");
}

#[tokio::test]
async fn test_openapi_document() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/organizations/{id}/menu/generate"].is_object());
    assert!(body["paths"]["/organizations/{id}/menu/url"].is_object());
    assert!(body["paths"]["/debug/tables/{table_name}/data"].is_object());
}

async fn assert_json_error(response: axum::response::Response, status: StatusCode) -> String {
    assert_eq!(response.status(), status);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    json_body(response).await["error"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_malformed_form_is_a_json_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(
            Request::post("/organizations")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("name=Cafe&owner_id=abc"))
                .unwrap(),
        )
        .await
        .unwrap();

    let error = assert_json_error(response, StatusCode::BAD_REQUEST).await;
    assert!(error.contains("owner_id"), "{error}");
}

#[tokio::test]
async fn test_missing_query_parameter_is_a_json_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(Request::post("/register_user").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let error = assert_json_error(response, StatusCode::BAD_REQUEST).await;
    assert!(error.contains("tid"), "{error}");
}

#[tokio::test]
async fn test_non_numeric_path_is_a_json_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(Request::get("/organizations/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let error = assert_json_error(response, StatusCode::BAD_REQUEST).await;
    assert!(error.contains("abc"), "{error}");
}

#[tokio::test]
async fn test_malformed_json_body_is_a_json_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(
            Request::post("/organizations/1/menu/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"theme": "#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_json_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_upload_without_multipart_body_is_a_json_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(
            Request::post("/organizations/1/menu")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from("name,price,category\n"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_json_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_menu_url_requires_a_valid_theme() {
    let dir = tempfile::tempdir().unwrap();
    let router = app("http://127.0.0.1:1", dir.path());

    let missing = router
        .clone()
        .oneshot(
            Request::get("/organizations/1/menu/url")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_json_error(missing, StatusCode::BAD_REQUEST).await;

    let invalid = router
        .oneshot(
            Request::get("/organizations/1/menu/url?theme=..%2Fdark")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let error = assert_json_error(invalid, StatusCode::BAD_REQUEST).await;
    assert!(error.contains("invalid theme"), "{error}");
}

#[tokio::test]
async fn test_debug_table_data_rejects_limit_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let response = app("http://127.0.0.1:1", dir.path())
        .oneshot(
            Request::get("/debug/tables/users/data?limit=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let error = assert_json_error(response, StatusCode::BAD_REQUEST).await;
    assert!(error.contains("limit"), "{error}");
}
