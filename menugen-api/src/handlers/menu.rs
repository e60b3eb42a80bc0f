use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use menugen_common::api::{
    ApiErrorResponse, GenerateMenuRequest, MenuItem, UploadMenuResponse,
};
use menugen_common::page::PageResponse;
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use crate::db::with_connection;
use crate::error::ApiError;
use crate::extract::{self, Path, Query};
use crate::generation::{build_page_request, resolve_page_assets};
use crate::ingest::{parse_menu, MenuFileKind};
use crate::naming::extension;
use crate::provisioning::{self, Page};

use super::{read_file_field, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/organizations/{id}/menu", post(upload_menu).get(list_menu))
        .route("/organizations/{id}/menu/categories", get(list_categories))
        .route("/organizations/{id}/menu/generate", post(generate_menu))
        .route("/organizations/{id}/menu/url", get(menu_url))
        .route("/organizations/{id}/qr", get(qr_code))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMenuQuery {
    /// Only items of this category
    pub category: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ThemeQuery {
    /// Theme of the published page
    pub theme: String,
}

#[utoipa::path(
    post,
    path = "/organizations/{id}/menu",
    params(
        ("id" = i32, Path, description = "Organization id"),
    ),
    request_body(content_type = "multipart/form-data", description = "Menu file in the `file` field (.csv, .xls or .xlsx)"),
    responses(
        (status = 200, description = "Menu replaced", body = UploadMenuResponse),
        (status = 400, description = "Unsupported, oversized or malformed file", body = ApiErrorResponse),
        (status = 404, description = "Organization not found", body = ApiErrorResponse),
        (status = 503, description = "Service busy", body = ApiErrorResponse),
    ),
    tag = "menu"
)]
#[instrument(skip(state, multipart))]
pub async fn upload_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadMenuResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation("menu file name is required".to_string()))?;
        let kind = menu_file_kind(&state, &file_name)?;
        let bytes = read_file_field(&mut field, state.config.max_upload_size).await?;
        upload = Some((file_name, kind, bytes));
        break;
    }
    let (file_name, kind, bytes) =
        upload.ok_or_else(|| ApiError::Validation("multipart field `file` is required".to_string()))?;

    let rows = tokio::task::spawn_blocking(move || parse_menu(kind, &bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("menu parser failed: {e}")))?
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    tracing::info!(org_id = id, %file_name, rows = rows.len(), "Parsed menu file");

    let result =
        with_connection(&state.pool, move |conn| provisioning::replace_menu(conn, id, rows))
            .await?;
    Ok(Json(result))
}

fn menu_file_kind(state: &AppState, file_name: &str) -> Result<MenuFileKind, ApiError> {
    let unsupported = || {
        ApiError::Validation(format!(
            "unsupported menu file {file_name:?}, allowed extensions: {}",
            state.config.allowed_menu_extensions.join(", ")
        ))
    };
    let ext = extension(file_name).ok_or_else(unsupported)?;
    if !state.config.is_allowed_menu_extension(&ext) {
        return Err(unsupported());
    }
    MenuFileKind::from_extension(&ext).ok_or_else(unsupported)
}

#[utoipa::path(
    get,
    path = "/organizations/{id}/menu",
    params(
        ("id" = i32, Path, description = "Organization id"),
        ListMenuQuery,
    ),
    responses(
        (status = 200, description = "Menu items in file order", body = Vec<MenuItem>),
        (status = 404, description = "Organization not found", body = ApiErrorResponse),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn list_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ListMenuQuery>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let page = Page::new(query.skip, query.limit)?;
    let items = with_connection(&state.pool, move |conn| {
        provisioning::list_menu(conn, id, query.category.as_deref(), page)
    })
    .await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/organizations/{id}/menu/categories",
    params(
        ("id" = i32, Path, description = "Organization id"),
    ),
    responses(
        (status = 200, description = "Categories in first-seen order", body = Vec<String>),
        (status = 404, description = "Organization not found", body = ApiErrorResponse),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<String>>, ApiError> {
    let categories =
        with_connection(&state.pool, move |conn| provisioning::list_categories(conn, id)).await?;
    Ok(Json(categories))
}

#[utoipa::path(
    post,
    path = "/organizations/{id}/menu/generate",
    params(
        ("id" = i32, Path, description = "Organization id"),
    ),
    request_body = GenerateMenuRequest,
    responses(
        (status = 200, description = "Page published", body = PageResponse),
        (status = 400, description = "Invalid theme", body = ApiErrorResponse),
        (status = 404, description = "Organization or theme not found", body = ApiErrorResponse),
        (status = 503, description = "Generator unavailable", body = ApiErrorResponse),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn generate_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    extract::Json(payload): extract::Json<GenerateMenuRequest>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = publish_page(&state, id, &payload.theme).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/organizations/{id}/menu/url",
    params(
        ("id" = i32, Path, description = "Organization id"),
        ThemeQuery,
    ),
    responses(
        (status = 200, description = "URL of the published page", body = PageResponse),
        (status = 404, description = "Organization not found or page not published", body = ApiErrorResponse),
        (status = 503, description = "Generator unavailable", body = ApiErrorResponse),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn menu_url(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ThemeQuery>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = published_page(&state, id, &query.theme).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/organizations/{id}/qr",
    params(
        ("id" = i32, Path, description = "Organization id"),
        ThemeQuery,
    ),
    responses(
        (status = 200, description = "SVG QR code of the published page URL", content_type = "image/svg+xml", body = String),
        (status = 404, description = "Organization not found or page not published", body = ApiErrorResponse),
        (status = 503, description = "Generator unavailable", body = ApiErrorResponse),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn qr_code(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ThemeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = published_page(&state, id, &query.theme).await?;
    let svg = render_qr_svg(&page.url)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

fn required_theme(theme: &str) -> Result<String, ApiError> {
    let theme = theme.trim();
    if theme.is_empty() {
        return Err(ApiError::Validation("theme is required".to_string()));
    }
    if !theme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::Validation(format!("invalid theme {theme:?}")));
    }
    Ok(theme.to_string())
}

/// Publishes the page of an organization for `theme`, or returns the one
/// already published.
async fn publish_page(state: &AppState, org_id: i32, theme: &str) -> Result<PageResponse, ApiError> {
    let theme = required_theme(theme)?;

    let (organization, items) = with_connection(&state.pool, move |conn| {
        let organization = provisioning::get_organization(conn, org_id)?;
        let items = provisioning::available_menu(conn, org_id)?;
        Ok((organization, items))
    })
    .await?;

    let assets = resolve_page_assets(&state.images, org_id, &items).await;
    let request = build_page_request(&organization, &theme, items, assets);
    let page = state.generator.generate(&request).await?;
    tracing::info!(org_id, %theme, status = ?page.status, url = %page.url, "Menu page ready");
    Ok(page)
}

/// Looks up a page published earlier. Nothing is rendered.
async fn published_page(
    state: &AppState,
    org_id: i32,
    theme: &str,
) -> Result<PageResponse, ApiError> {
    let theme = required_theme(theme)?;
    with_connection(&state.pool, move |conn| provisioning::get_organization(conn, org_id)).await?;
    state.generator.lookup(org_id, &theme).await
}

pub fn render_qr_svg(data: &str) -> Result<String, ApiError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| ApiError::Internal(format!("failed to encode QR code: {e}")))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_qr_svg() {
        let svg = render_qr_svg("http://localhost:8001/pages/1/dark/index.html").unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_required_theme() {
        assert_eq!(required_theme(" dark ").unwrap(), "dark");
        assert!(matches!(required_theme("  "), Err(ApiError::Validation(_))));
        assert!(matches!(required_theme("../dark"), Err(ApiError::Validation(_))));
    }
}
