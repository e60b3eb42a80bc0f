pub mod debug;
pub mod images;
pub mod menu;
pub mod organizations;
pub mod themes;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::{multipart::Field, DefaultBodyLimit},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::generation::GeneratorClient;
use crate::storage::ImageStore;

/// Files accepted by one multipart request.
pub const MAX_FILES_PER_REQUEST: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub images: Arc<ImageStore>,
    pub generator: GeneratorClient,
}

impl AppState {
    pub fn new(config: Config, pool: DbPool, generator: GeneratorClient) -> Self {
        let images = ImageStore::new(config.upload_dir.clone(), &config.base_url);
        Self {
            pool,
            config: Arc::new(config),
            images: Arc::new(images),
            generator,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_size
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(64 * 1024);
    let uploads = ServeDir::new(state.images.root());

    Router::new()
        .route("/health", get(health))
        .merge(users::router())
        .merge(organizations::router())
        .merge(menu::router())
        .merge(images::router())
        .merge(themes::router())
        .merge(debug::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .nest_service("/files", uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Reads a multipart file field, failing once it grows past `limit` bytes.
async fn read_file_field(field: &mut Field<'_>, limit: usize) -> Result<Vec<u8>, ApiError> {
    let label = field.file_name().unwrap_or("upload").to_string();
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        if bytes.len() + chunk.len() > limit {
            return Err(ApiError::Validation(format!(
                "{label} exceeds the maximum upload size of {limit} bytes"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::register_user,
        users::get_user_by_telegram_id,
        organizations::create_organization,
        organizations::list_organizations,
        organizations::get_organization,
        menu::upload_menu,
        menu::list_menu,
        menu::list_categories,
        menu::generate_menu,
        menu::menu_url,
        menu::qr_code,
        images::upload_images,
        images::upload_background,
        themes::list_themes,
        debug::debug_tables,
        debug::table_structure,
        debug::table_data,
    ),
    components(
        schemas(
            menugen_common::api::User,
            menugen_common::api::Organization,
            menugen_common::api::MenuItem,
            menugen_common::api::UploadMenuResponse,
            menugen_common::api::UploadImagesResponse,
            menugen_common::api::GenerateMenuRequest,
            menugen_common::api::ThemesResponse,
            menugen_common::api::TableInfo,
            menugen_common::api::ColumnInfo,
            menugen_common::api::TableStructure,
            menugen_common::api::TableData,
            menugen_common::api::ApiErrorResponse,
            menugen_common::page::PageResponse,
            menugen_common::page::PageStatus,
            organizations::CreateOrganizationForm,
        )
    ),
    tags(
        (name = "users", description = "User registration"),
        (name = "organizations", description = "Organization provisioning"),
        (name = "menu", description = "Menu ingestion, listing and page generation"),
        (name = "images", description = "Image and background uploads"),
        (name = "themes", description = "Page themes"),
        (name = "debug", description = "Schema introspection")
    ),
    info(
        title = "Menugen API",
        description = "Backend for organizations, menus and generated menu pages",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;
