use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use menugen_common::api::ThemesResponse;
use menugen_common::page::{PageRequest, PageResponse};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::instrument;

use crate::config::Config;
use crate::error::GeneratorError;
use crate::pages::{find_page, generate_page, PageStore};
use crate::themes::ThemeRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub themes: Arc<ThemeRegistry>,
    pub pages: Arc<PageStore>,
}

impl AppState {
    pub fn new(config: Config, themes: ThemeRegistry) -> Self {
        let pages = PageStore::new(config.pages_dir.clone(), config.base_url.clone());
        Self {
            config: Arc::new(config),
            themes: Arc::new(themes),
            pages: Arc::new(pages),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let pages = ServeDir::new(state.pages.root());

    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/published/{org_id}/{theme}", get(published))
        .route("/themes", get(list_themes))
        .route("/admin/themes/reload", post(reload_themes))
        .with_state(state)
        .nest_service("/pages", pages)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip(state, request), fields(org_id = request.org_id, theme = %request.theme))]
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<PageRequest>,
) -> Result<Json<PageResponse>, GeneratorError> {
    let themes = state.themes.snapshot();
    let response = generate_page(
        &state.pages,
        &themes,
        &state.config.themes_base_url,
        &request,
    )
    .await?;
    Ok(Json(response))
}

#[instrument(skip(state))]
pub async fn published(
    State(state): State<AppState>,
    Path((org_id, theme)): Path<(i32, String)>,
) -> Result<Json<PageResponse>, GeneratorError> {
    let themes = state.themes.snapshot();
    Ok(Json(find_page(&state.pages, &themes, org_id, &theme).await?))
}

#[instrument(skip(state))]
pub async fn list_themes(State(state): State<AppState>) -> Json<ThemesResponse> {
    Json(ThemesResponse {
        themes: state.themes.snapshot().display_names(),
    })
}

#[instrument(skip(state))]
pub async fn reload_themes(
    State(state): State<AppState>,
) -> Result<Json<ThemesResponse>, GeneratorError> {
    let themes = state.themes.reload().await?;
    Ok(Json(ThemesResponse {
        themes: themes.display_names(),
    }))
}
