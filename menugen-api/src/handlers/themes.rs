use axum::{extract::State, response::Json, routing::get, Router};
use menugen_common::api::{ApiErrorResponse, ThemesResponse};
use tracing::instrument;

use crate::error::ApiError;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/themes", get(list_themes))
}

#[utoipa::path(
    get,
    path = "/themes",
    responses(
        (status = 200, description = "Theme id mapped to display name", body = ThemesResponse),
        (status = 503, description = "Generator unavailable", body = ApiErrorResponse),
    ),
    tag = "themes"
)]
#[instrument(skip(state))]
pub async fn list_themes(State(state): State<AppState>) -> Result<Json<ThemesResponse>, ApiError> {
    Ok(Json(state.generator.themes().await?))
}
