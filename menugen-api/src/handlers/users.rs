use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use menugen_common::api::{ApiErrorResponse, User};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use crate::db::with_connection;
use crate::error::ApiError;
use crate::extract::{Path, Query};
use crate::provisioning;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register_user", post(register_user))
        .route("/users/telegram/{tid}", get(get_user_by_telegram_id))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RegisterUserQuery {
    /// External (Telegram) user id
    pub tid: i64,
}

#[utoipa::path(
    post,
    path = "/register_user",
    params(RegisterUserQuery),
    responses(
        (status = 200, description = "Existing or newly created user", body = User),
        (status = 400, description = "Bad request", body = ApiErrorResponse),
        (status = 503, description = "Service busy", body = ApiErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(state))]
pub async fn register_user(
    State(state): State<AppState>,
    Query(query): Query<RegisterUserQuery>,
) -> Result<Json<User>, ApiError> {
    let user = with_connection(&state.pool, move |conn| {
        provisioning::register_user(conn, query.tid)
    })
    .await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/users/telegram/{tid}",
    params(
        ("tid" = i64, Path, description = "External (Telegram) user id"),
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = ApiErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(state))]
pub async fn get_user_by_telegram_id(
    State(state): State<AppState>,
    Path(tid): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user = with_connection(&state.pool, move |conn| {
        provisioning::get_user_by_telegram_id(conn, tid)
    })
    .await?;
    Ok(Json(user.into()))
}
