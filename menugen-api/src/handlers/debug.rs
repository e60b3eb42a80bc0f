use axum::{extract::State, response::Json, routing::get, Router};
use menugen_common::api::{ApiErrorResponse, TableData, TableInfo, TableStructure};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use crate::db::{self, with_connection};
use crate::error::ApiError;
use crate::extract::{Path, Query};

use super::AppState;

const DEFAULT_SAMPLE_ROWS: i64 = 5;
const MAX_SAMPLE_ROWS: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/debug/tables", get(debug_tables))
        .route("/debug/tables/{table_name}/structure", get(table_structure))
        .route("/debug/tables/{table_name}/data", get(table_data))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TableDataQuery {
    /// Rows to return, 1 to 100 (default 5)
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/debug/tables",
    responses(
        (status = 200, description = "Tables with columns and row counts", body = Vec<TableInfo>),
        (status = 503, description = "Service busy", body = ApiErrorResponse),
    ),
    tag = "debug"
)]
#[instrument(skip(state))]
pub async fn debug_tables(State(state): State<AppState>) -> Result<Json<Vec<TableInfo>>, ApiError> {
    let tables = with_connection(&state.pool, |conn| Ok(db::debug_tables(conn)?)).await?;
    Ok(Json(tables))
}

#[utoipa::path(
    get,
    path = "/debug/tables/{table_name}/structure",
    params(
        ("table_name" = String, Path, description = "Table of the public schema"),
    ),
    responses(
        (status = 200, description = "Columns of the table", body = TableStructure),
        (status = 404, description = "Table not found", body = ApiErrorResponse),
    ),
    tag = "debug"
)]
#[instrument(skip(state))]
pub async fn table_structure(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
) -> Result<Json<TableStructure>, ApiError> {
    let structure =
        with_connection(&state.pool, move |conn| db::table_structure(conn, &table_name)).await?;
    Ok(Json(structure))
}

#[utoipa::path(
    get,
    path = "/debug/tables/{table_name}/data",
    params(
        ("table_name" = String, Path, description = "Table of the public schema"),
        TableDataQuery,
    ),
    responses(
        (status = 200, description = "Row count and first rows", body = TableData),
        (status = 400, description = "Invalid limit", body = ApiErrorResponse),
        (status = 404, description = "Table not found", body = ApiErrorResponse),
    ),
    tag = "debug"
)]
#[instrument(skip(state))]
pub async fn table_data(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    Query(query): Query<TableDataQuery>,
) -> Result<Json<TableData>, ApiError> {
    let limit = sample_limit(query.limit)?;
    let data =
        with_connection(&state.pool, move |conn| db::table_data(conn, &table_name, limit)).await?;
    Ok(Json(data))
}

fn sample_limit(limit: Option<i64>) -> Result<i64, ApiError> {
    match limit {
        None => Ok(DEFAULT_SAMPLE_ROWS),
        Some(limit) if (1..=MAX_SAMPLE_ROWS).contains(&limit) => Ok(limit),
        Some(limit) => Err(ApiError::Validation(format!(
            "limit must be between 1 and {MAX_SAMPLE_ROWS}, got {limit}"
        ))),
    }
}
