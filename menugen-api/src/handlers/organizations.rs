use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use menugen_common::api::{ApiErrorResponse, Organization};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::db::with_connection;
use crate::error::ApiError;
use crate::extract::{Form, Path, Query};
use crate::provisioning::{self, Page};

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations",
            post(create_organization).get(list_organizations),
        )
        .route("/organizations/{id}", get(get_organization))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrganizationForm {
    /// Display name of the organization
    pub name: String,
    /// Optional description shown on the menu page
    #[serde(default)]
    pub description: Option<String>,
    /// Internal id of the owning user
    pub owner_id: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListOrganizationsQuery {
    /// Only organizations of this owner
    pub owner_id: Option<i32>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/organizations",
    request_body(content = CreateOrganizationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Organization created", body = Organization),
        (status = 400, description = "Empty name or unknown owner", body = ApiErrorResponse),
        (status = 409, description = "Menu name collision", body = ApiErrorResponse),
        (status = 503, description = "Service busy", body = ApiErrorResponse),
    ),
    tag = "organizations"
)]
#[instrument(skip(state))]
pub async fn create_organization(
    State(state): State<AppState>,
    Form(form): Form<CreateOrganizationForm>,
) -> Result<Json<Organization>, ApiError> {
    let organization = with_connection(&state.pool, move |conn| {
        provisioning::create_organization(
            conn,
            &form.name,
            form.description.as_deref(),
            form.owner_id,
        )
    })
    .await?;
    Ok(Json(organization.into()))
}

#[utoipa::path(
    get,
    path = "/organizations",
    params(ListOrganizationsQuery),
    responses(
        (status = 200, description = "Organizations", body = Vec<Organization>),
        (status = 400, description = "Invalid pagination", body = ApiErrorResponse),
    ),
    tag = "organizations"
)]
#[instrument(skip(state))]
pub async fn list_organizations(
    State(state): State<AppState>,
    Query(query): Query<ListOrganizationsQuery>,
) -> Result<Json<Vec<Organization>>, ApiError> {
    let page = Page::new(query.skip, query.limit)?;
    let organizations = with_connection(&state.pool, move |conn| {
        provisioning::list_organizations(conn, query.owner_id, page)
    })
    .await?;
    Ok(Json(organizations.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/organizations/{id}",
    params(
        ("id" = i32, Path, description = "Organization id"),
    ),
    responses(
        (status = 200, description = "Organization found", body = Organization),
        (status = 404, description = "Organization not found", body = ApiErrorResponse),
    ),
    tag = "organizations"
)]
#[instrument(skip(state))]
pub async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Organization>, ApiError> {
    let organization =
        with_connection(&state.pool, move |conn| provisioning::get_organization(conn, id)).await?;
    Ok(Json(organization.into()))
}
