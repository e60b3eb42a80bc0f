use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Json,
    routing::post,
    Router,
};
use menugen_common::api::{ApiErrorResponse, UploadImagesResponse};
use tracing::instrument;

use crate::db::with_connection;
use crate::error::ApiError;
use crate::extract::Path;
use crate::models::NewOrganizationImage;
use crate::provisioning;
use crate::storage::{stored_image_name, BackgroundSlot};

use super::{read_file_field, AppState, MAX_FILES_PER_REQUEST};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/organizations/{id}/images", post(upload_images))
        .route("/organizations/{id}/backgrounds/{slot}", post(upload_background))
}

struct ImageUpload {
    original: String,
    stored: String,
    bytes: Vec<u8>,
}

/// Reads and validates every file field before anything is written.
async fn collect_images(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<Vec<ImageUpload>, ApiError> {
    let mut uploads: Vec<ImageUpload> = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };
        if uploads.len() == MAX_FILES_PER_REQUEST {
            return Err(ApiError::Validation(format!(
                "at most {MAX_FILES_PER_REQUEST} files per upload"
            )));
        }
        let bytes = read_file_field(&mut field, limit).await?;
        let stored = stored_image_name(&original, &bytes)?;
        if uploads.iter().any(|u| u.stored == stored) {
            return Err(ApiError::Validation(format!(
                "{original}: duplicates another file stored as {stored}"
            )));
        }
        uploads.push(ImageUpload {
            original,
            stored,
            bytes,
        });
    }
    Ok(uploads)
}

fn image_kind(stored: &str) -> &'static str {
    if stored == "logo.jpg" {
        "logo"
    } else {
        "menu_item"
    }
}

#[utoipa::path(
    post,
    path = "/organizations/{id}/images",
    params(
        ("id" = i32, Path, description = "Organization id"),
    ),
    request_body(content_type = "multipart/form-data", description = "Images in `files` fields (.jpg, .jpeg or .png)"),
    responses(
        (status = 200, description = "Images stored", body = UploadImagesResponse),
        (status = 400, description = "Invalid image", body = ApiErrorResponse),
        (status = 404, description = "Organization not found", body = ApiErrorResponse),
    ),
    tag = "images"
)]
#[instrument(skip(state, multipart))]
pub async fn upload_images(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadImagesResponse>, ApiError> {
    let mut multipart = multipart?;
    with_connection(&state.pool, move |conn| provisioning::get_organization(conn, id)).await?;

    let uploads = collect_images(&mut multipart, state.config.max_upload_size).await?;
    if uploads.is_empty() {
        return Err(ApiError::Validation("no image files in request".to_string()));
    }

    let mut records = Vec::with_capacity(uploads.len());
    let mut uploaded_images = Vec::with_capacity(uploads.len());
    for upload in uploads {
        state.images.save(id, &upload.stored, upload.bytes).await?;
        records.push(NewOrganizationImage {
            organization_id: id,
            kind: image_kind(&upload.stored).to_string(),
            original_filename: upload.original,
            stored_filename: upload.stored.clone(),
        });
        uploaded_images.push(upload.stored);
    }

    with_connection(&state.pool, move |conn| provisioning::record_images(conn, &records)).await?;
    tracing::info!(org_id = id, count = uploaded_images.len(), "Stored images");

    Ok(Json(UploadImagesResponse { uploaded_images }))
}

#[utoipa::path(
    post,
    path = "/organizations/{id}/backgrounds/{slot}",
    params(
        ("id" = i32, Path, description = "Organization id"),
        ("slot" = String, Path, description = "One of page, header, footer"),
    ),
    request_body(content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 200, description = "Background stored", body = UploadImagesResponse),
        (status = 400, description = "Unknown slot or invalid image", body = ApiErrorResponse),
        (status = 404, description = "Organization not found", body = ApiErrorResponse),
    ),
    tag = "images"
)]
#[instrument(skip(state, multipart))]
pub async fn upload_background(
    State(state): State<AppState>,
    Path((id, slot)): Path<(i32, String)>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadImagesResponse>, ApiError> {
    let mut multipart = multipart?;
    let slot: BackgroundSlot = slot.parse()?;
    with_connection(&state.pool, move |conn| provisioning::get_organization(conn, id)).await?;

    let mut uploads = collect_images(&mut multipart, state.config.max_upload_size).await?;
    if uploads.len() != 1 {
        return Err(ApiError::Validation(
            "exactly one background image is expected".to_string(),
        ));
    }
    let upload = uploads.remove(0);
    let stored = slot.file_name();
    state.images.save(id, &stored, upload.bytes).await?;

    let record = NewOrganizationImage {
        organization_id: id,
        kind: "background".to_string(),
        original_filename: upload.original,
        stored_filename: stored.clone(),
    };
    with_connection(&state.pool, move |conn| provisioning::record_images(conn, &[record]))
        .await?;
    tracing::info!(org_id = id, %slot, "Stored background");

    Ok(Json(UploadImagesResponse {
        uploaded_images: vec![stored],
    }))
}
