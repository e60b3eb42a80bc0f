//! Client of the page-generation service and assembly of its payload.

use std::time::Duration;

use menugen_common::api::ThemesResponse;
use menugen_common::page::{
    CategorySection, OrganizationMeta, PageItem, PageRequest, PageResponse,
};
use menugen_common::{group_by_category, send_with_retry, HttpError, RetryPolicy};
use reqwest::StatusCode;

use crate::error::ApiError;
use crate::models::{MenuItem, Organization};
use crate::naming::image_file_name;
use crate::storage::{BackgroundSlot, ImageStore};

#[derive(Debug, Clone)]
pub struct GeneratorClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GeneratorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn generate(&self, request: &PageRequest) -> Result<PageResponse, ApiError> {
        let url = format!("{}/generate", self.base_url);
        let response = send_with_retry(self.retry, || self.http.post(&url).json(request))
            .await
            .map_err(upstream_error)?;
        response
            .json::<PageResponse>()
            .await
            .map_err(|e| ApiError::Unavailable(format!("invalid generator response: {e}")))
    }

    /// URL of the page already published for `(org_id, theme)`.
    pub async fn lookup(&self, org_id: i32, theme: &str) -> Result<PageResponse, ApiError> {
        let url = format!("{}/published/{org_id}/{theme}", self.base_url);
        let response = send_with_retry(self.retry, || self.http.get(&url))
            .await
            .map_err(upstream_error)?;
        response
            .json::<PageResponse>()
            .await
            .map_err(|e| ApiError::Unavailable(format!("invalid generator response: {e}")))
    }

    pub async fn themes(&self) -> Result<ThemesResponse, ApiError> {
        let url = format!("{}/themes", self.base_url);
        let response = send_with_retry(self.retry, || self.http.get(&url))
            .await
            .map_err(upstream_error)?;
        response
            .json::<ThemesResponse>()
            .await
            .map_err(|e| ApiError::Unavailable(format!("invalid generator response: {e}")))
    }
}

fn upstream_error(e: HttpError) -> ApiError {
    let message = e.upstream_message().unwrap_or_else(|| e.to_string());
    match e.status() {
        Some(StatusCode::NOT_FOUND) => ApiError::NotFound(message),
        Some(StatusCode::BAD_REQUEST) | Some(StatusCode::UNPROCESSABLE_ENTITY) => {
            ApiError::Validation(message)
        }
        _ => {
            tracing::warn!("Page generator unavailable: {e}");
            ApiError::Unavailable("page generator is unavailable".to_string())
        }
    }
}

/// Public URLs of an organization's uploaded files, resolved before the
/// payload is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageAssets {
    pub page_background: Option<String>,
    pub header_background: Option<String>,
    pub footer_background: Option<String>,
    /// Indexed like the items passed to [`resolve_page_assets`]
    pub item_images: Vec<Option<String>>,
}

pub async fn resolve_page_assets(
    store: &ImageStore,
    org_id: i32,
    items: &[MenuItem],
) -> PageAssets {
    let mut assets = PageAssets {
        item_images: Vec::with_capacity(items.len()),
        ..Default::default()
    };
    for slot in BackgroundSlot::ALL {
        let url = store.url_if_exists(org_id, &slot.file_name()).await;
        match slot {
            BackgroundSlot::Page => assets.page_background = url,
            BackgroundSlot::Header => assets.header_background = url,
            BackgroundSlot::Footer => assets.footer_background = url,
        }
    }
    for item in items {
        let url = match item.image_name.as_deref().and_then(image_file_name) {
            Some(file_name) => store.url_if_exists(org_id, &file_name).await,
            None => None,
        };
        assets.item_images.push(url);
    }
    assets
}

/// Builds the generator payload. Categories appear in the order they are first
/// seen in `items`.
pub fn build_page_request(
    organization: &Organization,
    theme: &str,
    items: Vec<MenuItem>,
    assets: PageAssets,
) -> PageRequest {
    let PageAssets {
        page_background,
        header_background,
        footer_background,
        item_images,
    } = assets;

    let entries = items
        .into_iter()
        .zip(item_images.into_iter().chain(std::iter::repeat(None)))
        .map(|(item, image_url)| {
            let category = item.category;
            let entry = PageItem {
                name: item.name,
                price: item.price.with_scale(2).to_string(),
                description: item.description,
                subcategory: item.subcategory,
                image_url,
            };
            (category, entry)
        });

    let content = group_by_category(entries, |(category, _)| category.as_str())
        .into_iter()
        .map(|(category, entries)| CategorySection {
            category,
            items: entries.into_iter().map(|(_, item)| item).collect(),
        })
        .collect();

    PageRequest {
        org_id: organization.id,
        page_name: organization.menu_table_name.clone(),
        title: organization.name.clone(),
        description: organization.description.clone(),
        theme: theme.to_string(),
        content,
        page_background,
        header_background,
        footer_background,
        organization: OrganizationMeta {
            title: organization.name.clone(),
            description: organization.description.clone(),
            footer_text: Some(format!("© {}", organization.name)),
        },
    }
}
