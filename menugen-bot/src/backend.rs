//! Calls from the bot to the menu API.

use std::time::Duration;

use async_trait::async_trait;
use menugen_common::api::{
    GenerateMenuRequest, MenuItem, Organization, ThemesResponse, UploadImagesResponse,
    UploadMenuResponse, User,
};
use menugen_common::page::PageResponse;
use menugen_common::{send_with_retry, HttpError, RetryPolicy};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::fsm::BackgroundSlot;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::NotFound(message) => format!("Not found: {message}"),
            BackendError::Rejected(message) => format!("Request rejected: {message}"),
            BackendError::Unavailable(_) => {
                "The service is temporarily unavailable, please try again later.".to_string()
            }
        }
    }
}

impl From<HttpError> for BackendError {
    fn from(e: HttpError) -> Self {
        let message = e.upstream_message().unwrap_or_else(|| e.to_string());
        match e.status() {
            Some(StatusCode::NOT_FOUND) => BackendError::NotFound(message),
            Some(status) if status.is_client_error() => BackendError::Rejected(message),
            _ => BackendError::Unavailable(message),
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Registers the user, returning the existing record on repeat calls.
    async fn register_user(&self, telegram_id: i64) -> Result<User, BackendError>;

    async fn create_organization(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: i32,
    ) -> Result<Organization, BackendError>;

    async fn get_organization(&self, org_id: i32) -> Result<Organization, BackendError>;

    async fn list_organizations(&self, owner_id: i32) -> Result<Vec<Organization>, BackendError>;

    async fn list_menu(&self, org_id: i32) -> Result<Vec<MenuItem>, BackendError>;

    async fn upload_menu(
        &self,
        org_id: i32,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadMenuResponse, BackendError>;

    async fn upload_image(
        &self,
        org_id: i32,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadImagesResponse, BackendError>;

    async fn upload_background(
        &self,
        org_id: i32,
        slot: BackgroundSlot,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadImagesResponse, BackendError>;

    async fn themes(&self) -> Result<ThemesResponse, BackendError>;

    async fn generate_page(&self, org_id: i32, theme: &str) -> Result<PageResponse, BackendError>;
}

/// [`Backend`] over the menu API's HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T, F>(&self, build: F) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        self.send_with(self.retry, build).await
    }

    /// Sends a request that must not be repeated, such as one creating a
    /// record. A timeout may hide a request the server already applied.
    async fn send_once<T, F>(&self, build: F) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        self.send_with(RetryPolicy::no_delay(1), build).await
    }

    async fn send_with<T, F>(&self, retry: RetryPolicy, build: F) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        let response = send_with_retry(retry, build).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Unavailable(format!("invalid response: {e}")))
    }

    fn file_form(field: &'static str, file_name: &str, bytes: &[u8]) -> Form {
        let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        Form::new().part(field, part)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn register_user(&self, telegram_id: i64) -> Result<User, BackendError> {
        let url = self.url("/register_user");
        self.send(|| self.http.post(&url).query(&[("tid", telegram_id)]))
            .await
    }

    async fn create_organization(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: i32,
    ) -> Result<Organization, BackendError> {
        let url = self.url("/organizations");
        let owner_id = owner_id.to_string();
        let mut form = vec![("name", name), ("owner_id", owner_id.as_str())];
        if let Some(description) = description {
            form.push(("description", description));
        }
        self.send_once(|| self.http.post(&url).form(&form)).await
    }

    async fn get_organization(&self, org_id: i32) -> Result<Organization, BackendError> {
        let url = self.url(&format!("/organizations/{org_id}"));
        self.send(|| self.http.get(&url)).await
    }

    async fn list_organizations(&self, owner_id: i32) -> Result<Vec<Organization>, BackendError> {
        let url = self.url("/organizations");
        self.send(|| self.http.get(&url).query(&[("owner_id", owner_id)]))
            .await
    }

    async fn list_menu(&self, org_id: i32) -> Result<Vec<MenuItem>, BackendError> {
        let url = self.url(&format!("/organizations/{org_id}/menu"));
        self.send(|| self.http.get(&url).query(&[("limit", 1000)]))
            .await
    }

    async fn upload_menu(
        &self,
        org_id: i32,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadMenuResponse, BackendError> {
        let url = self.url(&format!("/organizations/{org_id}/menu"));
        self.send(|| {
            self.http
                .post(&url)
                .multipart(Self::file_form("file", file_name, &bytes))
        })
        .await
    }

    async fn upload_image(
        &self,
        org_id: i32,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadImagesResponse, BackendError> {
        let url = self.url(&format!("/organizations/{org_id}/images"));
        self.send(|| {
            self.http
                .post(&url)
                .multipart(Self::file_form("files", file_name, &bytes))
        })
        .await
    }

    async fn upload_background(
        &self,
        org_id: i32,
        slot: BackgroundSlot,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadImagesResponse, BackendError> {
        let url = self.url(&format!("/organizations/{org_id}/backgrounds/{slot}"));
        self.send(|| {
            self.http
                .post(&url)
                .multipart(Self::file_form("file", file_name, &bytes))
        })
        .await
    }

    async fn themes(&self) -> Result<ThemesResponse, BackendError> {
        let url = self.url("/themes");
        self.send(|| self.http.get(&url)).await
    }

    async fn generate_page(&self, org_id: i32, theme: &str) -> Result<PageResponse, BackendError> {
        let url = self.url(&format!("/organizations/{org_id}/menu/generate"));
        let request = GenerateMenuRequest {
            theme: theme.to_string(),
        };
        self.send(|| self.http.post(&url).json(&request)).await
    }
}
