//! Uploaded image storage.
//!
//! Files live under `{root}/{org_id}/` and are published under
//! `{public_base}/files/{org_id}/`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use menugen_common::files::write_atomic;

use crate::error::ApiError;
use crate::naming::{extension, image_file_name};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundSlot {
    Page,
    Header,
    Footer,
}

impl BackgroundSlot {
    pub const ALL: [BackgroundSlot; 3] = [Self::Page, Self::Header, Self::Footer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Header => "header",
            Self::Footer => "footer",
        }
    }

    pub fn file_name(&self) -> String {
        format!("background_{}.jpg", self.as_str())
    }
}

impl fmt::Display for BackgroundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackgroundSlot {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "page" => Ok(Self::Page),
            "header" => Ok(Self::Header),
            "footer" => Ok(Self::Footer),
            other => Err(ApiError::Validation(format!(
                "unknown background slot {other:?}, expected page, header or footer"
            ))),
        }
    }
}

/// Checks an uploaded image and returns the name it is stored under.
pub fn stored_image_name(original: &str, bytes: &[u8]) -> Result<String, ApiError> {
    let ext = extension(original).unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::Validation(format!(
            "{original}: only .jpg, .jpeg and .png images are accepted"
        )));
    }
    if bytes.is_empty() {
        return Err(ApiError::Validation(format!("{original}: file is empty")));
    }
    image_file_name(original)
        .ok_or_else(|| ApiError::Validation(format!("{original}: invalid file name")))
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    public_base: String,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn org_dir(&self, org_id: i32) -> PathBuf {
        self.root.join(org_id.to_string())
    }

    pub async fn save(&self, org_id: i32, file_name: &str, bytes: Vec<u8>) -> Result<(), ApiError> {
        let path = write_atomic(&self.org_dir(org_id), file_name, bytes).await?;
        tracing::debug!(org_id, path = %path.display(), "Stored image");
        Ok(())
    }

    pub fn public_url(&self, org_id: i32, file_name: &str) -> String {
        format!("{}/files/{org_id}/{file_name}", self.public_base)
    }

    /// Public URL of `file_name` if it has been uploaded.
    pub async fn url_if_exists(&self, org_id: i32, file_name: &str) -> Option<String> {
        let path = self.org_dir(org_id).join(file_name);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(self.public_url(org_id, file_name)),
            _ => None,
        }
    }
}
