//! Published pages, keyed by organization and theme.

use std::path::{Path, PathBuf};

use menugen_common::files::{write_new, WriteOutcome};
use menugen_common::page::{PageRequest, PageResponse, PageStatus};

use crate::error::GeneratorError;
use crate::render::render_page;
use crate::themes::ThemeMap;

const PAGE_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub struct PageStore {
    root: PathBuf,
    base_url: String,
}

impl PageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn page_dir(&self, org_id: i32, theme: &str) -> PathBuf {
        self.root.join(org_id.to_string()).join(theme)
    }

    pub fn page_path(&self, org_id: i32, theme: &str) -> PathBuf {
        self.page_dir(org_id, theme).join(PAGE_FILE)
    }

    pub fn page_url(&self, org_id: i32, theme: &str) -> String {
        format!("{}/pages/{org_id}/{theme}/{PAGE_FILE}", self.base_url)
    }

    pub async fn exists(&self, org_id: i32, theme: &str) -> bool {
        tokio::fs::try_exists(self.page_path(org_id, theme))
            .await
            .unwrap_or(false)
    }

    pub async fn publish(
        &self,
        org_id: i32,
        theme: &str,
        html: String,
    ) -> std::io::Result<WriteOutcome> {
        write_new(&self.page_dir(org_id, theme), PAGE_FILE, html.into_bytes()).await
    }
}

/// Renders and publishes the page for `(org_id, theme)` unless it already
/// exists.
pub async fn generate_page(
    store: &PageStore,
    themes: &ThemeMap,
    themes_base_url: &str,
    request: &PageRequest,
) -> Result<PageResponse, GeneratorError> {
    let Some(theme) = themes.get(&request.theme) else {
        return Err(GeneratorError::ThemeNotFound(request.theme.clone()));
    };
    if request.org_id <= 0 {
        return Err(GeneratorError::InvalidRequest(format!(
            "invalid organization id {}",
            request.org_id
        )));
    }

    let url = store.page_url(request.org_id, &theme.id);
    if store.exists(request.org_id, &theme.id).await {
        tracing::debug!(org_id = request.org_id, theme = %theme.id, "Page already published");
        return Ok(PageResponse {
            status: PageStatus::Exists,
            url,
        });
    }

    let html = render_page(request, theme, themes_base_url)?;
    let status = match store.publish(request.org_id, &theme.id, html).await? {
        WriteOutcome::Written => {
            tracing::info!(org_id = request.org_id, theme = %theme.id, "Published page");
            PageStatus::Generated
        }
        WriteOutcome::AlreadyExists => PageStatus::Exists,
    };

    Ok(PageResponse { status, url })
}

/// The page already published for `(org_id, theme)`. Nothing is rendered.
pub async fn find_page(
    store: &PageStore,
    themes: &ThemeMap,
    org_id: i32,
    theme_id: &str,
) -> Result<PageResponse, GeneratorError> {
    let Some(theme) = themes.get(theme_id) else {
        return Err(GeneratorError::ThemeNotFound(theme_id.to_string()));
    };
    if !store.exists(org_id, &theme.id).await {
        return Err(GeneratorError::PageNotFound {
            org_id,
            theme: theme.id.clone(),
        });
    }
    Ok(PageResponse {
        status: PageStatus::Exists,
        url: store.page_url(org_id, &theme.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_paths_include_theme() {
        let store = PageStore::new("/srv/pages", "https://menu.example");

        assert_eq!(
            store.page_path(12, "dark"),
            PathBuf::from("/srv/pages/12/dark/index.html")
        );
        assert_eq!(
            store.page_url(12, "dark"),
            "https://menu.example/pages/12/dark/index.html"
        );
    }
}
