//! Theme registry.
//!
//! Themes come from a JSON document mapping stylesheet file names to display
//! names, e.g. `{"modern-dark.css": "Modern Dark"}`. The theme id is the file
//! stem. The registry is loaded at startup and only changes through an explicit
//! [`ThemeRegistry::reload`].

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use menugen_common::{send_with_retry, RetryPolicy};

use crate::error::GeneratorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub id: String,
    pub css_file: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeMap {
    themes: BTreeMap<String, Theme>,
}

impl ThemeMap {
    pub fn builtin() -> Self {
        let themes = [("light", "Light"), ("dark", "Dark")]
            .into_iter()
            .map(|(id, display_name)| {
                let theme = Theme {
                    id: id.to_string(),
                    css_file: format!("{id}.css"),
                    display_name: display_name.to_string(),
                };
                (theme.id.clone(), theme)
            })
            .collect();
        Self { themes }
    }

    /// Builds a map from `{css_file -> display_name}`. Entries whose stem is
    /// not a safe identifier are skipped.
    pub fn from_mapping(mapping: BTreeMap<String, String>) -> Result<Self, GeneratorError> {
        let mut themes = BTreeMap::new();
        for (css_file, display_name) in mapping {
            let id = css_file.strip_suffix(".css").unwrap_or(&css_file).to_string();
            if !is_valid_theme_id(&id) {
                tracing::warn!(%css_file, "Skipping theme with invalid file name");
                continue;
            }
            let display_name = if display_name.trim().is_empty() {
                id.clone()
            } else {
                display_name
            };
            themes.insert(
                id.clone(),
                Theme {
                    id,
                    css_file,
                    display_name,
                },
            );
        }
        if themes.is_empty() {
            return Err(GeneratorError::ThemeSource(
                "theme mapping contains no usable themes".to_string(),
            ));
        }
        Ok(Self { themes })
    }

    pub fn get(&self, id: &str) -> Option<&Theme> {
        self.themes.get(id)
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Theme id mapped to display name, sorted by id.
    pub fn display_names(&self) -> BTreeMap<String, String> {
        self.themes
            .values()
            .map(|t| (t.id.clone(), t.display_name.clone()))
            .collect()
    }
}

pub fn is_valid_theme_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Fetches and parses the theme mapping document.
pub async fn fetch_theme_map(
    http: &reqwest::Client,
    url: &str,
    retry: RetryPolicy,
) -> Result<ThemeMap, GeneratorError> {
    let response = send_with_retry(retry, || http.get(url))
        .await
        .map_err(|e| GeneratorError::ThemeSource(e.to_string()))?;
    let mapping = response
        .json::<BTreeMap<String, String>>()
        .await
        .map_err(|e| GeneratorError::ThemeSource(format!("invalid theme mapping: {e}")))?;
    ThemeMap::from_mapping(mapping)
}

#[derive(Debug)]
pub struct ThemeRegistry {
    current: RwLock<Arc<ThemeMap>>,
    source: Option<String>,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl ThemeRegistry {
    pub fn new(map: ThemeMap) -> Self {
        Self {
            current: RwLock::new(Arc::new(map)),
            source: None,
            http: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Loads themes from `source`, falling back to the built-in set when the
    /// source is unset or unusable.
    pub async fn load(
        source: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, GeneratorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::ThemeSource(e.to_string()))?;

        let map = match source.as_deref() {
            Some(url) => match fetch_theme_map(&http, url, retry).await {
                Ok(map) => {
                    tracing::info!(themes = map.len(), %url, "Loaded themes");
                    map
                }
                Err(e) => {
                    tracing::warn!(%url, "Falling back to built-in themes: {e}");
                    ThemeMap::builtin()
                }
            },
            None => {
                tracing::info!("THEMES_URL not set, using built-in themes");
                ThemeMap::builtin()
            }
        };

        Ok(Self {
            current: RwLock::new(Arc::new(map)),
            source,
            http,
            retry,
        })
    }

    pub fn snapshot(&self) -> Arc<ThemeMap> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Re-fetches the source and swaps in the new map. The current map stays
    /// in place when the fetch fails.
    pub async fn reload(&self) -> Result<Arc<ThemeMap>, GeneratorError> {
        let Some(url) = self.source.as_deref() else {
            return Err(GeneratorError::ThemeSource(
                "no theme source configured".to_string(),
            ));
        };
        let map = Arc::new(fetch_theme_map(&self.http, url, self.retry).await?);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = map.clone();
        tracing::info!(themes = map.len(), "Reloaded themes");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_mapping_uses_file_stem() {
        let map = ThemeMap::from_mapping(mapping(&[
            ("modern-dark.css", "Modern Dark"),
            ("nature.css", "Nature"),
            ("../evil.css", "Evil"),
        ]))
        .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("modern-dark").unwrap().css_file, "modern-dark.css");
        assert!(map.get("../evil").is_none());
        assert_eq!(
            map.display_names().keys().collect::<Vec<_>>(),
            vec!["modern-dark", "nature"]
        );
    }

    #[test]
    fn test_from_mapping_rejects_empty() {
        assert!(ThemeMap::from_mapping(BTreeMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_load_falls_back_to_builtin() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/themes.json")
            .with_status(500)
            .create_async()
            .await;

        let registry = ThemeRegistry::load(
            Some(format!("{}/themes.json", server.url())),
            Duration::from_secs(2),
            RetryPolicy::no_delay(2),
        )
        .await
        .unwrap();

        assert_eq!(*registry.snapshot(), ThemeMap::builtin());
    }

    #[tokio::test]
    async fn test_reload_swaps_and_keeps_old_map_on_failure() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/themes.json", server.url());
        let first = server
            .mock("GET", "/themes.json")
            .with_status(200)
            .with_body(r#"{"vintage.css": "Vintage"}"#)
            .expect(1)
            .create_async()
            .await;

        let registry = ThemeRegistry::load(Some(url), Duration::from_secs(2), RetryPolicy::no_delay(1))
            .await
            .unwrap();
        first.assert_async().await;
        assert!(registry.snapshot().get("vintage").is_some());

        first.remove_async().await;
        let second = server
            .mock("GET", "/themes.json")
            .with_status(200)
            .with_body(r#"{"minimal.css": "Minimal", "futuristic.css": "Futuristic"}"#)
            .expect(1)
            .create_async()
            .await;
        let reloaded = registry.reload().await.unwrap();
        second.assert_async().await;
        assert_eq!(reloaded.len(), 2);
        assert!(registry.snapshot().get("vintage").is_none());

        second.remove_async().await;
        server
            .mock("GET", "/themes.json")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        assert!(registry.reload().await.is_err());
        assert!(registry.snapshot().get("minimal").is_some());
    }
}
