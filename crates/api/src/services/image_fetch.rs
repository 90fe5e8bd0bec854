//! Remote image download into data URLs.
//!
//! Backgrounds chosen from place search are plain web URLs, while the
//! generative service only accepts inline image data. A URL is fetched
//! directly first and through the configured proxy second; a response only
//! counts when it is an `image/*` body larger than the configured minimum,
//! which screens out error pages and tracking pixels.

use std::time::Duration;

use reqwest::Client;
use shared::image::{is_data_url, preview, DataUrl};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ImageSearchConfig;

#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("Unable to load the image from {0}")]
    Unavailable(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Downloads images and converts them to data URLs.
#[derive(Clone)]
pub struct ImageFetcher {
    client: Client,
    proxy_url: String,
    min_image_bytes: usize,
}

impl ImageFetcher {
    pub fn new(config: &ImageSearchConfig) -> Result<Self, ImageFetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            proxy_url: config.proxy_url.clone(),
            min_image_bytes: config.min_image_bytes,
        })
    }

    /// Returns a data URL for the image. Data URLs are passed through.
    pub async fn fetch_data_url(&self, url: &str) -> Result<String, ImageFetchError> {
        if is_data_url(url) {
            return Ok(url.to_string());
        }

        debug!(url = %preview(url), "Fetching image");

        if let Some(data_url) = self.try_fetch(url).await {
            return Ok(data_url);
        }

        if let Some(proxied) = self.proxied_url(url) {
            if let Some(data_url) = self.try_fetch(&proxied).await {
                return Ok(data_url);
            }
            warn!(url = %preview(url), "Proxy attempt failed");
        }

        Err(ImageFetchError::Unavailable(preview(url)))
    }

    /// Proxy address for a target URL, or None when no proxy is configured.
    pub fn proxied_url(&self, url: &str) -> Option<String> {
        if self.proxy_url.trim().is_empty() {
            return None;
        }
        let mut proxied = reqwest::Url::parse(&self.proxy_url).ok()?;
        proxied.query_pairs_mut().append_pair("url", url);
        Some(proxied.to_string())
    }

    async fn try_fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!(status = %resp.status(), "Image fetch returned error status");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "Image fetch failed");
                return None;
            }
        };

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await.ok()?;
        if !self.is_valid_image(&mime_type, bytes.len()) {
            debug!(
                mime_type = %mime_type,
                size = bytes.len(),
                "Discarding response that is not a usable image"
            );
            return None;
        }

        Some(DataUrl::from_bytes(mime_type, &bytes).to_string())
    }

    fn is_valid_image(&self, mime_type: &str, size: usize) -> bool {
        mime_type.starts_with("image/") && size > self.min_image_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(proxy_url: &str) -> ImageFetcher {
        let config = ImageSearchConfig {
            proxy_url: proxy_url.to_string(),
            ..ImageSearchConfig::default()
        };
        ImageFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_data_url_passes_through() {
        let data_url = "data:image/png;base64,iVBORw0KGgo=";
        let result = fetcher("").fetch_data_url(data_url).await.unwrap();
        assert_eq!(result, data_url);
    }

    #[test]
    fn test_proxied_url_encodes_target() {
        let proxied = fetcher("https://proxy.example/")
            .proxied_url("https://img.example/a b.jpg?x=1")
            .unwrap();
        assert_eq!(
            proxied,
            "https://proxy.example/?url=https%3A%2F%2Fimg.example%2Fa+b.jpg%3Fx%3D1"
        );
    }

    #[test]
    fn test_no_proxy_when_unconfigured() {
        assert!(fetcher("").proxied_url("https://img.example/a.jpg").is_none());
        assert!(fetcher("   ").proxied_url("https://img.example/a.jpg").is_none());
    }

    #[test]
    fn test_is_valid_image_requires_image_type_and_size() {
        let f = fetcher("");
        assert!(f.is_valid_image("image/jpeg", 2001));
        assert!(!f.is_valid_image("image/jpeg", 2000));
        assert!(!f.is_valid_image("text/html", 50_000));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_unavailable() {
        let err = fetcher("")
            .fetch_data_url("http://127.0.0.1:9/missing.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageFetchError::Unavailable(_)));
    }
}
