//! Place photo lookup.
//!
//! Queries an image search endpoint for "aesthetic photo of <place>" and keeps
//! direct links to common raster formats. Any failure yields no photos; a
//! place without pictures is still a valid search result.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ImageSearchConfig;

lazy_static::lazy_static! {
    static ref IMAGE_LINK_REGEX: regex::Regex =
        regex::Regex::new(r"(?i)\.(jpeg|jpg|png|webp)$").unwrap();
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    link: Option<String>,
}

/// Client for the place photo search endpoint.
#[derive(Clone)]
pub struct ImageSearchClient {
    client: Client,
    url: String,
    max_images: usize,
}

impl ImageSearchClient {
    pub fn new(config: &ImageSearchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            max_images: config.max_images,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Up to `max_images` photo URLs for the place name.
    pub async fn photos_for(&self, place_name: &str) -> Vec<String> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let query = format!("aesthetic photo of {}", place_name.trim());
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query.as_str())])
            .send()
            .await;

        let body = match response {
            Ok(resp) => resp.json::<SearchResponse>().await,
            Err(e) => {
                warn!(error = %e, place = %place_name, "Image search failed");
                return Vec::new();
            }
        };

        match body {
            Ok(body) => {
                let links = extract_links(body, self.max_images);
                debug!(place = %place_name, count = links.len(), "Image search completed");
                links
            }
            Err(e) => {
                warn!(error = %e, place = %place_name, "Image search returned unreadable body");
                Vec::new()
            }
        }
    }
}

fn extract_links(body: SearchResponse, max_images: usize) -> Vec<String> {
    body.items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.link)
        .filter(|link| IMAGE_LINK_REGEX.is_match(link))
        .take(max_images)
        .collect()
}
