//! Real-world locations suggested by place search.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Prefix marking a synthetic query produced by a map click.
pub const COORDS_QUERY_PREFIX: &str = "COORDS:";

/// A location candidate returned by place search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    /// Representative photos found by image search; may be empty.
    pub image_urls: Vec<String>,
    pub suggested_attire: String,
    pub best_time: String,
    pub tips: String,
}

/// Structured place as emitted by the generative service, before ids and
/// images are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCandidate {
    pub name: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub suggested_attire: String,
    pub best_time: String,
    pub tips: String,
}

impl PlaceCandidate {
    /// Name reduced to ASCII letters, digits and spaces for image search.
    pub fn search_name(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == ' ' { c } else { ' ' })
            .collect()
    }

    pub fn into_place(self, id: String, image_urls: Vec<String>) -> Place {
        Place {
            id,
            name: self.name,
            description: self.description,
            lat: self.lat,
            lng: self.lng,
            image_urls,
            suggested_attire: self.suggested_attire,
            best_time: self.best_time,
            tips: self.tips,
        }
    }
}

/// Map viewport centre and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MapLocation {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,
    #[validate(custom(function = "shared::validation::validate_zoom"))]
    pub zoom: f64,
}

impl MapLocation {
    pub fn new(lat: f64, lng: f64, zoom: f64) -> Self {
        Self { lat, lng, zoom }
    }
}

impl Default for MapLocation {
    /// Hoan Kiem, Hanoi.
    fn default() -> Self {
        Self {
            lat: 21.0285,
            lng: 105.8542,
            zoom: 14.0,
        }
    }
}

/// Builds the synthetic query for a map click at the given coordinates.
pub fn coords_query(lat: f64, lng: f64) -> String {
    format!("{}{},{}", COORDS_QUERY_PREFIX, lat, lng)
}

/// Returns the coordinate part of a map-click query, if it is one.
pub fn parse_coords_query(query: &str) -> Option<&str> {
    query.strip_prefix(COORDS_QUERY_PREFIX)
}
