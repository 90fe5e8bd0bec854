//! Closet garment domain model.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::render::ModelTier;

/// Garment categories the closet is organised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GarmentCategory {
    #[default]
    Tops,
    Bottoms,
    Outerwear,
    Shoes,
    Accessories,
}

impl GarmentCategory {
    pub const ALL: [GarmentCategory; 5] = [
        GarmentCategory::Tops,
        GarmentCategory::Bottoms,
        GarmentCategory::Outerwear,
        GarmentCategory::Shoes,
        GarmentCategory::Accessories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GarmentCategory::Tops => "Tops",
            GarmentCategory::Bottoms => "Bottoms",
            GarmentCategory::Outerwear => "Outerwear",
            GarmentCategory::Shoes => "Shoes",
            GarmentCategory::Accessories => "Accessories",
        }
    }
}

impl std::fmt::Display for GarmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown garment category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for GarmentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GarmentCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Closet browsing filter: every category, or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(GarmentCategory),
}

impl CategoryFilter {
    pub fn matches(&self, category: GarmentCategory) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

/// A clothing item in the closet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Garment {
    pub id: String,
    pub name: String,
    pub category: GarmentCategory,
    /// Reference picture as an image data URL.
    pub image_data: String,
    pub color: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl Garment {
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }
}

/// Where a garment analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    #[default]
    Model,
    /// The classifier failed and the safe default was substituted.
    Fallback,
}

/// Category, dominant color and descriptive tags inferred from a picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarmentAnalysis {
    pub category: GarmentCategory,
    pub color: Option<String>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: AnalysisSource,
}

impl GarmentAnalysis {
    /// Safe default used when classification is unavailable.
    pub fn fallback() -> Self {
        Self {
            category: GarmentCategory::Tops,
            color: None,
            tags: vec!["Uploaded".to_string()],
            source: AnalysisSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == AnalysisSource::Fallback
    }
}

/// Request payload for adding a garment to the closet.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGarmentRequest {
    #[validate(length(min = 1, max = 80, message = "Name must be between 1 and 80 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_image_data_url"))]
    pub image_data: String,

    /// Free-text hint passed to the classifier, e.g. "linen summer shirt".
    #[validate(length(max = 200, message = "Hint must be at most 200 characters"))]
    pub hint: Option<String>,

    #[serde(default)]
    pub tier: ModelTier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_capitalized() {
        let json = serde_json::to_string(&GarmentCategory::Outerwear).unwrap();
        assert_eq!(json, "\"Outerwear\"");
    }

    #[test]
    fn test_category_from_str_case_insensitive() {
        assert_eq!("shoes".parse::<GarmentCategory>().unwrap(), GarmentCategory::Shoes);
        assert_eq!(" Tops ".parse::<GarmentCategory>().unwrap(), GarmentCategory::Tops);
        assert!("All".parse::<GarmentCategory>().is_err());
        assert!("Hats".parse::<GarmentCategory>().is_err());
    }

    #[test]
    fn test_category_filter_parse_and_match() {
        let all: CategoryFilter = "All".parse().unwrap();
        assert!(all.matches(GarmentCategory::Shoes));

        let bottoms: CategoryFilter = "Bottoms".parse().unwrap();
        assert!(bottoms.matches(GarmentCategory::Bottoms));
        assert!(!bottoms.matches(GarmentCategory::Tops));
    }

    #[test]
    fn test_analysis_fallback() {
        let analysis = GarmentAnalysis::fallback();
        assert_eq!(analysis.category, GarmentCategory::Tops);
        assert_eq!(analysis.tags, vec!["Uploaded".to_string()]);
        assert!(analysis.color.is_none());
        assert!(analysis.is_fallback());
    }

    #[test]
    fn test_garment_tags_accessor() {
        let mut garment = Garment {
            id: "c1".to_string(),
            name: "Tee".to_string(),
            category: GarmentCategory::Tops,
            image_data: "data:image/png;base64,AAAA".to_string(),
            color: None,
            tags: None,
            created_at: Utc::now(),
        };
        assert!(garment.tags().is_empty());

        garment.tags = Some(vec!["Cotton".to_string()]);
        assert_eq!(garment.tags(), &["Cotton".to_string()]);
    }

    #[test]
    fn test_create_garment_request_validation() {
        let request = CreateGarmentRequest {
            name: "Denim".to_string(),
            image_data: "data:image/jpeg;base64,/9j/".to_string(),
            hint: Some("blue jeans".to_string()),
            tier: ModelTier::Flash,
        };
        assert!(request.validate().is_ok());

        let bad = CreateGarmentRequest {
            image_data: "not-an-image".to_string(),
            ..request
        };
        assert!(bad.validate().is_err());
    }
}
