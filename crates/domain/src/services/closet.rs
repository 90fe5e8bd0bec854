//! Closet browsing helpers and built-in catalog constants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{CategoryFilter, Garment, GarmentCategory};

/// Swatch offered by the closet color filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorSwatch {
    pub name: &'static str,
    pub hex: &'static str,
}

pub const COLOR_PALETTE: [ColorSwatch; 6] = [
    ColorSwatch { name: "Black", hex: "#000000" },
    ColorSwatch { name: "White", hex: "#FFFFFF" },
    ColorSwatch { name: "Red", hex: "#EF4444" },
    ColorSwatch { name: "Blue", hex: "#3B82F6" },
    ColorSwatch { name: "Beige", hex: "#D2B48C" },
    ColorSwatch { name: "Green", hex: "#22C55E" },
];

/// Example queries shown under an empty search bar.
pub const SEARCH_SUGGESTIONS: [&str; 4] = [
    "Cafe in Hanoi",
    "Pagoda in Hanoi",
    "Travel place in Hanoi",
    "Street art in Hanoi",
];

/// A garment shipped with a fresh install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultGarment {
    pub id: &'static str,
    pub name: &'static str,
    pub category: GarmentCategory,
    pub url: &'static str,
    pub color: &'static str,
}

/// Tags stamped on every default garment.
pub const DEFAULT_WARDROBE_TAGS: [&str; 2] = ["Default", "Essential"];

pub const DEFAULT_WARDROBE: [DefaultGarment; 2] = [
    DefaultGarment {
        id: "gemini-sweat",
        name: "Gemini Sweat",
        category: GarmentCategory::Tops,
        url: "https://raw.githubusercontent.com/ammaarreshi/app-images/refs/heads/main/gemini-sweat-2.png",
        color: "#000000",
    },
    DefaultGarment {
        id: "gemini-tee",
        name: "Gemini Tee",
        category: GarmentCategory::Tops,
        url: "https://raw.githubusercontent.com/ammaarreshi/app-images/refs/heads/main/Gemini-tee.png",
        color: "#FFFFFF",
    },
];

impl DefaultGarment {
    /// Build the closet entry once the picture has been fetched.
    pub fn into_garment(self, image_data: String) -> Garment {
        Garment {
            id: self.id.to_string(),
            name: self.name.to_string(),
            category: self.category,
            image_data,
            color: Some(self.color.to_string()),
            tags: Some(DEFAULT_WARDROBE_TAGS.iter().map(|t| t.to_string()).collect()),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Closet browsing filter. Every criterion left empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClosetFilter {
    #[serde(skip)]
    pub category: CategoryFilter,
    /// Compared case-insensitively.
    pub color: Option<String>,
    pub tag: Option<String>,
}

impl ClosetFilter {
    pub fn matches(&self, garment: &Garment) -> bool {
        let category_ok = self.category.matches(garment.category);

        let color_ok = match self.color.as_deref().filter(|c| !c.is_empty()) {
            None => true,
            Some(wanted) => garment
                .color
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(wanted))
                .unwrap_or(false),
        };

        let tag_ok = match self.tag.as_deref().filter(|t| !t.is_empty()) {
            None => true,
            Some(wanted) => garment.tags().iter().any(|t| t == wanted),
        };

        category_ok && color_ok && tag_ok
    }

    pub fn apply<'a>(&self, garments: &'a [Garment]) -> Vec<&'a Garment> {
        garments.iter().filter(|g| self.matches(g)).collect()
    }
}

/// Every tag used in the closet, sorted and deduplicated.
pub fn distinct_tags(garments: &[Garment]) -> Vec<String> {
    garments
        .iter()
        .flat_map(|g| g.tags().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
