//! Types exchanged with the generative stylist during try-on and composition.

use serde::{Deserialize, Serialize};

/// Model quality selector offered to the user.
///
/// `Flash` is the fast tier ("2.5"), `Pro` the high-quality tier ("3.0").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[serde(alias = "2.5")]
    Flash,
    #[default]
    #[serde(alias = "3.0")]
    Pro,
}

impl ModelTier {
    /// Version label shown next to the tier toggle.
    pub fn version_label(&self) -> &'static str {
        match self {
            ModelTier::Flash => "2.5",
            ModelTier::Pro => "3.0",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.version_label())
    }
}

/// Phase 1 input: one member photo and the garment they should wear.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSubject {
    pub member_id: String,
    pub member_image: String,
    pub garment_image: String,
    /// Category label used in the prompt, e.g. "Tops".
    pub garment_category: String,
}

/// Phase 1 output: the member wearing the garment on a plain background.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DressedImage {
    pub member_id: String,
    pub image: String,
}

/// Phase 2 input: a member image, dressed if available, else the original photo.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSubject {
    pub member_id: String,
    pub image: String,
}

/// Final composited image plus what is needed for the before/after view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub generated_image: String,
    /// Background the scene was composed onto, if one was chosen.
    pub original_image: Option<String>,
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_tier_default_is_pro() {
        assert_eq!(ModelTier::default(), ModelTier::Pro);
    }

    #[test]
    fn test_model_tier_serde_names_and_aliases() {
        assert_eq!(serde_json::to_string(&ModelTier::Flash).unwrap(), "\"flash\"");
        let tier: ModelTier = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(tier, ModelTier::Flash);
        let tier: ModelTier = serde_json::from_str("\"3.0\"").unwrap();
        assert_eq!(tier, ModelTier::Pro);
        let tier: ModelTier = serde_json::from_str("\"pro\"").unwrap();
        assert_eq!(tier, ModelTier::Pro);
    }

    #[test]
    fn test_model_tier_display() {
        assert_eq!(ModelTier::Flash.to_string(), "2.5");
        assert_eq!(ModelTier::Pro.to_string(), "3.0");
    }
}
