//! Squad member domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::render::ModelTier;

/// A person in the squad, identified by one reference photo.
///
/// Members are created on upload and deleted on request; they are never
/// edited in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    /// Reference photo as an image data URL.
    pub photo_data: String,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(name: impl Into<String>, photo_data: impl Into<String>) -> Self {
        Self {
            id: shared::ids::member_id(),
            name: name.into(),
            photo_data: photo_data.into(),
            created_at: Utc::now(),
        }
    }
}

/// Request payload for adding a member to the squad.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_image_data_url"))]
    pub photo_data: String,

    /// Custom pose instructions for the base-model regeneration.
    #[validate(length(max = 500, message = "Instructions must be at most 500 characters"))]
    pub instructions: Option<String>,

    #[serde(default)]
    pub tier: ModelTier,

    /// Regenerate the photo into a full-body studio model before saving.
    #[serde(default = "default_enhance")]
    pub enhance: bool,
}

fn default_enhance() -> bool {
    true
}
