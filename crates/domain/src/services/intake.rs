//! Turning uploads into squad members and closet garments.
//!
//! Both flows always produce an entity. The AI step is an enhancement: when
//! it fails the upload is kept as-is and the user is told why with a toast.

use std::sync::Arc;

use chrono::Utc;

use super::stylist::{StylistError, StylistService};
use super::toast::SharedToasts;
use crate::models::{CreateGarmentRequest, CreateMemberRequest, Garment, Member};

pub const MEMBER_ADDED: &str = "Model added to squad!";
pub const MEMBER_ACCESS_DENIED: &str = "Gemini AI access denied. Using original photo.";
pub const MEMBER_GENERATION_FAILED: &str = "AI Generation failed. Using original photo.";

pub const GARMENT_ADDED: &str = "Garment analyzed & added!";
pub const GARMENT_ACCESS_DENIED: &str = "Gemini AI access denied. Added without analysis.";
pub const GARMENT_ANALYSIS_FAILED: &str = "Analysis failed. Added with default tags.";

/// Color recorded when the analysis names none.
const UNKNOWN_COLOR: &str = "Multi";

pub struct IntakeService {
    stylist: Arc<dyn StylistService>,
    toasts: SharedToasts,
}

impl IntakeService {
    pub fn new(stylist: Arc<dyn StylistService>, toasts: SharedToasts) -> Self {
        Self { stylist, toasts }
    }

    /// Build a member from an upload, regenerating the photo into a studio
    /// portrait when `enhance` is set.
    pub async fn prepare_member(&self, request: CreateMemberRequest) -> Member {
        if !request.enhance {
            self.toasts.success(MEMBER_ADDED);
            return Member::new(request.name, request.photo_data);
        }

        let generated = self
            .stylist
            .generate_base_model(
                &request.photo_data,
                request.instructions.as_deref(),
                request.tier,
            )
            .await;

        match generated {
            Ok(photo) => {
                self.toasts.success(MEMBER_ADDED);
                Member::new(request.name, photo)
            }
            Err(e) => {
                tracing::warn!(error = %e, tier = %request.tier, "Base model generation failed, keeping original photo");
                self.toasts.error(member_failure_message(&e));
                Member::new(request.name, request.photo_data)
            }
        }
    }

    /// Build a garment from an upload, classifying it first.
    pub async fn prepare_garment(&self, request: CreateGarmentRequest) -> Garment {
        let analysis = self
            .stylist
            .analyze_garment(&request.image_data, request.hint.as_deref(), request.tier)
            .await;

        let (category, color, tags) = match analysis {
            Ok(analysis) if !analysis.is_fallback() => {
                self.toasts.success(GARMENT_ADDED);
                (
                    analysis.category,
                    Some(analysis.color.unwrap_or_else(|| UNKNOWN_COLOR.to_string())),
                    analysis.tags,
                )
            }
            Ok(fallback) => {
                self.toasts.error(GARMENT_ANALYSIS_FAILED);
                (fallback.category, fallback.color, fallback.tags)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Garment analysis failed, using default tags");
                self.toasts.error(if e.is_permission_denied() {
                    GARMENT_ACCESS_DENIED
                } else {
                    GARMENT_ANALYSIS_FAILED
                });
                let fallback = crate::models::GarmentAnalysis::fallback();
                (fallback.category, fallback.color, fallback.tags)
            }
        };

        Garment {
            id: shared::ids::garment_id(),
            name: request.name,
            category,
            image_data: request.image_data,
            color,
            tags: Some(tags),
            created_at: Utc::now(),
        }
    }
}

fn member_failure_message(error: &StylistError) -> &'static str {
    if error.is_permission_denied() {
        MEMBER_ACCESS_DENIED
    } else {
        MEMBER_GENERATION_FAILED
    }
}
