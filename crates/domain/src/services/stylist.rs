//! Generative stylist capability.
//!
//! Abstracts the generative-image and place-search backend behind one trait so
//! the studio workflow can be driven by the real service or by a mock.
//!
//! Failure policy per operation:
//! - `dress`, `composite`, `generate_base_model`: errors propagate.
//! - `search_places`: only [`StylistError::ServiceOverloaded`] propagates;
//!   any other failure yields an empty list.
//! - `analyze_garment`, `recommend_attire`: degrade to
//!   [`GarmentAnalysis::fallback`] / an empty list, except
//!   [`StylistError::PermissionDenied`] which propagates.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::{
    DressedImage, Garment, GarmentAnalysis, ModelTier, Place, RenderSubject, SceneSubject,
};

/// Errors raised by the generative stylist.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StylistError {
    /// The service answered but returned no image or content.
    #[error("{0}")]
    GenerationFailure(String),

    /// The selected model tier is not available to this API key.
    #[error("Permission denied for model {0}.")]
    PermissionDenied(ModelTier),

    /// The chosen background could not be fetched directly or via the proxy.
    #[error("Failed to load the selected background scene.")]
    BackgroundLoadFailure,

    #[error("Model overloaded. Please try again later.")]
    ServiceOverloaded,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from generative service: {0}")]
    InvalidResponse(String),

    #[error("Invalid image input: {0}")]
    InvalidInput(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl StylistError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StylistError::PermissionDenied(_))
    }

    pub fn is_overloaded(&self) -> bool {
        matches!(self, StylistError::ServiceOverloaded)
    }
}

/// Generative stylist trait.
#[async_trait::async_trait]
pub trait StylistService: Send + Sync {
    /// Phase 1: render the member wearing the garment on a plain background.
    async fn dress(
        &self,
        subject: &RenderSubject,
        tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<DressedImage, StylistError>;

    /// Phase 2: place every subject into one photorealistic scene.
    async fn composite(
        &self,
        subjects: &[SceneSubject],
        scene_context: &str,
        background: Option<&str>,
        tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<String, StylistError>;

    /// Find places for a free-text or `COORDS:` query.
    async fn search_places(
        &self,
        query: &str,
        place_id: Option<&str>,
    ) -> Result<Vec<Place>, StylistError>;

    /// Classify a garment picture.
    async fn analyze_garment(
        &self,
        image: &str,
        hint: Option<&str>,
        tier: ModelTier,
    ) -> Result<GarmentAnalysis, StylistError>;

    /// Pick up to three closet items suited to a place.
    async fn recommend_attire(
        &self,
        place_description: &str,
        closet: &[Garment],
    ) -> Result<Vec<String>, StylistError>;

    /// Regenerate an uploaded photo into a full-body studio portrait.
    async fn generate_base_model(
        &self,
        photo: &str,
        instructions: Option<&str>,
        tier: ModelTier,
    ) -> Result<String, StylistError>;
}

/// Mock stylist for development and testing.
///
/// Produces deterministic fake images and records how often each operation
/// was called.
#[derive(Debug, Default)]
pub struct MockStylistService {
    /// Member ids whose dress call fails with a generation failure.
    pub dress_failures: HashSet<String>,
    /// Delay applied to every dress call.
    pub dress_delay: Option<Duration>,
    /// Per-member dress delays, taking precedence over `dress_delay`.
    pub member_delays: HashMap<String, Duration>,
    pub composite_error: Option<StylistError>,
    pub search_error: Option<StylistError>,
    pub analysis_error: Option<StylistError>,
    pub base_model_error: Option<StylistError>,
    /// Places the mock search draws from.
    pub catalog: Vec<Place>,
    dress_calls: AtomicUsize,
    composite_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MockStylistService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose search draws from the given places.
    pub fn with_catalog(catalog: Vec<Place>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Create a mock where every generation is refused for the tier.
    pub fn denying(tier: ModelTier) -> Self {
        Self {
            composite_error: Some(StylistError::PermissionDenied(tier)),
            analysis_error: Some(StylistError::PermissionDenied(tier)),
            base_model_error: Some(StylistError::PermissionDenied(tier)),
            ..Self::default()
        }
    }

    pub fn with_dress_delay(mut self, delay: Duration) -> Self {
        self.dress_delay = Some(delay);
        self
    }

    /// Make the dress call for one member take `delay`.
    pub fn with_member_delay(mut self, member_id: &str, delay: Duration) -> Self {
        self.member_delays.insert(member_id.to_string(), delay);
        self
    }

    pub fn with_dress_failure(mut self, member_id: &str) -> Self {
        self.dress_failures.insert(member_id.to_string());
        self
    }

    pub fn with_search_error(mut self, error: StylistError) -> Self {
        self.search_error = Some(error);
        self
    }

    pub fn with_analysis_error(mut self, error: StylistError) -> Self {
        self.analysis_error = Some(error);
        self
    }

    pub fn with_base_model_error(mut self, error: StylistError) -> Self {
        self.base_model_error = Some(error);
        self
    }

    pub fn dress_calls(&self) -> usize {
        self.dress_calls.load(Ordering::SeqCst)
    }

    pub fn composite_calls(&self) -> usize {
        self.composite_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// The fake image the mock returns for a dressed member.
    pub fn dressed_image_for(member_id: &str) -> String {
        fake_image(&format!("dressed:{}", member_id))
    }

    /// The fake image the mock returns for a composite of the given members.
    pub fn scene_image_for(member_ids: &[&str]) -> String {
        fake_image(&format!("scene:{}", member_ids.join(",")))
    }
}

fn fake_image(label: &str) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(label.as_bytes()))
}

#[async_trait::async_trait]
impl StylistService for MockStylistService {
    async fn dress(
        &self,
        subject: &RenderSubject,
        tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<DressedImage, StylistError> {
        self.dress_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .member_delays
            .get(&subject.member_id)
            .copied()
            .or(self.dress_delay);
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(StylistError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if self.dress_failures.contains(&subject.member_id) {
            tracing::warn!(member_id = %subject.member_id, "Mock stylist simulating dress failure");
            return Err(StylistError::GenerationFailure(format!(
                "Failed to dress member {}",
                subject.member_id
            )));
        }

        tracing::info!(member_id = %subject.member_id, tier = %tier, "Mock: dressed member");
        Ok(DressedImage {
            member_id: subject.member_id.clone(),
            image: Self::dressed_image_for(&subject.member_id),
        })
    }

    async fn composite(
        &self,
        subjects: &[SceneSubject],
        _scene_context: &str,
        _background: Option<&str>,
        _tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<String, StylistError> {
        self.composite_calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(StylistError::Cancelled);
        }
        if let Some(err) = &self.composite_error {
            return Err(err.clone());
        }

        let ids: Vec<&str> = subjects.iter().map(|s| s.member_id.as_str()).collect();
        Ok(Self::scene_image_for(&ids))
    }

    async fn search_places(
        &self,
        query: &str,
        _place_id: Option<&str>,
    ) -> Result<Vec<Place>, StylistError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.search_error {
            return if err.is_overloaded() {
                Err(err.clone())
            } else {
                Ok(Vec::new())
            };
        }

        // Exact name matches lead, the rest of the catalog follows.
        let needle = query.trim().to_lowercase();
        let (mut exact, rest): (Vec<Place>, Vec<Place>) = self
            .catalog
            .iter()
            .cloned()
            .partition(|p| p.name.to_lowercase() == needle);
        exact.extend(rest);
        exact.truncate(4);
        Ok(exact)
    }

    async fn analyze_garment(
        &self,
        _image: &str,
        _hint: Option<&str>,
        _tier: ModelTier,
    ) -> Result<GarmentAnalysis, StylistError> {
        match &self.analysis_error {
            Some(err) if err.is_permission_denied() => Err(err.clone()),
            Some(_) => Ok(GarmentAnalysis::fallback()),
            None => Ok(GarmentAnalysis {
                category: crate::models::GarmentCategory::Bottoms,
                color: Some("Blue".to_string()),
                tags: vec![
                    "Denim".to_string(),
                    "Casual".to_string(),
                    "Streetwear".to_string(),
                ],
                source: Default::default(),
            }),
        }
    }

    async fn recommend_attire(
        &self,
        _place_description: &str,
        closet: &[Garment],
    ) -> Result<Vec<String>, StylistError> {
        Ok(closet.iter().take(3).map(|g| g.id.clone()).collect())
    }

    async fn generate_base_model(
        &self,
        photo: &str,
        _instructions: Option<&str>,
        _tier: ModelTier,
    ) -> Result<String, StylistError> {
        if let Some(err) = &self.base_model_error {
            return Err(err.clone());
        }
        Ok(fake_image(&format!("base:{}", shared::image::preview(photo))))
    }
}
