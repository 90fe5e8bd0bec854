//! Gemini-backed stylist.
//!
//! Implements the StylistService trait over the Generative Language REST API
//! (`models/{model}:generateContent`). Image generation requests the IMAGE
//! response modality; search, classification and recommendation request JSON
//! constrained by a response schema.

use std::time::{Duration, Instant};

use chrono::Utc;
use domain::models::{
    DressedImage, Garment, GarmentAnalysis, GarmentCategory, ModelTier, Place, PlaceCandidate,
    RenderSubject, SceneSubject,
};
use domain::services::{StylistError, StylistService};
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::image::DataUrl;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::image_fetch::ImageFetcher;
use super::image_search::ImageSearchClient;
use super::prompts;
use crate::config::GenAiConfig;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Splits a data URL into an inline image part.
    fn image(data_url: &str) -> Result<Self, StylistError> {
        let parsed =
            DataUrl::parse(data_url).map_err(|e| StylistError::InvalidInput(e.to_string()))?;
        Ok(Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: parsed.mime_type,
                data: parsed.data,
            }),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

impl GenerationConfig {
    fn image() -> Self {
        Self {
            response_modalities: Some(vec!["IMAGE"]),
            ..Self::default()
        }
    }

    fn json(schema: Value) -> Self {
        Self {
            response_mime_type: Some("application/json"),
            response_schema: Some(schema),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    /// First inline image of the first candidate, as a data URL.
    fn first_image(&self) -> Option<String> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .map(|d| DataUrl::new(d.mime_type.clone(), d.data.clone()).to_string())
    }

    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Missing fields take the closet defaults: Tops, no color, no tags.
fn analysis_from_payload(payload: AnalysisPayload) -> Result<GarmentAnalysis, StylistError> {
    let category = match payload.category.as_deref().map(str::trim) {
        None | Some("") => GarmentCategory::default(),
        Some(name) => name
            .parse()
            .map_err(|e: domain::models::garment::UnknownCategory| {
                StylistError::InvalidResponse(e.to_string())
            })?,
    };

    Ok(GarmentAnalysis {
        category,
        color: payload.color.filter(|c| !c.trim().is_empty()),
        tags: payload.tags,
        source: Default::default(),
    })
}

// ============================================================================
// Error Classification
// ============================================================================

/// Maps a non-success response onto the stylist error taxonomy.
fn classify_error(status: StatusCode, body: &str, tier: ModelTier) -> StylistError {
    let details = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error)
        .ok();
    let api_status = details.as_ref().map(|d| d.status.as_str()).unwrap_or("");
    let message = details
        .as_ref()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == StatusCode::FORBIDDEN
        || api_status == "PERMISSION_DENIED"
        || body.contains("PERMISSION_DENIED")
    {
        return StylistError::PermissionDenied(tier);
    }

    if status == StatusCode::SERVICE_UNAVAILABLE
        || message.contains("503")
        || message.to_ascii_lowercase().contains("overloaded")
    {
        return StylistError::ServiceOverloaded;
    }

    StylistError::GenerationFailure(format!(
        "Generative service error ({}): {}",
        status.as_u16(),
        message
    ))
}

// ============================================================================
// Service
// ============================================================================

/// Stylist backed by the Gemini generative API.
pub struct GeminiStylist {
    client: Client,
    config: GenAiConfig,
    images: ImageFetcher,
    photos: ImageSearchClient,
}

impl GeminiStylist {
    pub fn new(
        config: GenAiConfig,
        images: ImageFetcher,
        photos: ImageSearchClient,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config,
            images,
            photos,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Sends one request, retrying overload responses with exponential backoff.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
        tier: ModelTier,
    ) -> Result<GenerateResponse, StylistError> {
        let mut attempt = 0;
        loop {
            match self.send_once(model, request, tier).await {
                Err(StylistError::ServiceOverloaded) if attempt < self.config.overload_retries => {
                    let backoff = self.config.retry_backoff_ms.saturating_mul(1 << attempt.min(10));
                    warn!(model = %model, attempt, backoff_ms = backoff, "Model overloaded, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn send_once(
        &self,
        model: &str,
        request: &GenerateRequest,
        tier: ModelTier,
    ) -> Result<GenerateResponse, StylistError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| StylistError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StylistError::Network(e.to_string()))?;

        debug!(
            model = %model,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generative request completed"
        );

        if !status.is_success() {
            return Err(classify_error(status, &body, tier));
        }

        serde_json::from_str(&body).map_err(|e| StylistError::InvalidResponse(e.to_string()))
    }

    async fn generate_cancellable(
        &self,
        model: &str,
        request: &GenerateRequest,
        tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, StylistError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StylistError::Cancelled),
            result = self.generate(model, request, tier) => result,
        }
    }

    async fn search_places_inner(
        &self,
        query: &str,
        place_id: Option<&str>,
    ) -> Result<Vec<Place>, StylistError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompts::search_prompt(query, place_id))],
            }],
            generation_config: GenerationConfig::json(prompts::place_list_schema()),
        };

        let response = self
            .generate(self.config.text_model(ModelTier::Flash), &request, ModelTier::Flash)
            .await?;
        let Some(text) = response.text() else {
            return Ok(Vec::new());
        };
        let candidates: Vec<PlaceCandidate> = serde_json::from_str(&text)
            .map_err(|e| StylistError::InvalidResponse(e.to_string()))?;

        let stamp = Utc::now().timestamp_millis();
        let photo_lookups = candidates
            .iter()
            .map(|c| async move { self.photos.photos_for(&c.search_name()).await });
        let photos = join_all(photo_lookups).await;

        Ok(candidates
            .into_iter()
            .zip(photos)
            .enumerate()
            .map(|(i, (candidate, urls))| {
                candidate.into_place(shared::ids::place_id(i, stamp), urls)
            })
            .collect())
    }

    async fn analyze_inner(
        &self,
        image: &str,
        hint: Option<&str>,
        tier: ModelTier,
    ) -> Result<GarmentAnalysis, StylistError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::image(image)?, Part::text(prompts::analyze_prompt(hint))],
            }],
            generation_config: GenerationConfig::json(prompts::garment_analysis_schema()),
        };

        let response = self
            .generate(self.config.text_model(tier), &request, tier)
            .await?;
        let text = response
            .text()
            .ok_or_else(|| StylistError::GenerationFailure("Failed to analyze garment.".into()))?;
        let payload: AnalysisPayload = serde_json::from_str(&text)
            .map_err(|e| StylistError::InvalidResponse(e.to_string()))?;
        analysis_from_payload(payload)
    }

    async fn recommend_inner(
        &self,
        place_description: &str,
        closet: &[Garment],
    ) -> Result<Vec<String>, StylistError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompts::recommend_prompt(place_description, closet))],
            }],
            generation_config: GenerationConfig::json(prompts::id_list_schema()),
        };

        let response = self
            .generate(self.config.text_model(ModelTier::Flash), &request, ModelTier::Flash)
            .await?;
        match response.text() {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| StylistError::InvalidResponse(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl StylistService for GeminiStylist {
    async fn dress(
        &self,
        subject: &RenderSubject,
        tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<DressedImage, StylistError> {
        info!(member_id = %subject.member_id, tier = %tier, "Phase 1: dressing member");

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::image(&subject.member_image)?,
                    Part::image(&subject.garment_image)?,
                    Part::text(prompts::dress_prompt(&subject.garment_category)),
                ],
            }],
            generation_config: GenerationConfig::image(),
        };

        let response = self
            .generate_cancellable(self.config.image_model(tier), &request, tier, cancel)
            .await?;

        response
            .first_image()
            .map(|image| DressedImage {
                member_id: subject.member_id.clone(),
                image,
            })
            .ok_or_else(|| {
                StylistError::GenerationFailure(format!(
                    "Failed to dress member {}",
                    subject.member_id
                ))
            })
    }

    async fn composite(
        &self,
        subjects: &[SceneSubject],
        scene_context: &str,
        background: Option<&str>,
        tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<String, StylistError> {
        info!(members = subjects.len(), tier = %tier, "Phase 2: composing scene");

        let mut parts = Vec::with_capacity(subjects.len() + 2);
        if let Some(url) = background {
            let data_url = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StylistError::Cancelled),
                fetched = self.images.fetch_data_url(url) => fetched,
            }
            .map_err(|e| {
                warn!(error = %e, "Failed to load background image");
                StylistError::BackgroundLoadFailure
            })?;
            parts.push(Part::image(&data_url).map_err(|_| StylistError::BackgroundLoadFailure)?);
        }
        for subject in subjects {
            parts.push(Part::image(&subject.image)?);
        }
        parts.push(Part::text(prompts::composite_prompt(
            subjects.len(),
            background.is_some(),
            scene_context,
        )));

        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig::image(),
        };

        let response = self
            .generate_cancellable(self.config.image_model(tier), &request, tier, cancel)
            .await?;

        response
            .first_image()
            .ok_or_else(|| StylistError::GenerationFailure("No image generated in Phase 2.".into()))
    }

    async fn search_places(
        &self,
        query: &str,
        place_id: Option<&str>,
    ) -> Result<Vec<Place>, StylistError> {
        match self.search_places_inner(query, place_id).await {
            Ok(places) => Ok(places),
            Err(StylistError::ServiceOverloaded) => Err(StylistError::ServiceOverloaded),
            Err(e) => {
                warn!(error = %e, query = %query, "Place search failed");
                Ok(Vec::new())
            }
        }
    }

    async fn analyze_garment(
        &self,
        image: &str,
        hint: Option<&str>,
        tier: ModelTier,
    ) -> Result<GarmentAnalysis, StylistError> {
        match self.analyze_inner(image, hint, tier).await {
            Ok(analysis) => Ok(analysis),
            Err(e @ StylistError::PermissionDenied(_)) => Err(e),
            Err(e) => {
                warn!(error = %e, "Garment analysis failed, using fallback");
                Ok(GarmentAnalysis::fallback())
            }
        }
    }

    async fn recommend_attire(
        &self,
        place_description: &str,
        closet: &[Garment],
    ) -> Result<Vec<String>, StylistError> {
        if closet.is_empty() {
            return Ok(Vec::new());
        }
        match self.recommend_inner(place_description, closet).await {
            Ok(ids) => Ok(ids),
            Err(e @ StylistError::PermissionDenied(_)) => Err(e),
            Err(e) => {
                warn!(error = %e, "Attire recommendation failed");
                Ok(Vec::new())
            }
        }
    }

    async fn generate_base_model(
        &self,
        photo: &str,
        instructions: Option<&str>,
        tier: ModelTier,
    ) -> Result<String, StylistError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::image(photo)?,
                    Part::text(prompts::base_model_prompt(instructions)),
                ],
            }],
            generation_config: GenerationConfig::image(),
        };

        let response = self
            .generate(self.config.image_model(tier), &request, tier)
            .await?;
        response
            .first_image()
            .ok_or_else(|| StylistError::GenerationFailure("Failed to generate base model.".into()))
    }
}
