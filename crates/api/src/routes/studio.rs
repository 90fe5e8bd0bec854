//! Studio session endpoint handlers.
//!
//! Every mutating handler answers with the session snapshot so the client can
//! re-render from a single source of truth.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{MapLocation, ModelTier};
use domain::services::{
    ActionPhase, RenderOutcome, StudioError, StudioSnapshot, SEARCH_SUGGESTIONS,
};
use persistence::repositories::SearchHistoryRepository;
use persistence::CollectionStore;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_generation, record_search};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 200, message = "Query must be between 1 and 200 characters"))]
    pub query: String,
    pub place_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateSearchRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,
    /// Map provider id of a clicked point of interest.
    pub place_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VisualizeRequest {
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    /// `null` clears the assignment.
    pub garment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub tier: Option<ModelTier>,
    pub skip_try_on: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub outcome: RenderOutcome,
    pub studio: StudioSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub garment_ids: Vec<String>,
}

/// Current session state.
///
/// GET /api/v1/studio
pub async fn get_snapshot(State(state): State<AppState>) -> Json<StudioSnapshot> {
    Json(state.studio.snapshot().await)
}

/// Example queries for an empty search bar.
///
/// GET /api/v1/studio/suggestions
pub async fn suggestions() -> Json<Vec<&'static str>> {
    Json(SEARCH_SUGGESTIONS.to_vec())
}

/// Free-text place search. Successful searches are recorded in history.
///
/// POST /api/v1/studio/search
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    request.validate()?;
    let outcome = state.studio.search(&request.query, request.place_id).await;
    finish_search(&state, outcome).await
}

/// Map click search at a coordinate.
///
/// POST /api/v1/studio/search/coordinates
pub async fn search_coordinates(
    State(state): State<AppState>,
    Json(request): Json<CoordinateSearchRequest>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    request.validate()?;
    let outcome = state
        .studio
        .search_coordinates(request.lat, request.lng, request.place_id)
        .await;
    finish_search(&state, outcome).await
}

async fn finish_search(
    state: &AppState,
    outcome: Result<Option<domain::models::SearchRecord>, StudioError>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    match outcome {
        Ok(Some(record)) => {
            record_search("success", record.results.len());
            SearchHistoryRepository::new(state.pool.clone())
                .save(&record)
                .await?;
        }
        Ok(None) => record_search("superseded", 0),
        Err(e) => {
            record_search("error", 0);
            return Err(e.into());
        }
    }
    Ok(Json(state.studio.snapshot().await))
}

/// Replay a history entry without searching again.
///
/// POST /api/v1/studio/history/:id
pub async fn apply_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    let record = SearchHistoryRepository::new(state.pool.clone())
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Search history entry not found: {}", id)))?;

    state.studio.with_session(|s| s.apply_history(&record)).await;
    Ok(Json(state.studio.snapshot().await))
}

/// POST /api/v1/studio/search/clear
pub async fn clear_search(State(state): State<AppState>) -> Json<StudioSnapshot> {
    state.studio.with_session(|s| s.clear_search()).await;
    Json(state.studio.snapshot().await)
}

/// Recentre the map on the client's position.
///
/// POST /api/v1/studio/locate
pub async fn locate(
    State(state): State<AppState>,
    Json(location): Json<MapLocation>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    location.validate()?;
    state.studio.with_session(|s| s.locate(location)).await;
    Ok(Json(state.studio.snapshot().await))
}

/// Open the detail view for a search result.
///
/// POST /api/v1/studio/places/:id
pub async fn select_place(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    state
        .studio
        .with_session(|s| s.select_place(&id).map(|_| ()))
        .await?;
    Ok(Json(state.studio.snapshot().await))
}

/// Closet items suited to a place.
///
/// GET /api/v1/studio/places/:id/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let garment_ids = state.studio.recommendations(&id).await?;
    Ok(Json(RecommendationsResponse { garment_ids }))
}

/// POST /api/v1/studio/detail/close
pub async fn close_detail(State(state): State<AppState>) -> Result<Json<StudioSnapshot>, ApiError> {
    state.studio.with_session(|s| s.close_detail()).await?;
    Ok(Json(state.studio.snapshot().await))
}

/// Enter compose mode with one of the place's images as the background.
///
/// POST /api/v1/studio/visualize
pub async fn visualize(
    State(state): State<AppState>,
    Json(request): Json<VisualizeRequest>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    request.validate()?;
    state
        .studio
        .with_session(|s| s.visualize(&request.image_url))
        .await?;
    Ok(Json(state.studio.snapshot().await))
}

/// Leave compose mode, cancelling any in-flight generation.
///
/// POST /api/v1/studio/back
pub async fn back_to_detail(
    State(state): State<AppState>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    state.studio.with_session(|s| s.back_to_detail()).await?;
    Ok(Json(state.studio.snapshot().await))
}

/// PUT /api/v1/studio/members/:id/assignment
pub async fn assign_garment(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
    Json(request): Json<AssignmentRequest>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    state
        .studio
        .with_session(|s| s.assign(&member_id, request.garment_id.as_deref()))
        .await?;
    Ok(Json(state.studio.snapshot().await))
}

/// POST /api/v1/studio/members/:id/include
pub async fn toggle_inclusion(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    state
        .studio
        .with_session(|s| s.toggle_inclusion(&member_id))
        .await?;
    Ok(Json(state.studio.snapshot().await))
}

/// POST /api/v1/studio/members/:id/select
pub async fn select_member(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    state
        .studio
        .with_session(|s| s.select_member(&member_id))
        .await?;
    Ok(Json(state.studio.snapshot().await))
}

/// PUT /api/v1/studio/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<SettingsRequest>,
) -> Json<StudioSnapshot> {
    state
        .studio
        .with_session(|s| s.update_settings(request.tier, request.skip_try_on))
        .await;
    Json(state.studio.snapshot().await)
}

/// Run the primary compose action: try-on for undressed members, otherwise
/// scene composition.
///
/// POST /api/v1/studio/render
pub async fn render(State(state): State<AppState>) -> Result<Json<RenderResponse>, ApiError> {
    let phase = state
        .studio
        .with_session(|s| s.primary_action_view().phase)
        .await;

    let started = Instant::now();
    let outcome = state.studio.run_primary_action().await;
    record_generation(
        phase_label(phase),
        outcome_label(&outcome),
        started.elapsed().as_secs_f64(),
    );

    let outcome = outcome?;
    Ok(Json(RenderResponse {
        outcome,
        studio: state.studio.snapshot().await,
    }))
}

/// Try-on again for one member.
///
/// POST /api/v1/studio/members/:id/regenerate
pub async fn regenerate(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<StudioSnapshot>, ApiError> {
    let started = Instant::now();
    let outcome = state.studio.regenerate(&member_id).await;
    record_generation(
        phase_label(ActionPhase::Dress),
        outcome_label(&outcome),
        started.elapsed().as_secs_f64(),
    );

    outcome?;
    Ok(Json(state.studio.snapshot().await))
}

/// POST /api/v1/studio/result/close
pub async fn close_result(State(state): State<AppState>) -> Json<StudioSnapshot> {
    state.studio.with_session(|s| s.close_result()).await;
    Json(state.studio.snapshot().await)
}

fn phase_label(phase: ActionPhase) -> &'static str {
    match phase {
        ActionPhase::Dress => "dress",
        ActionPhase::Composite => "composite",
    }
}

fn outcome_label<T>(outcome: &Result<T, StudioError>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(StudioError::Cancelled) => "cancelled",
        Err(StudioError::Stylist(domain::services::StylistError::Cancelled)) => "cancelled",
        Err(_) => "error",
    }
}
