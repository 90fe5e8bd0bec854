//! Closet endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{CategoryFilter, CreateGarmentRequest, Garment};
use domain::services::{distinct_tags, ClosetFilter, ColorSwatch, COLOR_PALETTE};
use persistence::repositories::ClosetRepository;
use persistence::CollectionStore;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Query parameters for closet listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListClosetQuery {
    /// "All" or one category name.
    pub category: Option<String>,
    pub color: Option<String>,
    pub tag: Option<String>,
}

impl ListClosetQuery {
    fn into_filter(self) -> Result<ClosetFilter, ApiError> {
        let category = match self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(raw) => raw
                .parse::<CategoryFilter>()
                .map_err(|e| ApiError::Validation(e.to_string()))?,
            None => CategoryFilter::All,
        };
        Ok(ClosetFilter {
            category,
            color: self.color,
            tag: self.tag,
        })
    }
}

/// List garments, newest first, narrowed by the optional filters.
///
/// GET /api/v1/closet?category=&color=&tag=
pub async fn list_garments(
    State(state): State<AppState>,
    Query(query): Query<ListClosetQuery>,
) -> Result<Json<Vec<Garment>>, ApiError> {
    let filter = query.into_filter()?;
    let repo = ClosetRepository::new(state.pool.clone());
    let garments = repo.list_all().await?;
    Ok(Json(filter.apply(&garments).into_iter().cloned().collect()))
}

/// Every tag used in the closet.
///
/// GET /api/v1/closet/tags
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let repo = ClosetRepository::new(state.pool.clone());
    let garments = repo.list_all().await?;
    Ok(Json(distinct_tags(&garments)))
}

/// Swatches offered by the color filter.
///
/// GET /api/v1/closet/palette
pub async fn palette() -> Json<Vec<ColorSwatch>> {
    Json(COLOR_PALETTE.to_vec())
}

/// Classify and store a garment.
///
/// POST /api/v1/closet
pub async fn add_garment(
    State(state): State<AppState>,
    Json(request): Json<CreateGarmentRequest>,
) -> Result<(StatusCode, Json<Garment>), ApiError> {
    request.validate()?;

    let garment = state.intake.prepare_garment(request).await;

    let repo = ClosetRepository::new(state.pool.clone());
    repo.save(&garment).await?;
    state.sync_studio().await?;

    info!(
        garment_id = %garment.id,
        category = %garment.category,
        "Garment added to closet"
    );
    Ok((StatusCode::CREATED, Json(garment)))
}

/// Remove a garment. Unknown ids are a no-op.
///
/// DELETE /api/v1/closet/:id
pub async fn remove_garment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let repo = ClosetRepository::new(state.pool.clone());
    let removed = repo.remove(&id).await?;
    state.sync_studio().await?;

    info!(garment_id = %id, removed, "Garment removed from closet");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use domain::models::GarmentCategory;

    use super::*;

    #[test]
    fn test_query_into_filter() {
        let filter = ListClosetQuery {
            category: Some("shoes".to_string()),
            color: Some("black".to_string()),
            tag: None,
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.category, CategoryFilter::Only(GarmentCategory::Shoes));
        assert_eq!(filter.color.as_deref(), Some("black"));

        let all = ListClosetQuery {
            category: Some("All".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(all.category, CategoryFilter::All);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = ListClosetQuery {
            category: Some("Hats".to_string()),
            ..Default::default()
        }
        .into_filter();
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
