//! Search history endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::SearchRecord;
use persistence::repositories::{SearchHistoryRepository, DEFAULT_RECENT_LIMIT};
use persistence::CollectionStore;
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;

/// Largest page the history endpoint returns.
const MAX_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

impl HistoryQuery {
    fn limit(&self) -> Result<i64, ApiError> {
        match self.limit {
            None => Ok(DEFAULT_RECENT_LIMIT),
            Some(n) if (1..=MAX_HISTORY_LIMIT).contains(&n) => Ok(n),
            Some(_) => Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            ))),
        }
    }
}

/// Most recent searches, newest first.
///
/// GET /api/v1/history?limit=
pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SearchRecord>>, ApiError> {
    let limit = query.limit()?;
    let repo = SearchHistoryRepository::new(state.pool.clone());
    Ok(Json(repo.recent(limit).await?))
}

/// Delete one history entry. Unknown ids are a no-op.
///
/// DELETE /api/v1/history/:id
pub async fn remove_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let repo = SearchHistoryRepository::new(state.pool.clone());
    let removed = repo.remove(&id).await?;
    info!(record_id = %id, removed, "Search history entry removed");
    Ok(StatusCode::NO_CONTENT)
}
