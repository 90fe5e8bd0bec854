//! Toast endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::services::Toast;

use crate::app::AppState;
use crate::error::ApiError;

/// Active toasts, oldest first. Expired toasts are dropped before listing.
///
/// GET /api/v1/toasts
pub async fn list_toasts(State(state): State<AppState>) -> Json<Vec<Toast>> {
    Json(state.toasts.current())
}

/// Dismiss one toast.
///
/// DELETE /api/v1/toasts/:id
pub async fn dismiss_toast(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    if state.toasts.dismiss(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Toast not found: {}", id)))
    }
}
