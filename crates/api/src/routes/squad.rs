//! Squad endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{CreateMemberRequest, Member};
use persistence::repositories::SquadRepository;
use persistence::CollectionStore;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// List squad members in the order they were added.
///
/// GET /api/v1/squad
pub async fn list_members(State(state): State<AppState>) -> Result<Json<Vec<Member>>, ApiError> {
    let repo = SquadRepository::new(state.pool.clone());
    Ok(Json(repo.list_all().await?))
}

/// Add a member, optionally regenerating the photo into a studio portrait.
///
/// POST /api/v1/squad
pub async fn add_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    request.validate()?;

    let member = state.intake.prepare_member(request).await;

    let repo = SquadRepository::new(state.pool.clone());
    repo.save(&member).await?;
    state.sync_studio().await?;

    info!(member_id = %member.id, "Member added to squad");
    Ok((StatusCode::CREATED, Json(member)))
}

/// Remove a member. Unknown ids are a no-op.
///
/// DELETE /api/v1/squad/:id
pub async fn remove_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let repo = SquadRepository::new(state.pool.clone());
    let removed = repo.remove(&id).await?;
    state.sync_studio().await?;

    info!(member_id = %id, removed, "Member removed from squad");
    Ok(StatusCode::NO_CONTENT)
}
