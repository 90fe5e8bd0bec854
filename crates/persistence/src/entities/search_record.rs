//! Search history entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Place;
use sqlx::types::Json;
use sqlx::FromRow;

/// Database row mapping for the search_history table.
#[derive(Debug, Clone, FromRow)]
pub struct SearchRecordEntity {
    pub id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub results: Json<Vec<Place>>,
}

impl From<SearchRecordEntity> for domain::models::SearchRecord {
    fn from(entity: SearchRecordEntity) -> Self {
        Self {
            id: entity.id,
            query: entity.query,
            timestamp: entity.timestamp,
            results: entity.results.0,
        }
    }
}
