//! Closet garment entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::GarmentCategory;
use sqlx::types::Json;
use sqlx::FromRow;

/// Database row mapping for the closet table.
#[derive(Debug, Clone, FromRow)]
pub struct GarmentEntity {
    pub id: String,
    pub name: String,
    pub category: String,
    pub image_data: String,
    pub color: Option<String>,
    pub tags: Option<Json<Vec<String>>>,
    pub created_at: DateTime<Utc>,
}

impl From<GarmentEntity> for domain::models::Garment {
    fn from(entity: GarmentEntity) -> Self {
        let category = entity.category.parse().unwrap_or_else(|_| {
            tracing::warn!(
                garment_id = %entity.id,
                category = %entity.category,
                "Unknown stored garment category, using default"
            );
            GarmentCategory::default()
        });

        Self {
            id: entity.id,
            name: entity.name,
            category,
            image_data: entity.image_data,
            color: entity.color,
            tags: entity.tags.map(|t| t.0),
            created_at: entity.created_at,
        }
    }
}
