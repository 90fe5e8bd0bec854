//! Closet repository for database operations.

use domain::models::Garment;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::collection::{Collection, CollectionStore};
use crate::entities::GarmentEntity;
use crate::metrics::QueryTimer;

/// Repository for closet garments.
#[derive(Clone)]
pub struct ClosetRepository {
    pool: SqlitePool,
}

impl ClosetRepository {
    /// Creates a new ClosetRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Count garments in the closet.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM closet")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[async_trait::async_trait]
impl CollectionStore<Garment> for ClosetRepository {
    fn collection(&self) -> Collection {
        Collection::Closet
    }

    async fn save(&self, garment: &Garment) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new(Collection::Closet, "save");
        let result = sqlx::query(
            r#"
            INSERT INTO closet (id, name, category, image_data, color, tags, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                image_data = excluded.image_data,
                color = excluded.color,
                tags = excluded.tags,
                created_at = excluded.created_at
            "#,
        )
        .bind(&garment.id)
        .bind(&garment.name)
        .bind(garment.category.as_str())
        .bind(&garment.image_data)
        .bind(&garment.color)
        .bind(garment.tags.as_ref().map(Json))
        .bind(garment.created_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    async fn remove(&self, id: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new(Collection::Closet, "remove");
        let result = sqlx::query("DELETE FROM closet WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        let result = result?;
        Ok(result.rows_affected())
    }

    /// Newest first, matching the closet grid.
    async fn list_all(&self) -> Result<Vec<Garment>, sqlx::Error> {
        let timer = QueryTimer::new(Collection::Closet, "list_all");
        let rows = sqlx::query_as::<_, GarmentEntity>(
            r#"
            SELECT id, name, category, image_data, color, tags, created_at
            FROM closet
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        let rows = rows?;
        Ok(rows.into_iter().map(Garment::from).collect())
    }
}
