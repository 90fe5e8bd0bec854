//! Search history repository for database operations.

use domain::models::SearchRecord;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::collection::{Collection, CollectionStore};
use crate::entities::SearchRecordEntity;
use crate::metrics::QueryTimer;

/// Number of entries the history dropdown shows.
pub const DEFAULT_RECENT_LIMIT: i64 = 5;

/// Repository for place-search history.
#[derive(Clone)]
pub struct SearchHistoryRepository {
    pool: SqlitePool,
}

impl SearchHistoryRepository {
    /// Creates a new SearchHistoryRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<SearchRecord>, sqlx::Error> {
        let timer = QueryTimer::new(Collection::SearchHistory, "find_by_id");
        let row = sqlx::query_as::<_, SearchRecordEntity>(
            r#"
            SELECT id, query, timestamp, results
            FROM search_history
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        let row = row?;
        Ok(row.map(SearchRecord::from))
    }

    /// Most recent searches, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<SearchRecord>, sqlx::Error> {
        let timer = QueryTimer::new(Collection::SearchHistory, "recent");
        let rows = sqlx::query_as::<_, SearchRecordEntity>(
            r#"
            SELECT id, query, timestamp, results
            FROM search_history
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        let rows = rows?;
        Ok(rows.into_iter().map(SearchRecord::from).collect())
    }

    pub async fn is_empty(&self) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 == 0)
    }
}

#[async_trait::async_trait]
impl CollectionStore<SearchRecord> for SearchHistoryRepository {
    fn collection(&self) -> Collection {
        Collection::SearchHistory
    }

    async fn save(&self, record: &SearchRecord) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new(Collection::SearchHistory, "save");
        let result = sqlx::query(
            r#"
            INSERT INTO search_history (id, query, timestamp, results)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                query = excluded.query,
                timestamp = excluded.timestamp,
                results = excluded.results
            "#,
        )
        .bind(&record.id)
        .bind(&record.query)
        .bind(record.timestamp)
        .bind(Json(&record.results))
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    async fn remove(&self, id: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new(Collection::SearchHistory, "remove");
        let result = sqlx::query("DELETE FROM search_history WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        let result = result?;
        Ok(result.rows_affected())
    }

    async fn list_all(&self) -> Result<Vec<SearchRecord>, sqlx::Error> {
        let timer = QueryTimer::new(Collection::SearchHistory, "list_all");
        let rows = sqlx::query_as::<_, SearchRecordEntity>(
            "SELECT id, query, timestamp, results FROM search_history",
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        let rows = rows?;
        Ok(rows.into_iter().map(SearchRecord::from).collect())
    }
}
