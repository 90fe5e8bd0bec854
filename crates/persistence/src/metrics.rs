//! Database metrics collection.

use metrics::{gauge, histogram};
use sqlx::SqlitePool;
use std::time::Instant;

use crate::Collection;

/// Record database query duration.
pub fn record_query_duration(collection: Collection, operation: &'static str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "collection" => collection.as_str(),
        "operation" => operation
    )
    .record(duration_secs);
}

/// Connection counts of the pool at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub total: usize,
    pub idle: usize,
    pub active: usize,
}

/// Record database connection pool metrics and return what was recorded.
pub fn record_pool_metrics(pool: &SqlitePool) -> PoolStats {
    let total = pool.size() as usize;
    let idle = pool.num_idle();
    let stats = PoolStats {
        total,
        idle,
        active: total.saturating_sub(idle),
    };

    gauge!("database_connections_active").set(stats.active as f64);
    gauge!("database_connections_idle").set(stats.idle as f64);
    gauge!("database_connections_total").set(stats.total as f64);
    stats
}

/// Times one collection operation. Call [`QueryTimer::record`] once it
/// completes.
pub struct QueryTimer {
    collection: Collection,
    operation: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(collection: Collection, operation: &'static str) -> Self {
        Self {
            collection,
            operation,
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(self.collection, self.operation, duration);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_creation() {
        let timer = QueryTimer::new(Collection::Squad, "save");
        assert_eq!(timer.collection, Collection::Squad);
        assert_eq!(timer.operation, "save");
    }

    #[test]
    fn test_query_timer_records_operation() {
        let recorder = capture::CapturingRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            QueryTimer::new(Collection::Closet, "save").record();
        });
        assert_eq!(recorder.operations(), vec!["save"]);
    }

    #[test]
    fn test_query_timer_record_without_recorder() {
        QueryTimer::new(Collection::SearchHistory, "list_all").record();
    }

    #[tokio::test]
    async fn test_pool_metrics_count_connections() {
        let pool = crate::db::create_memory_pool().await.unwrap();
        let stats = record_pool_metrics(&pool);
        assert!(stats.total >= 1);
        assert_eq!(stats.active + stats.idle, stats.total);
    }
}
