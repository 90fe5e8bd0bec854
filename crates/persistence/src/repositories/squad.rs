//! Squad repository for database operations.

use domain::models::Member;
use sqlx::SqlitePool;

use crate::collection::{Collection, CollectionStore};
use crate::entities::MemberEntity;
use crate::metrics::QueryTimer;

/// Repository for squad members.
#[derive(Clone)]
pub struct SquadRepository {
    pool: SqlitePool,
}

impl SquadRepository {
    /// Creates a new SquadRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Find a member by id.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<MemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new(Collection::Squad, "find_by_id");
        let result = sqlx::query_as::<_, MemberEntity>(
            r#"
            SELECT id, name, photo_data, created_at
            FROM squad
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait::async_trait]
impl CollectionStore<Member> for SquadRepository {
    fn collection(&self) -> Collection {
        Collection::Squad
    }

    async fn save(&self, member: &Member) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new(Collection::Squad, "save");
        let result = sqlx::query(
            r#"
            INSERT INTO squad (id, name, photo_data, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                photo_data = excluded.photo_data,
                created_at = excluded.created_at
            "#,
        )
        .bind(&member.id)
        .bind(&member.name)
        .bind(&member.photo_data)
        .bind(member.created_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    async fn remove(&self, id: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new(Collection::Squad, "remove");
        let result = sqlx::query("DELETE FROM squad WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        let result = result?;
        Ok(result.rows_affected())
    }

    async fn list_all(&self) -> Result<Vec<Member>, sqlx::Error> {
        let timer = QueryTimer::new(Collection::Squad, "list_all");
        let rows = sqlx::query_as::<_, MemberEntity>(
            r#"
            SELECT id, name, photo_data, created_at
            FROM squad
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        let rows = rows?;
        Ok(rows.into_iter().map(Member::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use fake::faker::name::en::Name;
    use fake::Fake;

    use super::*;
    use crate::db::create_memory_pool;
    use crate::metrics::capture::CapturingRecorder;

    async fn repo() -> SquadRepository {
        SquadRepository::new(create_memory_pool().await.unwrap())
    }

    fn member() -> Member {
        let name: String = Name().fake();
        Member::new(name, "data:image/png;base64,iVBORw0KGgo=")
    }

    #[tokio::test]
    async fn test_save_then_list_round_trip() {
        let repo = repo().await;
        let member = member();
        repo.save(&member).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all, vec![member]);
    }

    #[tokio::test]
    async fn test_save_upserts_by_id() {
        let repo = repo().await;
        let mut member = member();
        repo.save(&member).await.unwrap();

        member.name = "Renamed".to_string();
        repo.save(&member).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Renamed");
    }

    #[tokio::test]
    async fn test_remove_is_noop_for_unknown_id() {
        let repo = repo().await;
        let member = member();
        repo.save(&member).await.unwrap();

        assert_eq!(repo.remove("m-missing").await.unwrap(), 0);
        assert_eq!(repo.remove(&member.id).await.unwrap(), 1);
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = repo().await;
        let member = member();
        repo.save(&member).await.unwrap();

        let found = repo.find_by_id(&member.id).await.unwrap().unwrap();
        assert_eq!(found.name, member.name);
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }

    #[test]
    fn test_failed_queries_are_still_timed() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let repo = rt.block_on(async {
            let pool = create_memory_pool().await.unwrap();
            sqlx::query("DROP TABLE squad").execute(&pool).await.unwrap();
            SquadRepository::new(pool)
        });

        let recorder = CapturingRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            rt.block_on(async {
                assert!(repo.remove("m1").await.is_err());
                assert!(repo.list_all().await.is_err());
            })
        });
        assert_eq!(recorder.operations(), vec!["remove", "list_all"]);
    }
}
