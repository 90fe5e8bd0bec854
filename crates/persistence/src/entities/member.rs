//! Squad member entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the squad table.
#[derive(Debug, Clone, FromRow)]
pub struct MemberEntity {
    pub id: String,
    pub name: String,
    pub photo_data: String,
    pub created_at: DateTime<Utc>,
}

impl From<MemberEntity> for domain::models::Member {
    fn from(entity: MemberEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            photo_data: entity.photo_data,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_entity_to_domain() {
        let now = Utc::now();
        let entity = MemberEntity {
            id: "m1700000000000-abcd1234".to_string(),
            name: "Linh".to_string(),
            photo_data: "data:image/png;base64,AAAA".to_string(),
            created_at: now,
        };
        let member: domain::models::Member = entity.into();
        assert_eq!(member.name, "Linh");
        assert_eq!(member.created_at, now);
    }
}
